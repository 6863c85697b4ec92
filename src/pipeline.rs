//! End-to-end run: resolve every root, merge, then draw one diagram per anchor.

use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::config::Config;
use crate::error::{FamtreeError, Result};
use crate::graph::build_family_graph;
use crate::integrity::IntegrityIssue;
use crate::merge::{merge, CanonicalMap};
use crate::model::PersonId;
use crate::render::{draw, renderer_for};
use crate::resolve::resolve_all;
use crate::source::RecordSource;

/// Outcome of a full run.
#[derive(Debug, Default)]
pub struct RunSummary {
    /// Number of persons in the canonical map.
    pub persons: usize,
    /// Written diagram files, in anchor order.
    pub outputs: Vec<PathBuf>,
    /// Anchors that failed, with the error message.
    pub failures: Vec<(PersonId, String)>,
    /// Distinct data-integrity issues from resolution and merging.
    pub issues: BTreeSet<IntegrityIssue>,
}

/// Resolve every record of `source` as a root and merge the results.
pub fn build_canonical<S: RecordSource + ?Sized>(
    source: &S,
) -> (CanonicalMap, BTreeSet<IntegrityIssue>) {
    let roots = source.all_person_ids();
    let (trees, mut issues) = resolve_all(source, &roots);
    let map = merge(&trees);
    issues.extend(map.unassigned_slots());
    (map, issues)
}

/// Render the diagram for one anchor into the configured output directory.
pub fn render_anchor(map: &CanonicalMap, anchor: &str, config: &Config) -> Result<PathBuf> {
    let graph = build_family_graph(map, anchor, &config.graph_options())?;

    let mut renderer = renderer_for(config, anchor);
    draw(&graph, renderer.as_mut());

    let file_name = format!(
        "{}{}.{}",
        anchor,
        config.output.file_suffix,
        renderer.extension()
    );
    renderer.render(&config.output_dir().join(file_name))
}

/// Run the whole pipeline. A failing anchor is recorded and skipped.
pub fn run<S: RecordSource + ?Sized>(source: &S, config: &Config) -> Result<RunSummary> {
    let (map, issues) = build_canonical(source);
    for issue in &issues {
        log::warn!("Data integrity: {}", issue);
    }

    std::fs::create_dir_all(config.output_dir())?;

    let anchors: Vec<PersonId> = if config.graph.anchors.is_empty() {
        map.ids()
    } else {
        config.graph.anchors.clone()
    };
    log::info!(
        "Rendering {} diagram(s) into {}",
        anchors.len(),
        config.output_dir().display()
    );

    let mut summary = RunSummary {
        persons: map.len(),
        issues,
        ..Default::default()
    };

    for (idx, anchor) in anchors.iter().enumerate() {
        let result = if map.contains(anchor) {
            render_anchor(&map, anchor, config)
        } else {
            Err(FamtreeError::PersonNotFound(anchor.clone()))
        };

        match result {
            Ok(path) => {
                log::info!("[{}/{}] ✓ {} -> {}", idx + 1, anchors.len(), anchor, path.display());
                summary.outputs.push(path);
            }
            Err(e) => {
                log::error!("[{}/{}] ✗ {}: {}", idx + 1, anchors.len(), anchor, e);
                summary.failures.push((anchor.clone(), e.to_string()));
            }
        }
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Gender, PersonRecord, RelationKind};
    use crate::source::MemorySource;
    use tempfile::TempDir;

    fn source() -> MemorySource {
        MemorySource::from_records(vec![
            PersonRecord::new("M")
                .with_name("Maria", "Huber")
                .with_gender(Gender::W),
            PersonRecord::new("F")
                .with_name("Josef", "Huber")
                .with_gender(Gender::M)
                .with_relation(RelationKind::Partner, "M"),
            PersonRecord::new("C")
                .with_relation(RelationKind::Mother, "M")
                .with_relation(RelationKind::Father, "F")
                .with_relation(RelationKind::Father, "GHOST"),
        ])
    }

    fn config_in(dir: &TempDir) -> Config {
        let mut config = Config::default();
        config.output.directory = dir.path().join("trees");
        config
    }

    #[test]
    fn test_run_renders_every_person() {
        let temp_dir = TempDir::new().unwrap();
        let config = config_in(&temp_dir);

        let summary = run(&source(), &config).unwrap();
        assert_eq!(summary.persons, 3);
        assert_eq!(summary.outputs.len(), 3);
        assert!(summary.failures.is_empty());
        assert!(config.output_dir().join("C_family_tree.dot").exists());
        assert_eq!(summary.issues.len(), 1);
        assert_eq!(summary.issues.iter().next().unwrap().kind(), "missing_target");
    }

    #[test]
    fn test_failed_anchor_does_not_stop_others() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = config_in(&temp_dir);
        config.graph.anchors = vec!["NOPE".to_string(), "F".to_string()];

        let summary = run(&source(), &config).unwrap();
        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.failures[0].0, "NOPE");
        assert_eq!(summary.outputs.len(), 1);
        assert!(config.output_dir().join("F_family_tree.dot").exists());
    }

    #[test]
    fn test_render_failure_reported_per_anchor() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = config_in(&temp_dir);
        config.output.format = "pdf".to_string();
        config.output.graphviz_bin = "/nonexistent/graphviz/dot".to_string();
        config.graph.anchors = vec!["M".to_string(), "C".to_string()];

        let summary = run(&source(), &config).unwrap();
        assert_eq!(summary.failures.len(), 2);
        assert!(summary.outputs.is_empty());
    }

    #[test]
    fn test_json_output() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = config_in(&temp_dir);
        config.output.format = "json".to_string();
        config.graph.anchors = vec!["C".to_string()];

        let summary = run(&source(), &config).unwrap();
        let path = &summary.outputs[0];
        assert!(path.ends_with("C_family_tree.json"));
        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(value["anchor"], "C");
        // C, M, F plus the M/F union node
        assert_eq!(value["nodes"].as_array().unwrap().len(), 4);
    }
}

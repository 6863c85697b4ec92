//! Graphviz DOT renderer.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::process::Command;

use super::Renderer;
use crate::config::PaletteConfig;
use crate::error::{FamtreeError, Result};
use crate::graph::{ColorClass, EdgeStyle};
use crate::model::PersonId;

/// Writes DOT source; for pdf/svg/png additionally runs Graphviz on it.
pub struct DotRenderer {
    name: String,
    palette: PaletteConfig,
    format: String,
    graphviz_bin: String,
    nodes: Vec<String>,
    edges: Vec<String>,
    clusters: Vec<String>,
}

impl DotRenderer {
    pub fn new(name: &str, palette: PaletteConfig, format: &str, graphviz_bin: &str) -> Self {
        Self {
            name: name.to_string(),
            palette,
            format: format.to_string(),
            graphviz_bin: graphviz_bin.to_string(),
            nodes: Vec::new(),
            edges: Vec::new(),
            clusters: Vec::new(),
        }
    }

    /// The DOT document built from everything added so far.
    pub fn source(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "digraph {} {{", quote(&self.name));
        let _ = writeln!(out, "\tnode [shape=box, style=filled];");
        for line in self.nodes.iter().chain(&self.edges).chain(&self.clusters) {
            let _ = writeln!(out, "\t{}", line);
        }
        out.push_str("}\n");
        out
    }

    fn run_graphviz(&self, dot_path: &Path, output_path: &Path) -> Result<()> {
        let output = Command::new(&self.graphviz_bin)
            .arg(format!("-T{}", self.format))
            .arg(dot_path)
            .arg("-o")
            .arg(output_path)
            .output()
            .map_err(|e| {
                FamtreeError::Render(format!("failed to run {}: {}", self.graphviz_bin, e))
            })?;

        if !output.status.success() {
            return Err(FamtreeError::Render(format!(
                "{} exited with {}: {}",
                self.graphviz_bin,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(())
    }
}

impl Renderer for DotRenderer {
    fn add_node(&mut self, id: &str, label: &str, color: ColorClass) {
        let line = match color {
            ColorClass::Union => format!("{} [shape=point, width=0.08, label=\"\"];", quote(id)),
            _ => format!(
                "{} [label={}, fillcolor={}];",
                quote(id),
                quote(label),
                quote(self.palette.color(color))
            ),
        };
        self.nodes.push(line);
    }

    fn add_edge(&mut self, from: &str, to: &str, style: EdgeStyle) {
        let attrs = match style {
            EdgeStyle::Parent => "[color=\"green\"]",
            EdgeStyle::Partner => "[dir=none, color=\"red\", style=dashed]",
            EdgeStyle::Union => "[arrowhead=none, color=\"green\"]",
        };
        self.edges
            .push(format!("{} -> {} {};", quote(from), quote(to), attrs));
    }

    fn add_cluster(&mut self, generation: i32, members: &[PersonId]) {
        let members = members
            .iter()
            .map(|m| format!("{};", quote(m)))
            .collect::<Vec<_>>()
            .join(" ");
        self.clusters.push(format!(
            "subgraph {} {{ rank=same; {} }}",
            quote(&format!("generation_{}", generation)),
            members
        ));
    }

    fn extension(&self) -> &str {
        &self.format
    }

    fn render(&mut self, output_path: &Path) -> Result<PathBuf> {
        let dot_path = output_path.with_extension("dot");
        std::fs::write(&dot_path, self.source())?;

        if self.format != "dot" {
            self.run_graphviz(&dot_path, output_path)?;
        }
        Ok(output_path.to_path_buf())
    }
}

/// Quote a DOT identifier or string.
fn quote(value: &str) -> String {
    let escaped = value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n");
    format!("\"{}\"", escaped)
}

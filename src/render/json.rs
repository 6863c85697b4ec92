//! JSON renderer: writes the graph description itself.

use std::path::{Path, PathBuf};

use super::Renderer;
use crate::error::Result;
use crate::graph::{Cluster, ColorClass, EdgeStyle, FamilyGraph, GraphEdge, GraphNode};
use crate::model::PersonId;

pub struct JsonRenderer {
    graph: FamilyGraph,
}

impl JsonRenderer {
    pub fn new(anchor: &str) -> Self {
        Self {
            graph: FamilyGraph {
                anchor: anchor.to_string(),
                ..Default::default()
            },
        }
    }

    pub fn graph(&self) -> &FamilyGraph {
        &self.graph
    }
}

impl Renderer for JsonRenderer {
    fn add_node(&mut self, id: &str, label: &str, color: ColorClass) {
        self.graph.nodes.push(GraphNode {
            id: id.to_string(),
            label: label.to_string(),
            color,
        });
    }

    fn add_edge(&mut self, from: &str, to: &str, style: EdgeStyle) {
        self.graph.edges.push(GraphEdge {
            from: from.to_string(),
            to: to.to_string(),
            style,
        });
    }

    fn add_cluster(&mut self, generation: i32, members: &[PersonId]) {
        self.graph.clusters.push(Cluster {
            generation,
            members: members.to_vec(),
        });
    }

    fn extension(&self) -> &str {
        "json"
    }

    fn render(&mut self, output_path: &Path) -> Result<PathBuf> {
        let json = serde_json::to_string_pretty(&self.graph)?;
        std::fs::write(output_path, json)?;
        Ok(output_path.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_json_render() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("A.json");

        let mut r = JsonRenderer::new("A");
        r.add_node("A", "Anna", ColorClass::Anchor);
        r.add_node("B", "B", ColorClass::Male);
        r.add_edge("A", "B", EdgeStyle::Partner);
        r.add_cluster(0, &["A".to_string(), "B".to_string()]);
        r.render(&target).unwrap();

        let written: FamilyGraph =
            serde_json::from_str(&std::fs::read_to_string(&target).unwrap()).unwrap();
        assert_eq!(&written, r.graph());

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&target).unwrap()).unwrap();
        assert_eq!(raw["edges"][0]["style"], "partner");
        assert_eq!(raw["nodes"][0]["color"], "anchor");
    }
}

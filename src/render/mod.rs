//! Diagram renderers.
//!
//! A renderer receives nodes, edges and same-rank clusters in emitted
//! order and writes one diagram file per anchor.

pub mod dot;
pub mod json;

pub use dot::DotRenderer;
pub use json::JsonRenderer;

use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::Result;
use crate::graph::{ColorClass, EdgeStyle, FamilyGraph};
use crate::model::PersonId;

/// Consumer of a family graph description
pub trait Renderer {
    fn add_node(&mut self, id: &str, label: &str, color: ColorClass);

    fn add_edge(&mut self, from: &str, to: &str, style: EdgeStyle);

    fn add_cluster(&mut self, generation: i32, members: &[PersonId]);

    /// File extension of the produced diagram, without the dot.
    fn extension(&self) -> &str;

    /// Write the diagram to `output_path` and return the written path.
    fn render(&mut self, output_path: &Path) -> Result<PathBuf>;
}

/// Feed a graph into a renderer: nodes, then edges, then clusters.
pub fn draw(graph: &FamilyGraph, renderer: &mut dyn Renderer) {
    for node in &graph.nodes {
        renderer.add_node(&node.id, &node.label, node.color);
    }
    for edge in &graph.edges {
        renderer.add_edge(&edge.from, &edge.to, edge.style);
    }
    for cluster in &graph.clusters {
        renderer.add_cluster(cluster.generation, &cluster.members);
    }
}

/// Create the renderer configured for `config.output.format`.
pub fn renderer_for(config: &Config, anchor: &str) -> Box<dyn Renderer> {
    match config.output.format.as_str() {
        "json" => Box::new(JsonRenderer::new(anchor)),
        format => Box::new(DotRenderer::new(
            anchor,
            config.palette.clone(),
            format,
            &config.output.graphviz_bin,
        )),
    }
}

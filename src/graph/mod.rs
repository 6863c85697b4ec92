//! Family graph module: generation assignment and diagram graph construction.
//!
//! Walks the canonical map from an anchor person, assigns each reachable
//! person a generation, and emits the nodes, edges and same-rank clusters
//! a renderer needs.

mod builder;
mod traversal;

pub use builder::{build_family_graph, GraphOptions};
pub use traversal::{assign_generations, Visit};

use serde::{Deserialize, Serialize};

use crate::model::{Gender, PersonId};

/// Colour class of a node; renderers map these to concrete colours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorClass {
    Anchor,
    Male,
    Female,
    NonBinary,
    Unknown,
    Union,
}

impl From<Gender> for ColorClass {
    fn from(gender: Gender) -> Self {
        match gender {
            Gender::M => ColorClass::Male,
            Gender::W => ColorClass::Female,
            Gender::NB => ColorClass::NonBinary,
            Gender::Unknown => ColorClass::Unknown,
        }
    }
}

/// Edge styles understood by renderers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeStyle {
    /// Parent (or union) to child.
    Parent,
    /// Undirected partnership.
    Partner,
    /// Mother or father into their union node.
    Union,
}

/// A node in the emitted graph: a person or a synthetic union node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    pub label: String,
    pub color: ColorClass,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub from: String,
    pub to: String,
    pub style: EdgeStyle,
}

/// All persons sharing one generation, laid out on the same rank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cluster {
    pub generation: i32,
    pub members: Vec<PersonId>,
}

/// Renderer-neutral description of one anchor's family diagram.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FamilyGraph {
    pub anchor: PersonId,
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    pub clusters: Vec<Cluster>,
}

impl FamilyGraph {
    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn person_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| n.color != ColorClass::Union)
            .count()
    }

    pub fn union_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| n.color == ColorClass::Union)
            .count()
    }

    pub fn generation_of(&self, id: &str) -> Option<i32> {
        self.clusters
            .iter()
            .find(|c| c.members.iter().any(|m| m == id))
            .map(|c| c.generation)
    }
}

/// Id of the union node shared by all children of one mother/father pair.
pub fn union_id(mother: &str, father: &str) -> String {
    format!("union:{}+{}", mother, father)
}

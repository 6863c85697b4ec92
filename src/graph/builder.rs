//! Graph construction for one anchor.

use std::collections::{BTreeMap, HashSet};

use super::traversal::assign_generations;
use super::{union_id, Cluster, ColorClass, EdgeStyle, FamilyGraph, GraphEdge, GraphNode};
use crate::error::Result;
use crate::merge::CanonicalMap;
use crate::model::{Person, PersonId};

/// Options controlling which edges are emitted.
#[derive(Debug, Clone)]
pub struct GraphOptions {
    /// Emit partner edges. Partners are still walked and clustered when off.
    pub include_partners: bool,
}

impl Default for GraphOptions {
    fn default() -> Self {
        Self {
            include_partners: true,
        }
    }
}

/// Emission state. Edge identity is tracked separately from visited nodes:
/// a person whose node is already placed may still gain edges from a later
/// branch.
struct Emitter<'a> {
    map: &'a CanonicalMap,
    graph: FamilyGraph,
    edges_seen: HashSet<(String, String, EdgeStyle)>,
    unions_seen: HashSet<String>,
}

impl<'a> Emitter<'a> {
    fn edge(&mut self, from: &str, to: &str, style: EdgeStyle) {
        // Partner edges are undirected: key them by the ordered pair
        let key = if style == EdgeStyle::Partner && to < from {
            (to.to_string(), from.to_string(), style)
        } else {
            (from.to_string(), to.to_string(), style)
        };
        if self.edges_seen.insert(key) {
            self.graph.edges.push(GraphEdge {
                from: from.to_string(),
                to: to.to_string(),
                style,
            });
        }
    }

    fn union_node(&mut self, mother: &str, father: &str) -> String {
        let id = union_id(mother, father);
        if self.unions_seen.insert(id.clone()) {
            self.graph.nodes.push(GraphNode {
                id: id.clone(),
                label: String::new(),
                color: ColorClass::Union,
            });
        }
        id
    }

    /// Edges from the parents of `child_id` into it: through a union node
    /// for every mother/father pair of two distinct persons, direct for a
    /// parent that is in no such pair.
    ///
    /// A person listed as both mother and father is one parent, not a couple.
    fn parent_edges(&mut self, child_id: &str) {
        let map = self.map;
        let child = match map.get(child_id) {
            Some(c) => c,
            None => return,
        };

        let mut paired: HashSet<&str> = HashSet::new();
        for mother in &child.mothers {
            for father in &child.fathers {
                if mother == father {
                    continue;
                }
                let union = self.union_node(mother, father);
                self.edge(mother, &union, EdgeStyle::Union);
                self.edge(father, &union, EdgeStyle::Union);
                self.edge(&union, child_id, EdgeStyle::Parent);
                paired.insert(mother);
                paired.insert(father);
            }
        }

        for parent in child.parents() {
            if !paired.contains(parent.as_str()) {
                self.edge(parent, child_id, EdgeStyle::Parent);
            }
        }
    }
}

/// Build the node/edge/cluster description for `anchor`.
pub fn build_family_graph(
    map: &CanonicalMap,
    anchor: &str,
    options: &GraphOptions,
) -> Result<FamilyGraph> {
    let visits = assign_generations(map, anchor)?;

    let mut emitter = Emitter {
        map,
        graph: FamilyGraph {
            anchor: anchor.to_string(),
            ..Default::default()
        },
        edges_seen: HashSet::new(),
        unions_seen: HashSet::new(),
    };
    let mut clusters: BTreeMap<i32, Vec<PersonId>> = BTreeMap::new();

    for visit in &visits {
        let person = match map.get(&visit.id) {
            Some(p) => p,
            None => continue,
        };

        emitter.graph.nodes.push(GraphNode {
            id: person.id.clone(),
            label: label(person),
            color: if person.id == anchor {
                ColorClass::Anchor
            } else {
                ColorClass::from(person.gender)
            },
        });
        clusters
            .entry(visit.generation)
            .or_default()
            .push(person.id.clone());

        if options.include_partners {
            for partner in &person.partners {
                emitter.edge(&person.id, partner, EdgeStyle::Partner);
            }
        }
        emitter.parent_edges(&person.id);
        for child in &person.children {
            emitter.parent_edges(child);
        }
    }

    let mut graph = emitter.graph;
    graph.clusters = clusters
        .into_iter()
        .map(|(generation, members)| Cluster { generation, members })
        .collect();

    log::debug!(
        "Built graph for {}: {} nodes, {} edges, {} generations",
        anchor,
        graph.nodes.len(),
        graph.edges.len(),
        graph.clusters.len()
    );
    Ok(graph)
}

/// Node label: name on the first line, life dates on the second.
fn label(person: &Person) -> String {
    let mut dates = Vec::new();
    if let Some(birth) = person.date_of_birth.as_deref().filter(|d| !d.is_empty()) {
        dates.push(format!("* {}", birth));
    }
    if let Some(death) = person.date_of_death.as_deref().filter(|d| !d.is_empty()) {
        dates.push(format!("† {}", death));
    }

    let name = person.display_name();
    if dates.is_empty() {
        name
    } else {
        format!("{}\n{}", name, dates.join("  "))
    }
}

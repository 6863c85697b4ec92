//! Data-integrity reporting.
//!
//! Integrity problems in the dataset never abort a run: the offending
//! relation is dropped (or, for cycles, left in place) and an
//! [`IntegrityIssue`] is reported next to the result.

use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

use crate::merge::CanonicalMap;
use crate::model::{Gender, Person, PersonId, RelationKind};

/// A recoverable data-integrity violation found while resolving or merging.
#[derive(Error, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IntegrityIssue {
    /// A record names itself as its own mother, father or partner.
    #[error("{person} declares itself as its own {kind}")]
    SelfReference { person: PersonId, kind: RelationKind },

    /// A relation points at an id that has no record.
    #[error("{person} declares {kind} {target}, but no record {target} exists")]
    MissingTarget {
        person: PersonId,
        kind: RelationKind,
        target: PersonId,
    },

    /// Following mother/father links from a person leads back to it.
    #[error("parent cycle: {}", .members.join(" -> "))]
    ParentCycle { members: Vec<PersonId> },

    /// A parent/child pair whose mother/father slot cannot be derived
    /// because the parent's gender is not M or W.
    #[error("cannot assign parent slot of {parent} ({gender}) for child {child}")]
    UnassignableParentSlot {
        parent: PersonId,
        child: PersonId,
        gender: Gender,
    },
}

impl IntegrityIssue {
    /// Short machine-friendly name of the issue kind.
    pub fn kind(&self) -> &'static str {
        match self {
            IntegrityIssue::SelfReference { .. } => "self_reference",
            IntegrityIssue::MissingTarget { .. } => "missing_target",
            IntegrityIssue::ParentCycle { .. } => "parent_cycle",
            IntegrityIssue::UnassignableParentSlot { .. } => "unassignable_parent_slot",
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    InProgress,
    Done,
}

/// Find cycles along child -> parent links.
///
/// Iterative three-colour DFS in id order. Each back edge yields one cycle,
/// listed from the first repeated ancestor down to the person that closes
/// it; a cycle is rotated to start at its smallest id so the same loop found
/// from different entry points compares equal.
pub fn find_parent_cycles(people: &BTreeMap<PersonId, Person>) -> Vec<Vec<PersonId>> {
    let mut marks: BTreeMap<&str, Mark> = BTreeMap::new();
    let mut cycles = BTreeSet::new();

    for start in people.keys() {
        if marks.contains_key(start.as_str()) {
            continue;
        }

        // (person, its parents, next parent index)
        let mut stack: Vec<(&str, Vec<&str>, usize)> = Vec::new();
        marks.insert(start.as_str(), Mark::InProgress);
        stack.push((start.as_str(), parents_of(people, start), 0));

        while let Some((node, parents, idx)) = stack.last_mut() {
            if *idx >= parents.len() {
                marks.insert(*node, Mark::Done);
                stack.pop();
                continue;
            }
            let next = parents[*idx];
            *idx += 1;

            match marks.get(next) {
                Some(Mark::InProgress) => {
                    let pos = stack.iter().position(|(n, _, _)| *n == next).unwrap_or(0);
                    let members: Vec<PersonId> =
                        stack[pos..].iter().map(|(n, _, _)| n.to_string()).collect();
                    cycles.insert(rotate_to_min(members));
                }
                Some(Mark::Done) => {}
                None => {
                    marks.insert(next, Mark::InProgress);
                    stack.push((next, parents_of(people, next), 0));
                }
            }
        }
    }

    cycles.into_iter().collect()
}

fn parents_of<'a>(people: &'a BTreeMap<PersonId, Person>, id: &str) -> Vec<&'a str> {
    people
        .get(id)
        .map(|p| {
            p.parents()
                .filter(|parent| people.contains_key(parent.as_str()))
                .map(String::as_str)
                .collect()
        })
        .unwrap_or_default()
}

fn rotate_to_min(mut members: Vec<PersonId>) -> Vec<PersonId> {
    if let Some(min_pos) = members
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.cmp(b.1))
        .map(|(i, _)| i)
    {
        members.rotate_left(min_pos);
    }
    members
}

/// Check the structural invariants of a canonical map.
/// Returns one human-readable line per violation; empty when consistent.
pub fn check_invariants(map: &CanonicalMap) -> Vec<String> {
    let mut violations = Vec::new();

    for (id, person) in map.iter() {
        if person.mothers.contains(id)
            || person.fathers.contains(id)
            || person.partners.contains(id)
            || person.children.contains(id)
        {
            violations.push(format!("{} references itself", id));
        }

        for partner in &person.partners {
            let symmetric = map
                .get(partner)
                .map(|q| q.partners.contains(id))
                .unwrap_or(false);
            if !symmetric {
                violations.push(format!("partner {} -> {} is not symmetric", id, partner));
            }
        }

        for child in &person.children {
            let derived = map.get(child).map(|c| c.has_parent(id)).unwrap_or(false);
            if !derived {
                violations.push(format!("{} lists child {} without a parent link", id, child));
            }
        }

        for parent in person.parents() {
            let listed = map
                .get(parent)
                .map(|p| p.children.contains(id))
                .unwrap_or(false);
            if !listed {
                violations.push(format!("{} has parent {} that does not list it as child", id, parent));
            }
        }

        for kind in [RelationKind::Mother, RelationKind::Father, RelationKind::Partner] {
            for other in person.relations(kind) {
                if !map.contains(other) {
                    violations.push(format!("{} {} {} is not in the canonical map", id, kind, other));
                }
            }
        }
    }

    violations
}

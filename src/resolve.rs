//! Relationship resolution: discover the connected family of one root.
//!
//! Starting from a root id, every person reachable through mother, father
//! or partner markup is resolved, following both the relations a record
//! declares itself (forward) and the ones other records declare about it
//! (backward). Traversal uses an explicit worklist so deep lineages cannot
//! overflow the stack.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use crate::error::{FamtreeError, Result};
use crate::integrity::{find_parent_cycles, IntegrityIssue};
use crate::model::{Person, PersonId, RelationKind};
use crate::source::RecordSource;

/// Everything discovered from one root.
#[derive(Debug, Clone)]
pub struct Resolution {
    /// The root person with its resolved relation sets.
    pub root: Person,
    /// All persons in the root's component, in discovery order (root first).
    pub people: Vec<Person>,
    /// Data-integrity problems met on the way.
    pub issues: Vec<IntegrityIssue>,
}

/// Per-root working state: the persons discovered so far, keyed by id,
/// plus their discovery order.
#[derive(Default)]
struct Discovered {
    people: BTreeMap<PersonId, Person>,
    order: Vec<PersonId>,
}

impl Discovered {
    fn entry(&mut self, id: &str) -> &mut Person {
        if !self.people.contains_key(id) {
            self.order.push(id.to_string());
        }
        self.people
            .entry(id.to_string())
            .or_insert_with(|| Person::new(id))
    }

    fn into_people(mut self) -> Vec<Person> {
        self.order
            .iter()
            .filter_map(|id| self.people.remove(id))
            .collect()
    }
}

/// Resolve the full family component around `root_id`.
///
/// Fails only when the root itself has no record; every other gap is
/// reported as an [`IntegrityIssue`] and skipped.
pub fn resolve<S: RecordSource + ?Sized>(source: &S, root_id: &str) -> Result<Resolution> {
    if source.person_by_id(root_id).is_none() {
        return Err(FamtreeError::PersonNotFound(root_id.to_string()));
    }

    let mut found = Discovered::default();
    let mut issues = Vec::new();
    let mut resolved: HashSet<PersonId> = HashSet::new();
    let mut worklist: Vec<PersonId> = vec![root_id.to_string()];

    while let Some(id) = worklist.pop() {
        if !resolved.insert(id.clone()) {
            continue;
        }
        let record = match source.person_by_id(&id) {
            Some(record) => record,
            None => continue,
        };
        found.entry(&id).fill_from_record(record);

        let mut next: Vec<PersonId> = Vec::new();

        for rel in source.forward_relations(&id) {
            if rel.other == id {
                log::warn!("{} declares itself as its own {}, dropping", id, rel.kind);
                issues.push(IntegrityIssue::SelfReference {
                    person: id.clone(),
                    kind: rel.kind,
                });
                continue;
            }
            if source.person_by_id(&rel.other).is_none() {
                log::warn!("{} declares {} {} which has no record, skipping", id, rel.kind, rel.other);
                issues.push(IntegrityIssue::MissingTarget {
                    person: id.clone(),
                    kind: rel.kind,
                    target: rel.other.clone(),
                });
                continue;
            }
            found.entry(&id).add_relation(rel.kind, &rel.other);
            if rel.kind == RelationKind::Partner {
                found.entry(&rel.other).add_relation(RelationKind::Partner, &id);
            }
            next.push(rel.other);
        }

        // `rel.other` names the claiming record: `id` is its mother,
        // father or partner.
        for rel in source.backward_relations(&id) {
            if rel.other == id {
                // Already reported from the forward side of the same markup
                continue;
            }
            match rel.kind {
                RelationKind::Mother | RelationKind::Father => {
                    found.entry(&rel.other).add_relation(rel.kind, &id);
                }
                RelationKind::Partner => {
                    found.entry(&id).add_relation(RelationKind::Partner, &rel.other);
                    found.entry(&rel.other).add_relation(RelationKind::Partner, &id);
                }
            }
            next.push(rel.other);
        }

        // Reverse so the first declared relation is resolved first
        for other in next.into_iter().rev() {
            if !resolved.contains(&other) {
                worklist.push(other);
            }
        }
    }

    for members in find_parent_cycles(&found.people) {
        log::warn!("Parent cycle reachable from {}: {}", root_id, members.join(" -> "));
        issues.push(IntegrityIssue::ParentCycle { members });
    }

    let people = found.into_people();
    let root = people
        .iter()
        .find(|p| p.id == root_id)
        .cloned()
        .ok_or_else(|| FamtreeError::PersonNotFound(root_id.to_string()))?;

    log::debug!(
        "Resolved {}: {} persons, {} issues",
        root_id,
        people.len(),
        issues.len()
    );

    Ok(Resolution { root, people, issues })
}

/// Resolve every given root. Roots without a record are logged and skipped.
///
/// Returns the per-root person lists and the deduplicated set of issues.
pub fn resolve_all<S: RecordSource + ?Sized>(
    source: &S,
    roots: &[PersonId],
) -> (BTreeMap<PersonId, Vec<Person>>, BTreeSet<IntegrityIssue>) {
    let mut trees = BTreeMap::new();
    let mut issues = BTreeSet::new();

    for root in roots {
        match resolve(source, root) {
            Ok(resolution) => {
                issues.extend(resolution.issues);
                trees.insert(root.clone(), resolution.people);
            }
            Err(e) => {
                log::warn!("Skipping root {}: {}", root, e);
            }
        }
    }

    log::info!(
        "Resolved {} roots ({} distinct integrity issues)",
        trees.len(),
        issues.len()
    );
    (trees, issues)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Gender, PersonRecord};
    use crate::source::MemorySource;

    fn find<'a>(people: &'a [Person], id: &str) -> &'a Person {
        people.iter().find(|p| p.id == id).unwrap()
    }

    #[test]
    fn test_resolve_forward_and_backward() {
        // B names A as father; A names nobody.
        let source = MemorySource::from_records(vec![
            PersonRecord::new("A").with_gender(Gender::M),
            PersonRecord::new("B").with_relation(RelationKind::Father, "A"),
        ]);

        let from_a = resolve(&source, "A").unwrap();
        assert_eq!(from_a.root.id, "A");
        assert_eq!(from_a.people.len(), 2);
        assert!(find(&from_a.people, "B").fathers.contains("A"));
        assert!(from_a.issues.is_empty());

        let from_b = resolve(&source, "B").unwrap();
        assert_eq!(from_b.people.len(), 2);
        assert!(from_b.root.fathers.contains("A"));
    }

    #[test]
    fn test_backward_partner_uses_claiming_record() {
        let source = MemorySource::from_records(vec![
            PersonRecord::new("A"),
            PersonRecord::new("B").with_relation(RelationKind::Partner, "A"),
        ]);
        let res = resolve(&source, "A").unwrap();
        assert!(res.root.partners.contains("B"));
        assert!(find(&res.people, "B").partners.contains("A"));
    }

    #[test]
    fn test_partner_loop_terminates() {
        let source = MemorySource::from_records(vec![
            PersonRecord::new("A").with_relation(RelationKind::Partner, "B"),
            PersonRecord::new("B").with_relation(RelationKind::Partner, "A"),
        ]);
        let res = resolve(&source, "A").unwrap();
        assert_eq!(res.people.len(), 2);
        assert_eq!(res.root.partners.len(), 1);
        assert_eq!(find(&res.people, "B").partners.len(), 1);
    }

    #[test]
    fn test_parent_cycle_reported() {
        let source = MemorySource::from_records(vec![
            PersonRecord::new("A").with_relation(RelationKind::Mother, "B"),
            PersonRecord::new("B").with_relation(RelationKind::Father, "A"),
        ]);
        let res = resolve(&source, "A").unwrap();
        assert_eq!(res.people.len(), 2);
        assert!(res
            .issues
            .iter()
            .any(|i| matches!(i, IntegrityIssue::ParentCycle { members } if members.len() == 2)));
    }

    #[test]
    fn test_self_reference_dropped() {
        let source = MemorySource::from_records(vec![PersonRecord::new("A")
            .with_relation(RelationKind::Mother, "A")
            .with_relation(RelationKind::Partner, "A")]);
        let res = resolve(&source, "A").unwrap();
        assert!(res.root.mothers.is_empty());
        assert!(res.root.partners.is_empty());
        assert_eq!(res.issues.len(), 2);
        assert!(res
            .issues
            .iter()
            .all(|i| matches!(i, IntegrityIssue::SelfReference { .. })));
    }

    #[test]
    fn test_missing_target_skipped() {
        let source = MemorySource::from_records(vec![PersonRecord::new("A")
            .with_relation(RelationKind::Father, "GHOST")
            .with_relation(RelationKind::Mother, "M"),
            PersonRecord::new("M")]);
        let res = resolve(&source, "A").unwrap();
        assert!(res.root.fathers.is_empty());
        assert!(res.root.mothers.contains("M"));
        assert_eq!(res.people.len(), 2);
        assert_eq!(
            res.issues,
            vec![IntegrityIssue::MissingTarget {
                person: "A".to_string(),
                kind: RelationKind::Father,
                target: "GHOST".to_string(),
            }]
        );
    }

    #[test]
    fn test_unknown_root() {
        let source = MemorySource::new();
        assert!(matches!(
            resolve(&source, "NOPE"),
            Err(FamtreeError::PersonNotFound(_))
        ));
    }

    #[test]
    fn test_deep_lineage_no_stack_overflow() {
        let depth = 20_000;
        let records: Vec<PersonRecord> = (0..depth)
            .map(|i| {
                let record = PersonRecord::new(format!("P{}", i));
                if i > 0 {
                    record.with_relation(RelationKind::Father, &format!("P{}", i - 1))
                } else {
                    record
                }
            })
            .collect();
        let source = MemorySource::from_records(records);
        let res = resolve(&source, &format!("P{}", depth - 1)).unwrap();
        assert_eq!(res.people.len(), depth);
        assert!(res.issues.is_empty());
    }

    #[test]
    fn test_missing_optional_fields_tolerated() {
        let source = MemorySource::from_records(vec![PersonRecord::new("A")]);
        let res = resolve(&source, "A").unwrap();
        assert!(res.root.forename.is_none());
        assert!(res.root.date_of_birth.is_none());
        assert_eq!(res.root.gender, Gender::Unknown);
    }

    #[test]
    fn test_resolve_all_collects_roots_and_dedupes_issues() {
        let source = MemorySource::from_records(vec![
            PersonRecord::new("A").with_relation(RelationKind::Father, "GHOST"),
            PersonRecord::new("B").with_relation(RelationKind::Partner, "A"),
        ]);
        let roots = source.all_person_ids();
        let (trees, issues) = resolve_all(&source, &roots);
        assert_eq!(trees.len(), 2);
        assert_eq!(trees["A"].len(), 2);
        // Found from both roots, reported once
        assert_eq!(issues.len(), 1);
    }
}

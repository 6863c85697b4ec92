//! Canonical merging of per-root resolutions.
//!
//! Every root resolves its own copy of the persons it reaches. Merging
//! flattens those copies into one person per id, then completes the
//! derived relations until nothing changes:
//!
//! 1. union all relation sets of every copy of an id
//! 2. make partner links symmetric
//! 3. derive `children` from mother/father links
//! 4. put each parent of known gender into its gender slot (M -> fathers,
//!    W -> mothers) and list the child under it, repeated to a fixed point
//!
//! Apart from dropping self references and children that cannot be tied
//! to a mother/father slot, every step only adds. Running the merge again
//! on its own output yields the same persons.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::integrity::IntegrityIssue;
use crate::model::{Gender, Person, PersonId, RelationKind};

/// The deduplicated id -> person map. Read-only once built.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CanonicalMap {
    people: BTreeMap<PersonId, Person>,
    /// (parent, child) pairs whose parent slot could not be assigned.
    unassigned: BTreeSet<(PersonId, PersonId)>,
}

impl CanonicalMap {
    pub fn get(&self, id: &str) -> Option<&Person> {
        self.people.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.people.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PersonId, &Person)> {
        self.people.iter()
    }

    pub fn persons(&self) -> impl Iterator<Item = &Person> {
        self.people.values()
    }

    pub fn ids(&self) -> Vec<PersonId> {
        self.people.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.people.len()
    }

    pub fn is_empty(&self) -> bool {
        self.people.is_empty()
    }

    /// Parent/child pairs left without a mother/father slot because the
    /// parent's gender is neither M nor W.
    pub fn unassigned_slots(&self) -> Vec<IntegrityIssue> {
        self.unassigned
            .iter()
            .map(|(parent, child)| IntegrityIssue::UnassignableParentSlot {
                parent: parent.clone(),
                child: child.clone(),
                gender: self
                    .people
                    .get(parent)
                    .map(|p| p.gender)
                    .unwrap_or_default(),
            })
            .collect()
    }
}

/// Merge per-root resolution results into one canonical map.
pub fn merge(trees: &BTreeMap<PersonId, Vec<Person>>) -> CanonicalMap {
    let map = merge_people(trees.values().flatten());
    log::info!(
        "Merged {} root resolutions into {} canonical persons",
        trees.len(),
        map.len()
    );
    map
}

/// Merge any collection of (possibly duplicate) person discoveries.
pub fn merge_people<'a>(people: impl IntoIterator<Item = &'a Person>) -> CanonicalMap {
    let mut canonical: BTreeMap<PersonId, Person> = BTreeMap::new();

    for person in people {
        canonical
            .entry(person.id.clone())
            .or_insert_with(|| Person::new(person.id.clone()))
            .absorb(person);
    }

    for person in canonical.values_mut() {
        if person.strip_self_references() {
            log::warn!("Dropped self reference on {}", person.id);
        }
    }

    add_missing_entries(&mut canonical);
    symmetrize_partners(&mut canonical);
    derive_children(&mut canonical);
    let unassigned = complete_parent_slots(&mut canonical);

    CanonicalMap {
        people: canonical,
        unassigned,
    }
}

/// Create bare entries for ids that are referenced but were never resolved.
fn add_missing_entries(canonical: &mut BTreeMap<PersonId, Person>) {
    let referenced: BTreeSet<PersonId> = canonical
        .values()
        .flat_map(|p| {
            p.mothers
                .iter()
                .chain(&p.fathers)
                .chain(&p.partners)
                .chain(&p.children)
        })
        .filter(|id| !canonical.contains_key(*id))
        .cloned()
        .collect();

    for id in referenced {
        log::debug!("Creating bare entry for referenced id {}", id);
        canonical.insert(id.clone(), Person::new(id));
    }
}

fn symmetrize_partners(canonical: &mut BTreeMap<PersonId, Person>) {
    let pairs: Vec<(PersonId, PersonId)> = canonical
        .values()
        .flat_map(|p| p.partners.iter().map(move |q| (p.id.clone(), q.clone())))
        .collect();

    for (p, q) in pairs {
        if let Some(partner) = canonical.get_mut(&q) {
            partner.add_relation(RelationKind::Partner, &p);
        }
    }
}

fn derive_children(canonical: &mut BTreeMap<PersonId, Person>) {
    let links: Vec<(PersonId, PersonId)> = canonical
        .values()
        .flat_map(|c| c.parents().map(move |p| (p.clone(), c.id.clone())))
        .collect();

    for (parent, child) in links {
        if let Some(p) = canonical.get_mut(&parent) {
            if parent != child {
                p.children.insert(child);
            }
        }
    }
}

/// Place parents of known gender into their slot on the child and list
/// the child on the parent, until a pass makes no change.
///
/// Parents with NB or unknown gender are never slotted; a child listed
/// under such a parent without a matching mother/father link is returned
/// as unassigned and removed from the parent's children.
fn complete_parent_slots(canonical: &mut BTreeMap<PersonId, Person>) -> BTreeSet<(PersonId, PersonId)> {
    let mut unassigned = BTreeSet::new();
    let mut pass = 0usize;

    loop {
        pass += 1;
        let mut changed = false;

        let mut pairs: BTreeSet<(PersonId, PersonId)> = BTreeSet::new();
        for person in canonical.values() {
            for parent in person.parents() {
                pairs.insert((parent.clone(), person.id.clone()));
            }
            for child in &person.children {
                pairs.insert((person.id.clone(), child.clone()));
            }
        }

        for (parent, child) in pairs {
            if parent == child {
                continue;
            }
            let gender = match canonical.get(&parent) {
                Some(p) => p.gender,
                None => continue,
            };
            let slot = match gender {
                Gender::M => RelationKind::Father,
                Gender::W => RelationKind::Mother,
                Gender::NB | Gender::Unknown => {
                    let linked = canonical
                        .get(&child)
                        .map(|c| c.has_parent(&parent))
                        .unwrap_or(false);
                    if linked {
                        if let Some(p) = canonical.get_mut(&parent) {
                            changed |= p.children.insert(child);
                        }
                    } else {
                        if unassigned.insert((parent.clone(), child.clone())) {
                            log::warn!(
                                "Cannot assign parent slot for {} ({}) of child {}",
                                parent,
                                gender,
                                child
                            );
                        }
                        // children stays derived from mother/father links only
                        if let Some(p) = canonical.get_mut(&parent) {
                            p.children.remove(&child);
                        }
                    }
                    continue;
                }
            };

            if let Some(c) = canonical.get_mut(&child) {
                if c.add_relation(slot, &parent) {
                    log::debug!("Completed {} slot of {} with {}", slot, child, parent);
                    changed = true;
                }
            }
            if let Some(p) = canonical.get_mut(&parent) {
                changed |= p.children.insert(child);
            }
        }

        if !changed {
            break;
        }
    }

    log::debug!("Parent slots settled after {} passes", pass);
    unassigned
}

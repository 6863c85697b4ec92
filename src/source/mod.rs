//! Record source: read access to person records and their relation markup.

pub mod tei;

use std::collections::BTreeMap;

use crate::model::{PersonId, PersonRecord, RelationRef};

pub use tei::{discover_files, load_path, parse_document};

/// Read-only view over a genealogy dataset.
pub trait RecordSource {
    /// Look up a record by id.
    fn person_by_id(&self, id: &str) -> Option<&PersonRecord>;

    /// All record ids, sorted.
    fn all_person_ids(&self) -> Vec<PersonId>;

    /// Relations declared on the record itself.
    fn forward_relations(&self, id: &str) -> Vec<RelationRef>;

    /// Relations declared on other records that name `id` as their target.
    /// `other` holds the id of the claiming record.
    fn backward_relations(&self, id: &str) -> Vec<RelationRef>;
}

/// In-memory record store with a backward-relation index.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    records: BTreeMap<PersonId, PersonRecord>,
    backward: BTreeMap<PersonId, Vec<RelationRef>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: impl IntoIterator<Item = PersonRecord>) -> Self {
        let mut source = Self::new();
        for record in records {
            source.insert(record);
        }
        source
    }

    /// Insert a record. A record whose id is already present is merged
    /// into the existing one.
    pub fn insert(&mut self, record: PersonRecord) {
        let id = record.id.clone();
        for rel in &record.relations {
            let claims = self.backward.entry(rel.other.clone()).or_default();
            let claim = RelationRef::new(rel.kind, id.clone());
            if !claims.contains(&claim) {
                claims.push(claim);
            }
        }

        match self.records.get_mut(&id) {
            Some(existing) => {
                log::warn!("Duplicate record {}: merging relations, keeping first demographics", id);
                existing.absorb(record);
            }
            None => {
                self.records.insert(id, record);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl RecordSource for MemorySource {
    fn person_by_id(&self, id: &str) -> Option<&PersonRecord> {
        self.records.get(id)
    }

    fn all_person_ids(&self) -> Vec<PersonId> {
        self.records.keys().cloned().collect()
    }

    fn forward_relations(&self, id: &str) -> Vec<RelationRef> {
        self.records
            .get(id)
            .map(|r| r.relations.clone())
            .unwrap_or_default()
    }

    fn backward_relations(&self, id: &str) -> Vec<RelationRef> {
        self.backward.get(id).cloned().unwrap_or_default()
    }
}

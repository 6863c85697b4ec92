//! Genealogy data model: source records and resolved persons.
//!
//! A [`PersonRecord`] is what the record source hands out, one per `xml:id`,
//! carrying only the relations declared on that record. A [`Person`] is the
//! resolved view with all four relation sets filled in from both directions.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Stable, globally unique person identifier (e.g. `CFIB00169`).
pub type PersonId = String;

/// Recorded gender of a person.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Gender {
    M,
    W,
    NB,
    #[default]
    Unknown,
}

impl Gender {
    /// Parse the gender codes found in genealogy markup.
    /// Anything unrecognised maps to `Unknown`.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "m" | "1" | "male" | "männlich" => Gender::M,
            "w" | "f" | "2" | "female" | "weiblich" => Gender::W,
            "nb" | "x" | "3" | "diverse" | "non-binary" => Gender::NB,
            _ => Gender::Unknown,
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Gender::M => "M",
            Gender::W => "W",
            Gender::NB => "NB",
            Gender::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Relation types that can be declared in the records.
/// `children` is never declared, only derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationKind {
    Mother,
    Father,
    Partner,
}

impl RelationKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "mother" => Some(RelationKind::Mother),
            "father" => Some(RelationKind::Father),
            "partner" => Some(RelationKind::Partner),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RelationKind::Mother => "mother",
            RelationKind::Father => "father",
            RelationKind::Partner => "partner",
        }
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One relation as seen from a given record.
///
/// For forward relations `other` is the target named on the record; for
/// backward relations it is the id of the record making the claim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RelationRef {
    pub kind: RelationKind,
    pub other: PersonId,
}

impl RelationRef {
    pub fn new(kind: RelationKind, other: impl Into<PersonId>) -> Self {
        Self {
            kind,
            other: other.into(),
        }
    }
}

/// A raw person record as exposed by the record source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonRecord {
    pub id: PersonId,
    pub forename: Option<String>,
    pub surname: Option<String>,
    pub gender: Gender,
    pub date_of_birth: Option<String>,
    pub date_of_death: Option<String>,
    pub role: Option<String>,
    /// Relations declared on this record, in document order.
    pub relations: Vec<RelationRef>,
}

impl PersonRecord {
    pub fn new(id: impl Into<PersonId>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn with_name(mut self, forename: &str, surname: &str) -> Self {
        self.forename = Some(forename.to_string());
        self.surname = Some(surname.to_string());
        self
    }

    pub fn with_gender(mut self, gender: Gender) -> Self {
        self.gender = gender;
        self
    }

    pub fn with_dates(mut self, birth: Option<&str>, death: Option<&str>) -> Self {
        self.date_of_birth = birth.map(str::to_string);
        self.date_of_death = death.map(str::to_string);
        self
    }

    pub fn with_relation(mut self, kind: RelationKind, other: &str) -> Self {
        self.relations.push(RelationRef::new(kind, other));
        self
    }

    /// Fold a duplicate record with the same id into this one.
    /// Relations are unioned; demographics keep the first non-empty value.
    pub fn absorb(&mut self, other: PersonRecord) {
        fill(&mut self.forename, other.forename);
        fill(&mut self.surname, other.surname);
        fill(&mut self.date_of_birth, other.date_of_birth);
        fill(&mut self.date_of_death, other.date_of_death);
        fill(&mut self.role, other.role);
        if self.gender == Gender::Unknown {
            self.gender = other.gender;
        }
        for rel in other.relations {
            if !self.relations.contains(&rel) {
                self.relations.push(rel);
            }
        }
    }
}

fn fill(slot: &mut Option<String>, value: Option<String>) {
    if slot.is_none() {
        *slot = value;
    }
}

/// A resolved person with its four relation sets.
///
/// Sets are ordered so every traversal over them is reproducible.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub id: PersonId,
    pub forename: Option<String>,
    pub surname: Option<String>,
    pub gender: Gender,
    pub date_of_birth: Option<String>,
    pub date_of_death: Option<String>,
    pub role: Option<String>,
    pub mothers: BTreeSet<PersonId>,
    pub fathers: BTreeSet<PersonId>,
    pub partners: BTreeSet<PersonId>,
    pub children: BTreeSet<PersonId>,
}

impl Person {
    pub fn new(id: impl Into<PersonId>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    /// Copy demographic fields from a source record, keeping values already set.
    pub fn fill_from_record(&mut self, record: &PersonRecord) {
        fill(&mut self.forename, record.forename.clone());
        fill(&mut self.surname, record.surname.clone());
        fill(&mut self.date_of_birth, record.date_of_birth.clone());
        fill(&mut self.date_of_death, record.date_of_death.clone());
        fill(&mut self.role, record.role.clone());
        if self.gender == Gender::Unknown {
            self.gender = record.gender;
        }
    }

    pub fn relations(&self, kind: RelationKind) -> &BTreeSet<PersonId> {
        match kind {
            RelationKind::Mother => &self.mothers,
            RelationKind::Father => &self.fathers,
            RelationKind::Partner => &self.partners,
        }
    }

    pub fn relations_mut(&mut self, kind: RelationKind) -> &mut BTreeSet<PersonId> {
        match kind {
            RelationKind::Mother => &mut self.mothers,
            RelationKind::Father => &mut self.fathers,
            RelationKind::Partner => &mut self.partners,
        }
    }

    /// Add a relation. Returns false when the target is this person or the
    /// relation was already present.
    pub fn add_relation(&mut self, kind: RelationKind, other: &str) -> bool {
        if other == self.id {
            return false;
        }
        self.relations_mut(kind).insert(other.to_string())
    }

    /// Mothers followed by fathers, each in id order.
    pub fn parents(&self) -> impl Iterator<Item = &PersonId> {
        self.mothers.iter().chain(self.fathers.iter())
    }

    pub fn has_parent(&self, id: &str) -> bool {
        self.mothers.contains(id) || self.fathers.contains(id)
    }

    /// Union another discovery of the same person into this one.
    pub fn absorb(&mut self, other: &Person) {
        fill(&mut self.forename, other.forename.clone());
        fill(&mut self.surname, other.surname.clone());
        fill(&mut self.date_of_birth, other.date_of_birth.clone());
        fill(&mut self.date_of_death, other.date_of_death.clone());
        fill(&mut self.role, other.role.clone());
        if self.gender == Gender::Unknown {
            self.gender = other.gender;
        }
        self.mothers.extend(other.mothers.iter().cloned());
        self.fathers.extend(other.fathers.iter().cloned());
        self.partners.extend(other.partners.iter().cloned());
        self.children.extend(other.children.iter().cloned());
    }

    /// Drop any relation that points back at this person.
    pub fn strip_self_references(&mut self) -> bool {
        let id = self.id.clone();
        let mut removed = self.mothers.remove(&id);
        removed |= self.fathers.remove(&id);
        removed |= self.partners.remove(&id);
        removed |= self.children.remove(&id);
        removed
    }

    /// Human-readable name, falling back to the id.
    pub fn display_name(&self) -> String {
        let name = [self.forename.as_deref(), self.surname.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if name.is_empty() {
            self.id.clone()
        } else {
            name
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gender_parse() {
        assert_eq!(Gender::parse("M"), Gender::M);
        assert_eq!(Gender::parse(" female "), Gender::W);
        assert_eq!(Gender::parse("F"), Gender::W);
        assert_eq!(Gender::parse("NB"), Gender::NB);
        assert_eq!(Gender::parse(""), Gender::Unknown);
        assert_eq!(Gender::parse("?"), Gender::Unknown);
    }

    #[test]
    fn test_relation_kind_parse() {
        assert_eq!(RelationKind::parse("mother"), Some(RelationKind::Mother));
        assert_eq!(RelationKind::parse("partner"), Some(RelationKind::Partner));
        assert_eq!(RelationKind::parse("child"), None);
    }

    #[test]
    fn test_add_relation_rejects_self() {
        let mut p = Person::new("A");
        assert!(!p.add_relation(RelationKind::Mother, "A"));
        assert!(p.add_relation(RelationKind::Mother, "B"));
        assert!(!p.add_relation(RelationKind::Mother, "B"));
        assert_eq!(p.mothers.len(), 1);
    }

    #[test]
    fn test_absorb_unions_sets_and_keeps_first_demographics() {
        let mut a = Person::new("A");
        a.forename = Some("Anna".to_string());
        a.mothers.insert("M".to_string());

        let mut b = Person::new("A");
        b.forename = Some("Anne".to_string());
        b.surname = Some("Huber".to_string());
        b.gender = Gender::W;
        b.mothers.insert("M".to_string());
        b.fathers.insert("F".to_string());

        a.absorb(&b);
        assert_eq!(a.forename.as_deref(), Some("Anna"));
        assert_eq!(a.surname.as_deref(), Some("Huber"));
        assert_eq!(a.gender, Gender::W);
        assert_eq!(a.mothers.len(), 1);
        assert!(a.fathers.contains("F"));
    }

    #[test]
    fn test_record_absorb_dedupes_relations() {
        let mut a = PersonRecord::new("A").with_relation(RelationKind::Partner, "B");
        let b = PersonRecord::new("A")
            .with_name("Max", "Bauer")
            .with_relation(RelationKind::Partner, "B")
            .with_relation(RelationKind::Father, "F");
        a.absorb(b);
        assert_eq!(a.relations.len(), 2);
        assert_eq!(a.forename.as_deref(), Some("Max"));
    }

    #[test]
    fn test_display_name_falls_back_to_id() {
        let p = Person::new("CFIB00001");
        assert_eq!(p.display_name(), "CFIB00001");

        let mut q = Person::new("CFIB00002");
        q.surname = Some("Gruber".to_string());
        assert_eq!(q.display_name(), "Gruber");
    }
}

//! Generation assignment over the canonical map.

use std::collections::HashSet;

use crate::error::{FamtreeError, Result};
use crate::merge::CanonicalMap;
use crate::model::PersonId;

/// One visited person and its frozen generation (anchor = 0, parents -1,
/// children +1, partners same).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Visit {
    pub id: PersonId,
    pub generation: i32,
}

/// Depth-first walk from `anchor`, returning persons in visit order.
///
/// Per person the neighbours are taken as partners, then mothers, then
/// fathers, then children, each in id order. The first visit fixes a
/// person's generation; later paths never change it.
pub fn assign_generations(map: &CanonicalMap, anchor: &str) -> Result<Vec<Visit>> {
    if !map.contains(anchor) {
        return Err(FamtreeError::PersonNotFound(anchor.to_string()));
    }

    let mut visited: HashSet<PersonId> = HashSet::new();
    let mut stack: Vec<(PersonId, i32)> = vec![(anchor.to_string(), 0)];
    let mut visits = Vec::new();

    while let Some((id, generation)) = stack.pop() {
        if visited.contains(&id) {
            continue;
        }
        let person = match map.get(&id) {
            Some(p) => p,
            None => continue,
        };
        visited.insert(id.clone());

        let next: Vec<(PersonId, i32)> = person
            .partners
            .iter()
            .map(|p| (p.clone(), generation))
            .chain(person.mothers.iter().map(|p| (p.clone(), generation - 1)))
            .chain(person.fathers.iter().map(|p| (p.clone(), generation - 1)))
            .chain(person.children.iter().map(|c| (c.clone(), generation + 1)))
            .filter(|(other, _)| !visited.contains(other))
            .collect();

        visits.push(Visit { id, generation });

        // Pushed in reverse so the first neighbour is popped first
        stack.extend(next.into_iter().rev());
    }

    Ok(visits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::merge_people;
    use crate::model::{Gender, Person};

    fn family() -> CanonicalMap {
        // G -> F (+ partner M) -> C, D ; C partner P
        let mut g = Person::new("G");
        g.gender = Gender::M;
        let mut f = Person::new("F");
        f.gender = Gender::M;
        f.fathers.insert("G".to_string());
        f.partners.insert("M".to_string());
        let mut m = Person::new("M");
        m.gender = Gender::W;
        let mut c = Person::new("C");
        c.mothers.insert("M".to_string());
        c.fathers.insert("F".to_string());
        c.partners.insert("P".to_string());
        let mut d = Person::new("D");
        d.fathers.insert("F".to_string());
        let p = Person::new("P");
        merge_people(vec![&g, &f, &m, &c, &d, &p])
    }

    fn generation(visits: &[Visit], id: &str) -> i32 {
        visits.iter().find(|v| v.id == id).unwrap().generation
    }

    #[test]
    fn test_generations_from_child() {
        let map = family();
        let visits = assign_generations(&map, "C").unwrap();
        assert_eq!(visits.len(), 6);
        assert_eq!(visits[0], Visit { id: "C".to_string(), generation: 0 });
        assert_eq!(generation(&visits, "P"), 0);
        assert_eq!(generation(&visits, "M"), -1);
        assert_eq!(generation(&visits, "F"), -1);
        assert_eq!(generation(&visits, "G"), -2);
        assert_eq!(generation(&visits, "D"), 0);
    }

    #[test]
    fn test_visit_order_partners_then_parents_then_children() {
        let map = family();
        let visits = assign_generations(&map, "F").unwrap();
        let order: Vec<&str> = visits.iter().map(|v| v.id.as_str()).collect();
        // Partner M is walked fully (child C, C's partner P) before father G;
        // D is reached last from F's children.
        assert_eq!(order, vec!["F", "M", "C", "P", "G", "D"]);
    }

    #[test]
    fn test_generation_frozen_on_first_visit() {
        // A's partner B is also recorded as A's mother: B is reached as a
        // partner first and keeps generation 0.
        let mut a = Person::new("A");
        a.partners.insert("B".to_string());
        a.mothers.insert("B".to_string());
        let b = Person::new("B");
        let map = merge_people(vec![&a, &b]);

        let visits = assign_generations(&map, "A").unwrap();
        assert_eq!(generation(&visits, "B"), 0);
        assert_eq!(visits.len(), 2);
    }

    #[test]
    fn test_deterministic_across_runs() {
        let map = family();
        let first = assign_generations(&map, "D").unwrap();
        for _ in 0..5 {
            assert_eq!(assign_generations(&map, "D").unwrap(), first);
        }
    }

    #[test]
    fn test_unknown_anchor() {
        let map = family();
        assert!(matches!(
            assign_generations(&map, "Z"),
            Err(FamtreeError::PersonNotFound(_))
        ));
    }
}

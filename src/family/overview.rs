//! Whole-population views: the flat relationships table, the full edge
//! list, and the combined family-tree payload.

use std::collections::{BTreeMap, HashSet};

use chrono::Datelike;
use serde::Serialize;

use super::generations::{classify, Generation};
use super::houses::{all_houses, HouseView};
use super::statistics::{aggregate, FamilyStatistics};
use super::{parent_edges, FamilyRelationship, RelationshipKind};
use crate::error::Result;
use crate::people::{Gender, Person, PersonId, PersonRepository};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelationshipRow {
    pub id: PersonId,
    pub name: String,
    pub gender: Gender,
    pub birth_year: Option<i32>,
    pub death_year: Option<i32>,
    pub father: Option<String>,
    pub mother: Option<String>,
    pub house: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableSummary {
    pub total_people: usize,
    pub total_houses: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelationshipsTable {
    pub relationships_table: Vec<RelationshipRow>,
    pub houses: BTreeMap<String, Vec<RelationshipRow>>,
    pub summary: TableSummary,
}

impl RelationshipsTable {
    /// Tabulate `people` in the given order, resolving parent names through `repo`.
    fn from_people<R: PersonRepository + ?Sized>(repo: &R, people: &[Person]) -> Self {
        let rows: Vec<RelationshipRow> = people.iter().map(|p| row(repo, p)).collect();

        let mut houses: BTreeMap<String, Vec<RelationshipRow>> = BTreeMap::new();
        for r in &rows {
            houses.entry(r.house.clone()).or_default().push(r.clone());
        }

        Self {
            summary: TableSummary {
                total_people: rows.len(),
                total_houses: houses.len(),
            },
            relationships_table: rows,
            houses,
        }
    }
}

/// Every person as a table row, also grouped by house. Only the population
/// scan is fatal; an unresolvable parent leaves its column null.
pub fn relationships_table<R: PersonRepository + ?Sized>(repo: &R) -> Result<RelationshipsTable> {
    let people = repo.all()?;
    Ok(RelationshipsTable::from_people(repo, &people))
}

fn row<R: PersonRepository + ?Sized>(repo: &R, person: &Person) -> RelationshipRow {
    RelationshipRow {
        id: person.id,
        name: person.full_name(),
        gender: person.gender,
        birth_year: person.birth_date.map(|d| d.year()),
        death_year: person.death_date.map(|d| d.year()),
        father: person.father_id.and_then(|id| name_of(repo, id)),
        mother: person.mother_id.and_then(|id| name_of(repo, id)),
        house: person.last_name.clone(),
    }
}

fn name_of<R: PersonRepository + ?Sized>(repo: &R, id: PersonId) -> Option<String> {
    match repo.get(id) {
        Ok(p) => Some(p.full_name()),
        Err(e) => {
            log::debug!("Parent {} not resolvable for relationships table: {}", id, e);
            None
        }
    }
}

/// Both directions of every parent link whose parent is still present.
///
/// Edges are emitted per person in storage order, father link before mother link.
pub fn population_edges<R: PersonRepository + ?Sized>(repo: &R) -> Result<Vec<FamilyRelationship>> {
    let people = repo.all()?;
    let present: HashSet<PersonId> = people.iter().map(|p| p.id).collect();

    let mut edges = Vec::new();
    for person in &people {
        let links = [
            (person.father_id, RelationshipKind::Father),
            (person.mother_id, RelationshipKind::Mother),
        ];
        for (parent_id, kind) in links {
            match parent_id {
                Some(parent_id) if present.contains(&parent_id) => {
                    edges.extend(parent_edges(person.id, parent_id, kind));
                }
                Some(parent_id) => {
                    log::debug!("Dangling parent {} on person {}, no edge", parent_id, person.id);
                }
                None => {}
            }
        }
    }
    Ok(edges)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComprehensiveFamilyTree {
    pub houses: Vec<HouseView>,
    pub relationships: Vec<FamilyRelationship>,
    pub generations: Vec<Generation>,
    pub statistics: FamilyStatistics,
}

/// Houses, edges, generations and statistics in one payload.
pub fn comprehensive<R: PersonRepository + ?Sized>(
    repo: &R,
    generation_depth: usize,
) -> Result<ComprehensiveFamilyTree> {
    Ok(ComprehensiveFamilyTree {
        houses: all_houses(repo)?,
        relationships: population_edges(repo)?,
        generations: classify(repo, generation_depth)?,
        statistics: aggregate(repo, generation_depth)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::family::testing::FlakyRepository;
    use crate::people::testing::{date, person, with_gender};
    use crate::people::PersonGraph;

    fn lannisters() -> Vec<Person> {
        let mut tywin = with_gender(person(1, "Tywin", "Lannister", None, None), Gender::Male);
        tywin.birth_date = Some(date(1950, 1, 1));
        tywin.death_date = Some(date(2010, 1, 1));
        vec![
            tywin,
            with_gender(person(2, "Joanna", "Lannister", None, None), Gender::Female),
            person(3, "Jaime", "Lannister", Some(1), Some(2)),
            person(4, "Joffrey", "Baratheon", Some(3), Some(77)),
        ]
    }

    #[test]
    fn test_relationships_table() {
        let table = relationships_table(&PersonGraph::new(lannisters())).unwrap();
        assert_eq!(table.summary.total_people, 4);
        assert_eq!(table.summary.total_houses, 2);

        let tywin = &table.relationships_table[0];
        assert_eq!(tywin.name, "Tywin Lannister");
        assert_eq!(tywin.birth_year, Some(1950));
        assert_eq!(tywin.death_year, Some(2010));
        assert_eq!(tywin.father, None);

        let jaime = &table.relationships_table[2];
        assert_eq!(jaime.father.as_deref(), Some("Tywin Lannister"));
        assert_eq!(jaime.mother.as_deref(), Some("Joanna Lannister"));

        // mother 77 does not exist
        let joffrey = &table.relationships_table[3];
        assert_eq!(joffrey.father.as_deref(), Some("Jaime Lannister"));
        assert_eq!(joffrey.mother, None);

        assert_eq!(table.houses["Lannister"].len(), 3);
        assert_eq!(table.houses["Baratheon"][0].id, 4);
    }

    #[test]
    fn test_table_json_shape() {
        let table = relationships_table(&PersonGraph::new(lannisters())).unwrap();
        let json = serde_json::to_value(&table).unwrap();
        assert!(json["relationships_table"][0]["mother"].is_null());
        assert_eq!(json["summary"]["total_houses"], 2);
        assert_eq!(json["houses"]["Baratheon"][0]["house"], "Baratheon");
    }

    #[test]
    fn test_population_edges_skip_dangling_parents() {
        let edges = population_edges(&PersonGraph::new(lannisters())).unwrap();
        // Jaime: father + mother, Joffrey: father only
        assert_eq!(edges.len(), 6);
        assert_eq!(
            edges[0],
            FamilyRelationship {
                person_id: 3,
                related_to_id: 1,
                relationship: RelationshipKind::Child,
            }
        );
        assert_eq!(edges[1].relationship, RelationshipKind::Father);
        assert_eq!(edges[3].relationship, RelationshipKind::Mother);
        assert!(edges.iter().all(|e| e.person_id != 77 && e.related_to_id != 77));
    }

    #[test]
    fn test_comprehensive() {
        let tree = comprehensive(&PersonGraph::new(lannisters()), 3).unwrap();
        assert_eq!(tree.houses.len(), 2);
        assert_eq!(tree.relationships.len(), 6);
        assert_eq!(tree.generations.len(), 3);
        assert_eq!(tree.statistics.total_people, 4);
        assert_eq!(tree.statistics.generations, tree.generations.len());
    }

    #[test]
    fn test_scan_failures_are_fatal() {
        let mut repo = FlakyRepository::new(lannisters());
        repo.failing_gets.insert(1);
        let table = relationships_table(&repo).unwrap();
        assert_eq!(table.relationships_table[2].father, None);

        repo.fail_scans = true;
        assert!(relationships_table(&repo).is_err());
        assert!(population_edges(&repo).is_err());
        assert!(comprehensive(&repo, 3).is_err());
    }
}

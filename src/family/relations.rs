//! Everyone directly related to one person.

use std::collections::HashSet;

use serde::Serialize;

use super::{parent_edges, FamilyRelationship, RelationshipKind};
use crate::error::Result;
use crate::people::{Person, PersonId, PersonRepository};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PersonWithRelationships {
    pub person: Person,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub father: Option<Person>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mother: Option<Person>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spouse: Option<Person>,
    pub children: Vec<Person>,
    pub siblings: Vec<Person>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub grandparents: Vec<Person>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub grandchildren: Vec<Person>,
    #[serde(rename = "all_relationships")]
    pub relationships: Vec<FamilyRelationship>,
}

/// Resolve parents, children, siblings, grandparents, grandchildren, spouse
/// and the flattened edges around `person_id`.
///
/// Only the person itself must resolve; every other piece is looked up
/// independently and left out if its lookup fails or the reference dangles.
pub fn resolve_all<R: PersonRepository + ?Sized>(
    repo: &R,
    person_id: PersonId,
) -> Result<PersonWithRelationships> {
    let person = repo.get(person_id)?;

    let father = lookup(repo, person.father_id, "father");
    let mother = lookup(repo, person.mother_id, "mother");
    let children = repo.find_by_parent(person.id).unwrap_or_else(|e| {
        log::debug!("Omitting children of person {}: {}", person.id, e);
        Vec::new()
    });

    let siblings = siblings(repo, &person);
    let grandparents = grandparents(repo, [father.as_ref(), mother.as_ref()]);
    let grandchildren = grandchildren(repo, &children);
    let spouse = spouse(repo, &person, &children);
    let relationships = edges(&person, father.as_ref(), mother.as_ref(), &children);

    Ok(PersonWithRelationships {
        person,
        father,
        mother,
        spouse,
        children,
        siblings,
        grandparents,
        grandchildren,
        relationships,
    })
}

fn lookup<R: PersonRepository + ?Sized>(repo: &R, id: Option<PersonId>, role: &str) -> Option<Person> {
    let id = id?;
    match repo.get(id) {
        Ok(person) => Some(person),
        Err(e) if e.is_not_found() => {
            log::debug!("Omitting {} {}: dangling reference", role, id);
            None
        }
        Err(e) => {
            log::debug!("Omitting {} {}: {}", role, id, e);
            None
        }
    }
}

/// Half siblings on either side count; a full sibling is listed once.
fn siblings<R: PersonRepository + ?Sized>(repo: &R, person: &Person) -> Vec<Person> {
    let sides: [(Option<PersonId>, fn(&Person) -> Option<PersonId>); 2] = [
        (person.father_id, |p| p.father_id),
        (person.mother_id, |p| p.mother_id),
    ];

    let mut seen = HashSet::new();
    let mut siblings = Vec::new();
    for (parent_id, column) in sides {
        let Some(parent_id) = parent_id else { continue };
        match repo.find_by_parent(parent_id) {
            Ok(candidates) => {
                for candidate in candidates {
                    if candidate.id != person.id
                        && column(&candidate) == Some(parent_id)
                        && seen.insert(candidate.id)
                    {
                        siblings.push(candidate);
                    }
                }
            }
            Err(e) => log::debug!("Omitting siblings via parent {}: {}", parent_id, e),
        }
    }
    siblings
}

/// Paternal grandfather, paternal grandmother, maternal grandfather, maternal
/// grandmother; missing links are skipped.
fn grandparents<R: PersonRepository + ?Sized>(repo: &R, parents: [Option<&Person>; 2]) -> Vec<Person> {
    parents
        .into_iter()
        .flatten()
        .flat_map(|parent| [parent.father_id, parent.mother_id])
        .filter_map(|id| lookup(repo, id, "grandparent"))
        .collect()
}

/// Deduplicated by id: a grandchild reachable through two children appears once.
fn grandchildren<R: PersonRepository + ?Sized>(repo: &R, children: &[Person]) -> Vec<Person> {
    let mut seen = HashSet::new();
    let mut grandchildren = Vec::new();
    for child in children {
        match repo.find_by_parent(child.id) {
            Ok(found) => grandchildren.extend(found.into_iter().filter(|g| seen.insert(g.id))),
            Err(e) => log::debug!("Omitting grandchildren via child {}: {}", child.id, e),
        }
    }
    grandchildren
}

/// First resolvable co-parent of any of the person's children.
fn spouse<R: PersonRepository + ?Sized>(repo: &R, person: &Person, children: &[Person]) -> Option<Person> {
    let mut tried = HashSet::new();
    children
        .iter()
        .filter_map(|child| {
            let other = if child.father_id == Some(person.id) {
                child.mother_id
            } else {
                child.father_id
            };
            other.filter(|&id| id != person.id)
        })
        .filter(|&id| tried.insert(id))
        .find_map(|id| lookup(repo, Some(id), "spouse"))
}

fn edges(
    person: &Person,
    father: Option<&Person>,
    mother: Option<&Person>,
    children: &[Person],
) -> Vec<FamilyRelationship> {
    let mut edges = Vec::new();
    if let Some(father) = father {
        edges.extend(parent_edges(person.id, father.id, RelationshipKind::Father));
    }
    if let Some(mother) = mother {
        edges.extend(parent_edges(person.id, mother.id, RelationshipKind::Mother));
    }
    for child in children {
        let kind = if child.father_id == Some(person.id) {
            RelationshipKind::Father
        } else {
            RelationshipKind::Mother
        };
        edges.extend(parent_edges(child.id, person.id, kind));
    }
    edges
}

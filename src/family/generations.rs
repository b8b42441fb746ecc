//! Generation bucketing from founders downward.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::error::Result;
use crate::people::{Person, PersonId, PersonRepository};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Generation {
    /// 1 = founders.
    pub level: usize,
    pub name: String,
    pub people: Vec<Person>,
}

const ORDINALS: [&str; 9] = [
    "Second", "Third", "Fourth", "Fifth", "Sixth", "Seventh", "Eighth", "Ninth", "Tenth",
];

pub fn generation_label(level: usize) -> String {
    match level {
        1 => "Founders".to_string(),
        2..=10 => format!("{} Generation", ORDINALS[level - 2]),
        _ => format!("Generation {}", level),
    }
}

/// Bucket the population into at most `depth` generations.
///
/// Level 1 holds the founders; level n holds the children of every level
/// n-1 member, each person listed once per level. Empty levels end the walk.
/// The founder scan is fatal on failure; a failed child lookup for one member
/// only drops that member's children.
pub fn classify<R: PersonRepository + ?Sized>(repo: &R, depth: usize) -> Result<Vec<Generation>> {
    let mut generations = Vec::new();
    let mut current: Vec<Person> = repo.all()?.into_iter().filter(Person::is_founder).collect();

    for level in 1..=depth {
        if current.is_empty() {
            break;
        }
        let next = if level < depth {
            children_of_all(repo, &current)
        } else {
            Vec::new()
        };
        generations.push(Generation {
            level,
            name: generation_label(level),
            people: std::mem::replace(&mut current, next),
        });
    }

    Ok(generations)
}

fn children_of_all<R: PersonRepository + ?Sized>(repo: &R, parents: &[Person]) -> Vec<Person> {
    let mut seen = HashSet::new();
    let mut children = Vec::new();
    for parent in parents {
        match repo.find_by_parent(parent.id) {
            Ok(found) => children.extend(found.into_iter().filter(|c| seen.insert(c.id))),
            Err(e) => log::debug!("Omitting children of person {} from generations: {}", parent.id, e),
        }
    }
    children
}

/// Lowest level each classified person appears at.
pub fn lowest_levels(generations: &[Generation]) -> HashMap<PersonId, usize> {
    let mut levels = HashMap::new();
    for generation in generations {
        for person in &generation.people {
            levels.entry(person.id).or_insert(generation.level);
        }
    }
    levels
}

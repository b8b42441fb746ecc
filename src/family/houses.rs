//! Surname-keyed house views.

use chrono::Datelike;
use serde::Serialize;

use super::generations::{classify, lowest_levels};
use crate::error::Result;
use crate::people::{Gender, Person, PersonId, PersonRepository};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HouseView {
    pub name: String,
    pub description: String,
    pub members: Vec<Person>,
}

impl HouseView {
    fn new(surname: &str, members: Vec<Person>) -> Self {
        Self {
            name: house_label(surname),
            description: format!("Members of the {} family", surname),
            members,
        }
    }
}

fn house_label(surname: &str) -> String {
    format!("House {}", surname)
}

/// Members with an exact last-name match. Unknown surnames give an empty house.
pub fn by_house<R: PersonRepository + ?Sized>(repo: &R, surname: &str) -> Result<HouseView> {
    let members = repo.find_by_surname(surname)?;
    Ok(HouseView::new(surname, members))
}

/// Every house, by surname. A house whose members cannot be listed is left out;
/// failing to list the surnames themselves is fatal.
pub fn all_houses<R: PersonRepository + ?Sized>(repo: &R) -> Result<Vec<HouseView>> {
    let surnames = repo.distinct_surnames()?;
    let mut houses = Vec::with_capacity(surnames.len());
    for surname in surnames {
        match by_house(repo, &surname) {
            Ok(house) => houses.push(house),
            Err(e) => log::debug!("Skipping house {}: {}", surname, e),
        }
    }
    Ok(houses)
}

/// One line of a [`HouseSummary`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HouseMember {
    pub id: PersonId,
    pub name: String,
    pub gender: Gender,
    pub birth_year: Option<i32>,
    pub death_year: Option<i32>,
    /// Lowest generation level, or `None` past the classified depth.
    pub generation: Option<usize>,
    pub parents: Vec<String>,
    pub children: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HouseSummary {
    pub house_name: String,
    pub patriarch: Option<HouseMember>,
    pub matriarch: Option<HouseMember>,
    pub members: Vec<HouseMember>,
    pub total_members: usize,
}

/// House members annotated with their generation and the names of their
/// parents and children. The patriarch and matriarch are the first founder
/// members of each gender.
pub fn house_summary<R: PersonRepository + ?Sized>(
    repo: &R,
    surname: &str,
    generation_depth: usize,
) -> Result<HouseSummary> {
    let people = repo.find_by_surname(surname)?;
    let levels = lowest_levels(&classify(repo, generation_depth)?);

    let mut patriarch = None;
    let mut matriarch = None;
    let mut members = Vec::with_capacity(people.len());

    for person in &people {
        let member = HouseMember {
            id: person.id,
            name: person.full_name(),
            gender: person.gender,
            birth_year: person.birth_date.map(|d| d.year()),
            death_year: person.death_date.map(|d| d.year()),
            generation: levels.get(&person.id).copied(),
            parents: parent_names(repo, person),
            children: child_names(repo, person.id),
        };

        if person.is_founder() {
            match person.gender {
                Gender::Male if patriarch.is_none() => patriarch = Some(member.clone()),
                Gender::Female if matriarch.is_none() => matriarch = Some(member.clone()),
                _ => {}
            }
        }
        members.push(member);
    }

    Ok(HouseSummary {
        house_name: house_label(surname),
        patriarch,
        matriarch,
        total_members: members.len(),
        members,
    })
}

fn parent_names<R: PersonRepository + ?Sized>(repo: &R, person: &Person) -> Vec<String> {
    [person.father_id, person.mother_id]
        .into_iter()
        .flatten()
        .filter_map(|id| match repo.get(id) {
            Ok(parent) => Some(parent.full_name()),
            Err(e) => {
                log::debug!("Parent {} of person {} unresolved: {}", id, person.id, e);
                None
            }
        })
        .collect()
}

fn child_names<R: PersonRepository + ?Sized>(repo: &R, person_id: PersonId) -> Vec<String> {
    match repo.find_by_parent(person_id) {
        Ok(children) => children.iter().map(Person::full_name).collect(),
        Err(e) => {
            log::debug!("Children of person {} unresolved: {}", person_id, e);
            Vec::new()
        }
    }
}

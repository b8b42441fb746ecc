//! In-memory population snapshot indexed by id and by parent id.

use std::collections::{BTreeSet, HashMap};

use super::{Person, PersonFilter, PersonId, PersonRepository};
use crate::error::{FamtreeError, Result};

/// Immutable snapshot of the live population.
///
/// Built once per request from [`PersonRepository::all`] so that
/// population-wide views (generations, statistics, houses) answer
/// `find_by_parent` from a prebuilt adjacency list instead of one query per
/// person. Children lists keep storage order.
#[derive(Debug, Clone, Default)]
pub struct PersonGraph {
    people: Vec<Person>,
    by_id: HashMap<PersonId, usize>,
    children: HashMap<PersonId, Vec<usize>>,
}

impl PersonGraph {
    pub fn new(people: Vec<Person>) -> Self {
        let mut by_id = HashMap::with_capacity(people.len());
        let mut children: HashMap<PersonId, Vec<usize>> = HashMap::new();

        for (idx, person) in people.iter().enumerate() {
            by_id.insert(person.id, idx);
            if let Some(father) = person.father_id {
                children.entry(father).or_default().push(idx);
            }
            if let Some(mother) = person.mother_id {
                if person.father_id != Some(mother) {
                    children.entry(mother).or_default().push(idx);
                }
            }
        }

        Self { people, by_id, children }
    }

    /// Snapshot everything `repo` currently holds.
    pub fn load<R: PersonRepository + ?Sized>(repo: &R) -> Result<Self> {
        let people = repo.all()?;
        log::debug!("Loaded population snapshot of {} people", people.len());
        Ok(Self::new(people))
    }

    /// Borrowing lookup; `None` for unknown or dangling ids.
    pub fn person(&self, id: PersonId) -> Option<&Person> {
        self.by_id.get(&id).map(|&idx| &self.people[idx])
    }
}

impl PersonRepository for PersonGraph {
    fn get(&self, id: PersonId) -> Result<Person> {
        self.person(id).cloned().ok_or(FamtreeError::PersonNotFound(id))
    }

    fn find_by_parent(&self, parent_id: PersonId) -> Result<Vec<Person>> {
        Ok(self
            .children
            .get(&parent_id)
            .map(|idxs| idxs.iter().map(|&idx| self.people[idx].clone()).collect())
            .unwrap_or_default())
    }

    fn find_by_surname(&self, surname: &str) -> Result<Vec<Person>> {
        Ok(self
            .people
            .iter()
            .filter(|p| p.last_name == surname)
            .cloned()
            .collect())
    }

    fn all(&self) -> Result<Vec<Person>> {
        Ok(self.people.clone())
    }

    fn distinct_surnames(&self) -> Result<Vec<String>> {
        let names: BTreeSet<&str> = self.people.iter().map(|p| p.last_name.as_str()).collect();
        Ok(names.into_iter().map(String::from).collect())
    }

    fn count_where(&self, filter: PersonFilter) -> Result<usize> {
        Ok(self.people.iter().filter(|p| filter.matches(p)).count())
    }
}

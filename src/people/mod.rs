//! Person records: the data model, the repository contract the family engine
//! reads through, and the SQLite store that writes them.
//!
//! Father and mother ids are weak references. Nothing enforces that they
//! resolve, and deleting a person never rewrites the rows that point at it.

mod graph;
pub mod import;
mod repository;
pub mod store;

pub use graph::PersonGraph;
pub use repository::{PersonRepository, SqliteRepository};
pub(crate) use repository::{person_from_row, PERSON_COLUMNS};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{FamtreeError, Result};

/// Row id of a person in the `people` table.
pub type PersonId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    /// Absent or unrecognised values.
    #[default]
    #[serde(other)]
    Unknown,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Unknown => "unknown",
        }
    }

    /// Map a stored label to a gender; anything but male/female is `Unknown`.
    pub fn from_label(label: Option<&str>) -> Self {
        match label.map(|l| l.trim().to_ascii_lowercase()).as_deref() {
            Some("male") => Gender::Male,
            Some("female") => Gender::Female,
            _ => Gender::Unknown,
        }
    }

    /// Column value written to the database (`NULL` for unknown).
    pub(crate) fn to_column(self) -> Option<&'static str> {
        match self {
            Gender::Unknown => None,
            known => Some(known.as_str()),
        }
    }
}

/// A person as stored, minus soft-delete bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    pub id: PersonId,
    pub first_name: String,
    pub last_name: String,
    pub gender: Gender,
    pub birth_date: Option<NaiveDate>,
    pub death_date: Option<NaiveDate>,
    pub photo_url: Option<String>,
    pub biography: String,
    pub father_id: Option<PersonId>,
    pub mother_id: Option<PersonId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Person {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// No known father and no known mother.
    pub fn is_founder(&self) -> bool {
        self.father_id.is_none() && self.mother_id.is_none()
    }

    pub fn is_deceased(&self) -> bool {
        self.death_date.is_some()
    }
}

/// Request body for creating or replacing a person.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersonInput {
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub gender: Gender,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
    #[serde(default)]
    pub death_date: Option<NaiveDate>,
    #[serde(default)]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub biography: String,
    #[serde(default)]
    pub father_id: Option<PersonId>,
    #[serde(default)]
    pub mother_id: Option<PersonId>,
}

impl PersonInput {
    pub fn new(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.first_name.trim().is_empty() {
            return Err(FamtreeError::InvalidInput("first_name is required".to_string()));
        }
        if self.last_name.trim().is_empty() {
            return Err(FamtreeError::InvalidInput("last_name is required".to_string()));
        }
        if let (Some(father), Some(mother)) = (self.father_id, self.mother_id) {
            if father == mother {
                return Err(FamtreeError::InvalidInput(
                    "father_id and mother_id must reference different people".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Predicates supported by [`PersonRepository::count_where`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersonFilter {
    All,
    /// No death date recorded.
    Living,
    Deceased,
    Founders,
    Gender(Gender),
}

impl PersonFilter {
    pub fn matches(&self, person: &Person) -> bool {
        match self {
            PersonFilter::All => true,
            PersonFilter::Living => !person.is_deceased(),
            PersonFilter::Deceased => person.is_deceased(),
            PersonFilter::Founders => person.is_founder(),
            PersonFilter::Gender(gender) => person.gender == *gender,
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// In-memory person with fixed timestamps.
    pub fn person(
        id: PersonId,
        first_name: &str,
        last_name: &str,
        father_id: Option<PersonId>,
        mother_id: Option<PersonId>,
    ) -> Person {
        let stamp = DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap();
        Person {
            id,
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            gender: Gender::Unknown,
            birth_date: None,
            death_date: None,
            photo_url: None,
            biography: String::new(),
            father_id,
            mother_id,
            created_at: stamp,
            updated_at: stamp,
        }
    }

    pub fn with_gender(mut person: Person, gender: Gender) -> Person {
        person.gender = gender;
        person
    }

    pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }
}

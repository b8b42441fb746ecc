use serde::{Deserialize, Serialize};

use crate::family::RelationshipsTable;
use crate::people::Person;

/// Success envelope: every 2xx body is `{"data": ...}`
#[derive(Debug, Clone, Serialize)]
pub struct DataResponse<T> {
    pub data: T,
}

/// Error envelope
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// `?format=` on person listings
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub format: Option<String>,
}

impl ListQuery {
    pub fn wants_table(&self) -> bool {
        self.format.as_deref() == Some("relationships-table")
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub format: Option<String>,
}

impl SearchQuery {
    pub fn wants_table(&self) -> bool {
        self.format.as_deref() == Some("relationships-table")
    }
}

/// Person listing in either of its two renderings
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum PeopleListing {
    People(Vec<Person>),
    Table(RelationshipsTable),
}

use thiserror::Error;

use crate::people::PersonId;

/// Main error type for famtree
#[derive(Error, Debug)]
pub enum FamtreeError {
    /// Storage failures (query errors, unavailable database file)
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// File system I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A migration script failed; its transaction was rolled back
    #[error("Migration {name} failed: {source}")]
    Migration {
        name: String,
        #[source]
        source: rusqlite::Error,
    },

    /// Migrations directory holds a misnamed or conflicting file
    #[error("Invalid migration file: {0}")]
    MigrationFile(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Person id does not resolve to a live record
    #[error("Person not found: {0}")]
    PersonNotFound(PersonId),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// JSON encoding/decoding errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A blocking database task panicked or was cancelled
    #[error("Task error: {0}")]
    Task(String),
}

impl FamtreeError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, FamtreeError::PersonNotFound(_))
    }
}

/// Convenient Result type using FamtreeError
pub type Result<T> = std::result::Result<T, FamtreeError>;

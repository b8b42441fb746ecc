pub mod config;
pub mod error;
pub mod db;
pub mod people;
pub mod family;
pub mod api;

pub use config::Config;
pub use error::{FamtreeError, Result};
pub use people::{Person, PersonId, PersonRepository};

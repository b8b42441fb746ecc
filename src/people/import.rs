//! Bulk load of people from a JSON array whose parent links are file-local keys.
//!
//! ```json
//! [
//!   {"key": "rickard", "first_name": "Rickard", "last_name": "Stark", "gender": "male"},
//!   {"key": "ned", "first_name": "Eddard", "last_name": "Stark", "father": "rickard"}
//! ]
//! ```
//!
//! Records are inserted in file order, so a parent key must name an earlier record.

use std::collections::HashMap;

use chrono::NaiveDate;
use rusqlite::Connection;
use serde::Deserialize;

use super::{store, Gender, PersonId, PersonInput};
use crate::error::{FamtreeError, Result};

#[derive(Debug, Clone, Deserialize)]
pub struct ImportRecord {
    pub key: String,
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
    /// Key of the father's record
    #[serde(default)]
    pub father: Option<String>,
    /// Key of the mother's record
    #[serde(default)]
    pub mother: Option<String>,
}

impl ImportRecord {
    fn to_input(&self, ids: &HashMap<&str, PersonId>) -> PersonInput {
        PersonInput {
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            gender: self.gender,
            birth_date: self.birth_date,
            death_date: self.death_date,
            photo_url: self.photo_url.clone(),
            biography: self.biography.clone(),
            father_id: self.father.as_deref().and_then(|k| ids.get(k).copied()),
            mother_id: self.mother.as_deref().and_then(|k| ids.get(k).copied()),
        }
    }
}

pub fn parse_records(json: &str) -> Result<Vec<ImportRecord>> {
    Ok(serde_json::from_str(json)?)
}

/// Check every record without touching the database: keys are non-blank and
/// unique, names are present, and each parent key names an earlier record.
pub fn validate_records(records: &[ImportRecord]) -> Result<()> {
    let mut seen: HashMap<&str, usize> = HashMap::new();

    for (idx, record) in records.iter().enumerate() {
        let at = |msg: String| FamtreeError::InvalidInput(format!("record {} ({}): {}", idx + 1, record.key, msg));

        if record.key.trim().is_empty() {
            return Err(at("key must not be blank".to_string()));
        }
        for (role, parent) in [("father", &record.father), ("mother", &record.mother)] {
            if let Some(parent) = parent {
                if !seen.contains_key(parent.as_str()) {
                    return Err(at(format!("{} '{}' is not an earlier record", role, parent)));
                }
            }
        }
        if record.father.is_some() && record.father == record.mother {
            return Err(at("father and mother must be different records".to_string()));
        }
        PersonInput::new(&record.first_name, &record.last_name)
            .validate()
            .map_err(|e| at(e.to_string()))?;

        if seen.insert(record.key.as_str(), idx).is_some() {
            return Err(at("duplicate key".to_string()));
        }
    }
    Ok(())
}

/// Validate, then insert all records in one transaction. Returns each key
/// with the id it was stored under, in file order.
pub fn import_people(conn: &mut Connection, records: &[ImportRecord]) -> Result<Vec<(String, PersonId)>> {
    validate_records(records)?;

    let tx = conn.transaction()?;
    let mut ids: HashMap<&str, PersonId> = HashMap::with_capacity(records.len());
    let mut inserted = Vec::with_capacity(records.len());

    for record in records {
        let person = store::create_person(&tx, &record.to_input(&ids))?;
        ids.insert(record.key.as_str(), person.id);
        inserted.push((record.key.clone(), person.id));
    }

    tx.commit()?;
    log::info!("Imported {} people", inserted.len());
    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{migrate, Db};
    use crate::people::{PersonRepository, SqliteRepository};
    use std::path::PathBuf;
    use tempfile::TempDir;

    const STARKS: &str = r#"[
        {"key": "rickard", "first_name": "Rickard", "last_name": "Stark", "gender": "male"},
        {"key": "lyarra", "first_name": "Lyarra", "last_name": "Stark", "gender": "female"},
        {"key": "ned", "first_name": "Eddard", "last_name": "Stark", "birth_date": "1963-01-01",
         "father": "rickard", "mother": "lyarra"}
    ]"#;

    fn migrated_db() -> (TempDir, Db) {
        let temp_dir = TempDir::new().unwrap();
        let db = Db::new(temp_dir.path().join("import.db"));
        let mut conn = db.open_connection().unwrap();
        let migrations_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("migrations");
        migrate::run_migrations(&mut conn, &migrations_dir).unwrap();
        (temp_dir, db)
    }

    #[test]
    fn test_import_resolves_parent_keys() {
        let (_dir, db) = migrated_db();
        let mut conn = db.open_connection().unwrap();
        let records = parse_records(STARKS).unwrap();

        let inserted = import_people(&mut conn, &records).unwrap();
        assert_eq!(inserted.len(), 3);
        assert_eq!(inserted[2].0, "ned");

        let repo = SqliteRepository::new(&conn);
        let ned = repo.get(inserted[2].1).unwrap();
        assert_eq!(ned.father_id, Some(inserted[0].1));
        assert_eq!(ned.mother_id, Some(inserted[1].1));
        assert_eq!(ned.birth_date, NaiveDate::from_ymd_opt(1963, 1, 1));
    }

    #[test]
    fn test_forward_reference_rejected() {
        let records = parse_records(
            r#"[
                {"key": "kid", "first_name": "Kid", "last_name": "Doe", "father": "dad"},
                {"key": "dad", "first_name": "Dad", "last_name": "Doe"}
            ]"#,
        )
        .unwrap();
        let err = validate_records(&records).unwrap_err();
        assert!(err.to_string().contains("not an earlier record"));
    }

    #[test]
    fn test_duplicate_and_blank_keys_rejected() {
        let dup = parse_records(
            r#"[
                {"key": "a", "first_name": "A", "last_name": "Doe"},
                {"key": "a", "first_name": "B", "last_name": "Doe"}
            ]"#,
        )
        .unwrap();
        assert!(validate_records(&dup).unwrap_err().to_string().contains("duplicate key"));

        let blank = parse_records(r#"[{"key": " ", "first_name": "A", "last_name": "Doe"}]"#).unwrap();
        assert!(validate_records(&blank).is_err());

        let no_name = parse_records(r#"[{"key": "x", "first_name": "", "last_name": "Doe"}]"#).unwrap();
        assert!(validate_records(&no_name).is_err());
    }

    #[test]
    fn test_invalid_file_inserts_nothing() {
        let (_dir, db) = migrated_db();
        let mut conn = db.open_connection().unwrap();
        let records = parse_records(
            r#"[
                {"key": "ok", "first_name": "Fine", "last_name": "Doe"},
                {"key": "bad", "first_name": "Bad", "last_name": "Doe", "mother": "ghost"}
            ]"#,
        )
        .unwrap();

        assert!(import_people(&mut conn, &records).is_err());
        assert!(SqliteRepository::new(&conn).all().unwrap().is_empty());
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(parse_records("{not json"), Err(FamtreeError::Json(_))));
    }
}

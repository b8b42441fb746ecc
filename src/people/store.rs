//! Single-row writes and listings over the `people` table.

use chrono::Utc;
use rusqlite::{params, Connection};

use super::{person_from_row, Person, PersonId, PersonInput, PersonRepository, SqliteRepository, PERSON_COLUMNS};
use crate::error::{FamtreeError, Result};

/// Insert a new person and return the stored record
pub fn create_person(conn: &Connection, input: &PersonInput) -> Result<Person> {
    input.validate()?;
    let now = Utc::now();

    conn.execute(
        r#"
        INSERT INTO people (
            first_name, last_name, gender, birth_date, death_date,
            photo_url, biography, father_id, mother_id, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)
        "#,
        params![
            input.first_name.trim(),
            input.last_name.trim(),
            input.gender.to_column(),
            input.birth_date,
            input.death_date,
            input.photo_url,
            input.biography,
            input.father_id,
            input.mother_id,
            now,
        ],
    )?;

    let id = conn.last_insert_rowid();
    log::debug!("Created person {} ({} {})", id, input.first_name, input.last_name);
    SqliteRepository::new(conn).get(id)
}

/// Replace every mutable field of a live person
pub fn update_person(conn: &Connection, id: PersonId, input: &PersonInput) -> Result<Person> {
    input.validate()?;
    if input.father_id == Some(id) || input.mother_id == Some(id) {
        return Err(FamtreeError::InvalidInput(format!(
            "person {} cannot be their own parent",
            id
        )));
    }

    let updated = conn.execute(
        r#"
        UPDATE people SET
            first_name = ?2, last_name = ?3, gender = ?4, birth_date = ?5,
            death_date = ?6, photo_url = ?7, biography = ?8, father_id = ?9,
            mother_id = ?10, updated_at = ?11
        WHERE id = ?1 AND deleted_at IS NULL
        "#,
        params![
            id,
            input.first_name.trim(),
            input.last_name.trim(),
            input.gender.to_column(),
            input.birth_date,
            input.death_date,
            input.photo_url,
            input.biography,
            input.father_id,
            input.mother_id,
            Utc::now(),
        ],
    )?;

    if updated == 0 {
        return Err(FamtreeError::PersonNotFound(id));
    }
    SqliteRepository::new(conn).get(id)
}

/// Soft-delete a person. Rows referencing it as father or mother are left as is.
pub fn delete_person(conn: &Connection, id: PersonId) -> Result<()> {
    let now = Utc::now();
    let deleted = conn.execute(
        "UPDATE people SET deleted_at = ?2, updated_at = ?2 WHERE id = ?1 AND deleted_at IS NULL",
        params![id, now],
    )?;

    if deleted == 0 {
        return Err(FamtreeError::PersonNotFound(id));
    }
    log::info!("Deleted person {}", id);
    Ok(())
}

pub fn list_people(conn: &Connection) -> Result<Vec<Person>> {
    SqliteRepository::new(conn).all()
}

/// Case-insensitive substring match on first or last name
pub fn search_people(conn: &Connection, query: &str) -> Result<Vec<Person>> {
    let query = query.trim();
    if query.is_empty() {
        return Err(FamtreeError::InvalidInput(
            "Query parameter 'q' is required".to_string(),
        ));
    }

    let escaped = query
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    let pattern = format!("%{}%", escaped);

    let sql = format!(
        "SELECT {} FROM people \
         WHERE deleted_at IS NULL \
           AND (first_name LIKE ?1 ESCAPE '\\' OR last_name LIKE ?1 ESCAPE '\\') \
         ORDER BY id",
        PERSON_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let people = stmt
        .query_map(params![pattern], person_from_row)?
        .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;
    Ok(people)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrate;
    use crate::people::testing::date;
    use crate::people::Gender;
    use std::path::Path;
    use tempfile::TempDir;

    fn setup_conn() -> (Connection, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let mut conn = Connection::open(temp_dir.path().join("test.db")).unwrap();
        let migrations_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations");
        migrate::run_migrations(&mut conn, &migrations_dir).unwrap();
        (conn, temp_dir)
    }

    #[test]
    fn test_create_round_trips_all_fields() {
        let (conn, _temp) = setup_conn();
        let mut input = PersonInput::new(" Lyanna ", "Stark");
        input.gender = Gender::Female;
        input.birth_date = Some(date(266, 3, 1));
        input.death_date = Some(date(283, 6, 1));
        input.photo_url = Some("https://example.org/lyanna.png".to_string());
        input.biography = "Winter rose".to_string();

        let person = create_person(&conn, &input).unwrap();
        assert_eq!(person.first_name, "Lyanna");
        assert_eq!(person.gender, Gender::Female);
        assert_eq!(person.birth_date, Some(date(266, 3, 1)));
        assert_eq!(person.death_date, Some(date(283, 6, 1)));
        assert_eq!(person.photo_url.as_deref(), Some("https://example.org/lyanna.png"));
        assert_eq!(person.biography, "Winter rose");
        assert_eq!(person.created_at, person.updated_at);
    }

    #[test]
    fn test_create_rejects_blank_names() {
        let (conn, _temp) = setup_conn();
        let result = create_person(&conn, &PersonInput::new("", "Stark"));
        assert!(matches!(result, Err(FamtreeError::InvalidInput(_))));
        assert!(list_people(&conn).unwrap().is_empty());
    }

    #[test]
    fn test_update_replaces_fields() {
        let (conn, _temp) = setup_conn();
        let ned = create_person(&conn, &PersonInput::new("Eddard", "Stark")).unwrap();
        let jon = create_person(&conn, &PersonInput::new("Jon", "Snow")).unwrap();

        let mut replacement = PersonInput::new("Jon", "Targaryen");
        replacement.father_id = Some(ned.id);
        let updated = update_person(&conn, jon.id, &replacement).unwrap();
        assert_eq!(updated.last_name, "Targaryen");
        assert_eq!(updated.father_id, Some(ned.id));
        assert!(updated.updated_at >= jon.updated_at);
    }

    #[test]
    fn test_update_errors() {
        let (conn, _temp) = setup_conn();
        let ned = create_person(&conn, &PersonInput::new("Eddard", "Stark")).unwrap();

        let missing = update_person(&conn, 999, &PersonInput::new("No", "One"));
        assert!(matches!(missing, Err(FamtreeError::PersonNotFound(999))));

        let mut own_father = PersonInput::new("Eddard", "Stark");
        own_father.father_id = Some(ned.id);
        let result = update_person(&conn, ned.id, &own_father);
        assert!(matches!(result, Err(FamtreeError::InvalidInput(_))));
    }

    #[test]
    fn test_delete_is_soft_and_single_shot() {
        let (conn, _temp) = setup_conn();
        let ned = create_person(&conn, &PersonInput::new("Eddard", "Stark")).unwrap();

        delete_person(&conn, ned.id).unwrap();
        assert!(matches!(delete_person(&conn, ned.id), Err(FamtreeError::PersonNotFound(_))));

        let raw: i64 = conn
            .query_row("SELECT COUNT(*) FROM people WHERE id = ?1", params![ned.id], |row| row.get(0))
            .unwrap();
        assert_eq!(raw, 1);
        assert!(list_people(&conn).unwrap().is_empty());
    }

    #[test]
    fn test_search() {
        let (conn, _temp) = setup_conn();
        create_person(&conn, &PersonInput::new("Arya", "Stark")).unwrap();
        create_person(&conn, &PersonInput::new("Sansa", "Stark")).unwrap();
        create_person(&conn, &PersonInput::new("Starkey", "Mallister")).unwrap();
        create_person(&conn, &PersonInput::new("Brienne", "Tarth")).unwrap();

        assert_eq!(search_people(&conn, "stark").unwrap().len(), 3);
        assert_eq!(search_people(&conn, "ARYA").unwrap().len(), 1);
        assert!(search_people(&conn, "100%").unwrap().is_empty());
        assert!(matches!(search_people(&conn, "  "), Err(FamtreeError::InvalidInput(_))));
    }
}

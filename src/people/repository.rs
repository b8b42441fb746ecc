//! Read contract over the person store and its SQLite implementation.

use rusqlite::{params, Connection, OptionalExtension, Params, Row};

use super::{Gender, Person, PersonFilter, PersonId};
use crate::error::{FamtreeError, Result};

/// Column list matching [`person_from_row`].
pub(crate) const PERSON_COLUMNS: &str = "id, first_name, last_name, gender, birth_date, death_date, \
     photo_url, biography, father_id, mother_id, created_at, updated_at";

/// Lookups the family engine needs. Every call may fail; soft-deleted people
/// are never returned.
pub trait PersonRepository {
    /// Fails with [`FamtreeError::PersonNotFound`] when the id does not resolve.
    fn get(&self, id: PersonId) -> Result<Person>;

    /// Everyone whose father or mother is `parent_id`, in storage order.
    fn find_by_parent(&self, parent_id: PersonId) -> Result<Vec<Person>>;

    /// Exact last-name match.
    fn find_by_surname(&self, surname: &str) -> Result<Vec<Person>>;

    fn all(&self) -> Result<Vec<Person>>;

    /// Sorted, unique last names.
    fn distinct_surnames(&self) -> Result<Vec<String>>;

    fn count_where(&self, filter: PersonFilter) -> Result<usize>;
}

pub(crate) fn person_from_row(row: &Row<'_>) -> rusqlite::Result<Person> {
    let gender: Option<String> = row.get(3)?;
    Ok(Person {
        id: row.get(0)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        gender: Gender::from_label(gender.as_deref()),
        birth_date: row.get(4)?,
        death_date: row.get(5)?,
        photo_url: row.get(6)?,
        biography: row.get(7)?,
        father_id: row.get(8)?,
        mother_id: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

/// Repository backed by a live SQLite connection.
pub struct SqliteRepository<'c> {
    conn: &'c Connection,
}

impl<'c> SqliteRepository<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    pub fn connection(&self) -> &'c Connection {
        self.conn
    }

    fn query_people<P: Params>(&self, filter_sql: &str, params: P) -> Result<Vec<Person>> {
        let sql = format!(
            "SELECT {} FROM people WHERE deleted_at IS NULL AND ({}) ORDER BY id",
            PERSON_COLUMNS, filter_sql
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let people = stmt
            .query_map(params, person_from_row)?
            .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;
        Ok(people)
    }
}

impl PersonRepository for SqliteRepository<'_> {
    fn get(&self, id: PersonId) -> Result<Person> {
        let sql = format!(
            "SELECT {} FROM people WHERE id = ?1 AND deleted_at IS NULL",
            PERSON_COLUMNS
        );
        self.conn
            .query_row(&sql, params![id], person_from_row)
            .optional()?
            .ok_or(FamtreeError::PersonNotFound(id))
    }

    fn find_by_parent(&self, parent_id: PersonId) -> Result<Vec<Person>> {
        self.query_people("father_id = ?1 OR mother_id = ?1", params![parent_id])
    }

    fn find_by_surname(&self, surname: &str) -> Result<Vec<Person>> {
        self.query_people("last_name = ?1", params![surname])
    }

    fn all(&self) -> Result<Vec<Person>> {
        self.query_people("1 = 1", [])
    }

    fn distinct_surnames(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT last_name FROM people WHERE deleted_at IS NULL ORDER BY last_name",
        )?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;
        Ok(names)
    }

    fn count_where(&self, filter: PersonFilter) -> Result<usize> {
        let clause = match filter {
            PersonFilter::All => "1 = 1",
            PersonFilter::Living => "death_date IS NULL",
            PersonFilter::Deceased => "death_date IS NOT NULL",
            PersonFilter::Founders => "father_id IS NULL AND mother_id IS NULL",
            PersonFilter::Gender(Gender::Male) => "LOWER(TRIM(gender)) = 'male'",
            PersonFilter::Gender(Gender::Female) => "LOWER(TRIM(gender)) = 'female'",
            PersonFilter::Gender(Gender::Unknown) => {
                "gender IS NULL OR LOWER(TRIM(gender)) NOT IN ('male', 'female')"
            }
        };
        let sql = format!(
            "SELECT COUNT(*) FROM people WHERE deleted_at IS NULL AND ({})",
            clause
        );
        let count: i64 = self.conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrate;
    use crate::people::store::{create_person, delete_person};
    use crate::people::testing::date;
    use crate::people::PersonInput;
    use std::path::Path;
    use tempfile::TempDir;

    fn setup_conn() -> (Connection, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let mut conn = Connection::open(temp_dir.path().join("test.db")).unwrap();
        let migrations_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations");
        migrate::run_migrations(&mut conn, &migrations_dir).unwrap();
        (conn, temp_dir)
    }

    fn add(conn: &Connection, first: &str, last: &str, father: Option<PersonId>, mother: Option<PersonId>) -> Person {
        let mut input = PersonInput::new(first, last);
        input.father_id = father;
        input.mother_id = mother;
        create_person(conn, &input).unwrap()
    }

    #[test]
    fn test_get_and_not_found() {
        let (conn, _temp) = setup_conn();
        let ned = add(&conn, "Eddard", "Stark", None, None);
        let repo = SqliteRepository::new(&conn);

        assert_eq!(repo.get(ned.id).unwrap().first_name, "Eddard");
        assert!(matches!(repo.get(999), Err(FamtreeError::PersonNotFound(999))));
    }

    #[test]
    fn test_find_by_parent_matches_either_column_in_id_order() {
        let (conn, _temp) = setup_conn();
        let ned = add(&conn, "Eddard", "Stark", None, None);
        let cat = add(&conn, "Catelyn", "Tully", None, None);
        let robb = add(&conn, "Robb", "Stark", Some(ned.id), Some(cat.id));
        let jon = add(&conn, "Jon", "Snow", Some(ned.id), None);
        let _other = add(&conn, "Edmure", "Tully", None, None);
        let repo = SqliteRepository::new(&conn);

        let ids: Vec<_> = repo.find_by_parent(ned.id).unwrap().iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![robb.id, jon.id]);
        let ids: Vec<_> = repo.find_by_parent(cat.id).unwrap().iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![robb.id]);
        assert!(repo.find_by_parent(robb.id).unwrap().is_empty());
    }

    #[test]
    fn test_surnames_and_counts() {
        let (conn, _temp) = setup_conn();
        let mut ned = PersonInput::new("Eddard", "Stark");
        ned.gender = Gender::Male;
        ned.death_date = Some(date(298, 1, 1));
        let ned = create_person(&conn, &ned).unwrap();
        let mut cat = PersonInput::new("Catelyn", "Tully");
        cat.gender = Gender::Female;
        create_person(&conn, &cat).unwrap();
        add(&conn, "Hodor", "Stark", None, None);
        add(&conn, "Robb", "Stark", Some(ned.id), None);
        // Raw label outside the known set
        conn.execute(
            "INSERT INTO people (first_name, last_name, gender, biography, created_at, updated_at) \
             VALUES ('Ghost', 'Stark', 'direwolf', '', '2024-01-01 00:00:00+00:00', '2024-01-01 00:00:00+00:00')",
            [],
        ).unwrap();
        let repo = SqliteRepository::new(&conn);

        assert_eq!(repo.distinct_surnames().unwrap(), vec!["Stark".to_string(), "Tully".to_string()]);
        assert_eq!(repo.find_by_surname("Stark").unwrap().len(), 4);
        assert_eq!(repo.find_by_surname("stark").unwrap().len(), 0);
        assert_eq!(repo.count_where(PersonFilter::All).unwrap(), 5);
        assert_eq!(repo.count_where(PersonFilter::Deceased).unwrap(), 1);
        assert_eq!(repo.count_where(PersonFilter::Living).unwrap(), 4);
        assert_eq!(repo.count_where(PersonFilter::Founders).unwrap(), 4);
        assert_eq!(repo.count_where(PersonFilter::Gender(Gender::Male)).unwrap(), 1);
        assert_eq!(repo.count_where(PersonFilter::Gender(Gender::Female)).unwrap(), 1);
        assert_eq!(repo.count_where(PersonFilter::Gender(Gender::Unknown)).unwrap(), 3);
        let ghost = repo.find_by_surname("Stark").unwrap().pop().unwrap();
        assert_eq!(ghost.gender, Gender::Unknown);
    }

    #[test]
    fn test_soft_deleted_rows_are_invisible() {
        let (conn, _temp) = setup_conn();
        let ned = add(&conn, "Eddard", "Stark", None, None);
        let robb = add(&conn, "Robb", "Stark", Some(ned.id), None);
        delete_person(&conn, ned.id).unwrap();
        let repo = SqliteRepository::new(&conn);

        assert!(repo.get(ned.id).unwrap_err().is_not_found());
        assert_eq!(repo.all().unwrap().len(), 1);
        assert_eq!(repo.count_where(PersonFilter::All).unwrap(), 1);
        // The child's reference is left dangling
        assert_eq!(repo.get(robb.id).unwrap().father_id, Some(ned.id));
        assert_eq!(repo.find_by_parent(ned.id).unwrap().len(), 1);
    }
}

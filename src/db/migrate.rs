//! Forward-only schema migrations.
//!
//! Files in the migrations directory are named `NNN_description.sql`. The
//! numeric prefix is the version and the primary key of `schema_migrations`;
//! renaming the description of an applied file does not re-run it.

use rusqlite::{Connection, params};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use crate::error::{Result, FamtreeError};

struct Migration {
    version: u32,
    name: String,
    sql: String,
}

fn ensure_migrations_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
        )",
    )?;
    Ok(())
}

/// Applied migrations as `version -> name`, lowest version first.
pub fn applied_versions(conn: &Connection) -> Result<BTreeMap<u32, String>> {
    let mut stmt = conn.prepare("SELECT version, name FROM schema_migrations")?;
    let applied = stmt
        .query_map([], |row| Ok((row.get::<_, u32>(0)?, row.get::<_, String>(1)?)))?
        .collect::<std::result::Result<BTreeMap<_, _>, rusqlite::Error>>()?;
    Ok(applied)
}

/// Split `001_people.sql` into `(1, "001_people")`.
fn parse_file_name(file_name: &str) -> Result<(u32, String)> {
    let invalid = || FamtreeError::MigrationFile(format!("{} (expected NNN_description.sql)", file_name));

    let stem = file_name.strip_suffix(".sql").ok_or_else(invalid)?;
    let (prefix, description) = stem.split_once('_').ok_or_else(invalid)?;
    if description.is_empty() || !prefix.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    let version = prefix.parse().map_err(|_| invalid())?;
    Ok((version, stem.to_string()))
}

/// Read every `.sql` file in `migrations_dir`, ordered by version.
fn load_migrations(migrations_dir: &Path) -> Result<Vec<Migration>> {
    let mut by_version: BTreeMap<u32, Migration> = BTreeMap::new();

    for entry in fs::read_dir(migrations_dir)? {
        let path = entry?.path();
        if path.extension().and_then(|s| s.to_str()) != Some("sql") {
            continue;
        }
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| FamtreeError::MigrationFile(path.display().to_string()))?;

        let (version, name) = parse_file_name(file_name)?;
        if let Some(existing) = by_version.get(&version) {
            return Err(FamtreeError::MigrationFile(format!(
                "{} and {} share version {}",
                existing.name, name, version
            )));
        }

        let sql = fs::read_to_string(&path)?;
        by_version.insert(version, Migration { version, name, sql });
    }

    Ok(by_version.into_values().collect())
}

/// Apply every migration whose version is not recorded yet, each in its own
/// transaction. A failing migration rolls back and stops the run.
pub fn run_migrations(conn: &mut Connection, migrations_dir: &Path) -> Result<()> {
    ensure_migrations_table(conn)?;

    let applied = applied_versions(conn)?;
    let migrations = load_migrations(migrations_dir)?;

    if let (Some(&newest_applied), Some(newest_known)) =
        (applied.keys().next_back(), migrations.last())
    {
        if newest_applied > newest_known.version {
            log::warn!(
                "Database is at schema version {}, newer than the latest migration file ({})",
                newest_applied,
                newest_known.version
            );
        }
    }

    let mut pending = 0;
    for migration in migrations {
        if let Some(recorded) = applied.get(&migration.version) {
            if *recorded != migration.name {
                log::warn!(
                    "Migration {} was applied as {}, file is now {}",
                    migration.version,
                    recorded,
                    migration.name
                );
            }
            continue;
        }

        log::info!("Applying migration {}", migration.name);

        let tx = conn.transaction()?;
        tx.execute_batch(&migration.sql)
            .map_err(|source| FamtreeError::Migration {
                name: migration.name.clone(),
                source,
            })?;
        tx.execute(
            "INSERT INTO schema_migrations (version, name) VALUES (?1, ?2)",
            params![migration.version, migration.name],
        )?;
        tx.commit()?;
        pending += 1;
    }

    if pending == 0 {
        log::debug!("Schema is up to date");
    } else {
        log::info!("Applied {} migration(s)", pending);
    }
    Ok(())
}

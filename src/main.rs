use famtree::api::HttpServer;
use famtree::db::{migrate, Db};
use famtree::error::FamtreeError;
use famtree::Config;
use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;

    // RUST_LOG wins over famtree.log_level
    env_logger::Builder::from_env(
        env_logger::Env::default()
            .filter_or("RUST_LOG", &config.famtree.log_level)
    ).init();

    // Parse command-line arguments
    let args: Vec<String> = std::env::args().collect();
    let command = args.get(1).map(|s| s.as_str()).unwrap_or("verify");

    match command {
        "serve" => {
            run_http_server(config).await?;
        }
        "verify" => {
            run_schema_verification(config).await?;
        }
        other => {
            log::warn!("Unknown command '{}', running verify", other);
            run_schema_verification(config).await?;
        }
    }

    Ok(())
}

/// Bring the database schema up to date
async fn open_database(config: &Config) -> Result<Db> {
    let db = Db::new(config.db_path());
    log::info!("Database path: {}", db.path().display());

    let migrations_dir = config.migrations_dir().to_path_buf();
    db.with_connection(move |conn| {
        migrate::run_migrations(conn, &migrations_dir)
    }).await?;

    log::info!("Database initialized successfully");
    Ok(db)
}

/// Run the HTTP API server
async fn run_http_server(config: Config) -> Result<()> {
    log::info!("Starting famtree HTTP server v{}", env!("CARGO_PKG_VERSION"));

    let db = open_database(&config).await?;
    log::info!(
        "Traversal bounds: max_tree_depth={}, max_tree_nodes={}, generation_depth={}",
        config.traversal.max_tree_depth,
        config.traversal.max_tree_nodes,
        config.traversal.generation_depth
    );

    let server = HttpServer::new(db, config.traversal, config.http_server);
    server.run().await?;

    Ok(())
}

/// Run database schema verification
async fn run_schema_verification(config: Config) -> Result<()> {
    log::info!("Starting famtree v{}", env!("CARGO_PKG_VERSION"));

    let db = open_database(&config).await?;
    verify_database_schema(&db).await?;

    Ok(())
}

/// Verify that all expected database objects exist
async fn verify_database_schema(db: &Db) -> Result<()> {
    db.with_connection(|conn| {
        // Check tables
        let mut stmt = conn.prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")?;
        let tables: Vec<String> = stmt.query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;

        for table in ["people", "schema_migrations"] {
            if !tables.iter().any(|t| t == table) {
                return Err(FamtreeError::Config(format!("Missing table: {}", table)));
            }
            log::debug!("✓ Table exists: {}", table);
        }

        let applied = migrate::applied_versions(conn)?;
        match applied.keys().next_back() {
            Some(version) => log::debug!("✓ Schema version {} ({} migrations)", version, applied.len()),
            None => return Err(FamtreeError::Config("No migrations recorded".to_string())),
        }

        // Parent lookups depend on these
        let mut stmt = conn.prepare("SELECT name FROM sqlite_master WHERE type='index' AND name LIKE 'idx_people_%' ORDER BY name")?;
        let indexes: Vec<String> = stmt.query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;

        for index_name in ["idx_people_father_id", "idx_people_mother_id"] {
            if indexes.iter().any(|i| i == index_name) {
                log::debug!("✓ Index exists: {}", index_name);
            } else {
                return Err(FamtreeError::Config(format!("Missing index: {}", index_name)));
            }
        }
        if !indexes.iter().any(|i| i == "idx_people_last_name") {
            log::warn!("Index idx_people_last_name not found, house lookups will scan");
        }

        // Check pragmas
        let journal_mode: String = conn.query_row("PRAGMA journal_mode", [], |row| row.get(0))?;
        if journal_mode.to_uppercase() != "WAL" {
            return Err(FamtreeError::Config(format!("Journal mode is not WAL: {}", journal_mode)));
        }
        log::debug!("✓ Journal mode: WAL");

        let foreign_keys: i32 = conn.query_row("PRAGMA foreign_keys", [], |row| row.get(0))?;
        if foreign_keys != 1 {
            return Err(FamtreeError::Config("Foreign keys not enabled".to_string()));
        }
        log::debug!("✓ Foreign keys enabled");

        let integrity: String = conn.query_row("PRAGMA integrity_check", [], |row| row.get(0))?;
        if integrity != "ok" {
            return Err(FamtreeError::Config(format!("Database integrity check failed: {}", integrity)));
        }
        log::info!("✓ Database integrity: OK");

        let people: i64 = conn.query_row(
            "SELECT COUNT(*) FROM people WHERE deleted_at IS NULL",
            [],
            |row| row.get(0),
        )?;
        log::info!("{} people on record", people);

        Ok(())
    }).await?;

    log::info!("✓ Database schema verification complete");
    Ok(())
}

use clap::Parser;
use famtree::Config;
use famtree::db::{Db, migrate};
use famtree::people::import::{import_people, parse_records, validate_records};
use std::path::PathBuf;
use std::time::Instant;
use anyhow::{Context, Result};

#[derive(Parser, Debug)]
#[command(name = "import")]
#[command(about = "Import people from a JSON file into the famtree database")]
struct Args {
    /// JSON array of people; parents are referenced by the `key` of an earlier record
    file: PathBuf,

    /// Validate the file without writing anything
    #[arg(short = 'n', long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logger
    env_logger::Builder::from_env(
        env_logger::Env::default()
            .filter_or("RUST_LOG", "info")
    ).init();

    let args = Args::parse();

    log::info!("Reading {}", args.file.display());
    let json = std::fs::read_to_string(&args.file)
        .with_context(|| format!("Failed to read import file: {}", args.file.display()))?;
    let records = parse_records(&json)
        .with_context(|| format!("Failed to parse import file: {}", args.file.display()))?;
    log::info!("Found {} records", records.len());

    if args.dry_run {
        validate_records(&records)?;
        log::info!("Dry run: {} records are valid, nothing written", records.len());
        return Ok(());
    }

    let config = Config::load()?;
    let db = Db::new(config.db_path());
    log::info!("Database path: {}", db.path().display());

    let migrations_dir = config.migrations_dir().to_path_buf();
    db.with_connection(move |conn| {
        migrate::run_migrations(conn, &migrations_dir)
    }).await?;

    let start = Instant::now();
    let inserted = db.with_connection(move |conn| import_people(conn, &records)).await?;

    for (key, id) in &inserted {
        log::debug!("✓ {} -> person {}", key, id);
    }

    log::info!("=== Import Complete ===");
    log::info!("People inserted: {}", inserted.len());
    log::info!("Time: {:?}", start.elapsed());

    Ok(())
}

use famtree::{config::Config, db::Db, error::FamtreeError};
use famtree::family::{self, FamilyStatistics, Generation, HouseView};
use famtree::people::{PersonGraph, SqliteRepository};
use anyhow::Result;

/// Share of `part` in `total` as a whole percentage
fn percent(part: usize, total: usize) -> usize {
    if total == 0 {
        return 0;
    }
    part * 100 / total
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::load()?;
    let db = Db::new(config.db_path());
    let depth = config.traversal.generation_depth;

    // One snapshot serves all three views
    let (stats, generations, houses) = db.with_connection(move |conn| {
        let graph = PersonGraph::load(&SqliteRepository::new(conn))?;
        let stats = family::aggregate(&graph, depth)?;
        let generations = family::classify(&graph, depth)?;
        let houses = family::all_houses(&graph)?;
        Ok::<(FamilyStatistics, Vec<Generation>, Vec<HouseView>), FamtreeError>((stats, generations, houses))
    }).await?;

    println!("\n=== famtree Population Statistics ===\n");

    if stats.total_people == 0 {
        println!("No people on record.");
        println!("\nAdd people through the API or the import binary.");
        return Ok(());
    }

    println!("{:-<50}", "");
    println!("{:<30} {:>10} {:>8}", "Metric", "Count", "Share");
    println!("{:-<50}", "");
    println!("{:<30} {:>10} {:>7}%", "People", stats.total_people, 100);
    println!(
        "{:<30} {:>10} {:>7}%",
        "Living", stats.living_members, percent(stats.living_members, stats.total_people)
    );
    println!(
        "{:<30} {:>10} {:>7}%",
        "Deceased", stats.deceased_members, percent(stats.deceased_members, stats.total_people)
    );
    for (gender, count) in &stats.gender_count {
        println!(
            "{:<30} {:>10} {:>7}%",
            gender, count, percent(*count, stats.total_people)
        );
    }
    println!("{:<30} {:>10}", "Houses", stats.total_houses);
    println!("{:<30} {:>10}", "Generations", stats.generations);
    println!("{:-<50}", "");

    println!("\nAge Distribution (living, known birth date):\n");
    println!("{:-<30}", "");
    println!("{:<15} {:>10}", "Bracket", "Count");
    println!("{:-<30}", "");
    for (bracket, count) in &stats.age_distribution {
        println!("{:<15} {:>10}", bracket, count);
    }
    println!("{:-<30}", "");

    println!("\nGenerations (depth {}):\n", depth);
    println!("{:-<50}", "");
    println!("{:<8} {:<30} {:>10}", "Level", "Name", "People");
    println!("{:-<50}", "");
    for generation in &generations {
        println!(
            "{:<8} {:<30} {:>10}",
            generation.level, generation.name, generation.people.len()
        );
    }
    println!("{:-<50}", "");

    println!("\nHouses:\n");
    println!("{:-<50}", "");
    println!("{:<38} {:>10}", "House", "Members");
    println!("{:-<50}", "");
    for house in &houses {
        println!("{:<38} {:>10}", house.name, house.members.len());
    }
    println!("{:-<50}", "");

    println!();

    Ok(())
}

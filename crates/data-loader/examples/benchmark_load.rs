use data_loader::{DataIndex, RatingScale};
use std::path::Path;
use std::time::Instant;

fn main() -> data_loader::Result<()> {
    let data_dir = Path::new("data/ml-latest-small");

    println!("Loading ratings from {:?}...\n", data_dir);

    let start = Instant::now();
    let index = DataIndex::load_from_dir(data_dir, RatingScale::default())?;
    let elapsed = start.elapsed();

    let (users, movies, ratings) = index.counts();

    println!("=== Load Complete ===");
    println!("Time taken: {:?}", elapsed);
    println!("Users: {}", users);
    println!("Movies: {}", movies);
    println!("Ratings: {}", ratings);
    println!("Dropped rows: {}", index.ingest_report().total_dropped());
    println!(
        "\nPerformance: {:.0} ratings/second",
        ratings as f64 / elapsed.as_secs_f64()
    );
    Ok(())
}

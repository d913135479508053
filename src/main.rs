use anyhow::{bail, Result};
use std::env;
use std::path::PathBuf;

use station_lineage::{
    load_name_changes_dir, load_results_dir, run_batch, BatchError, PersistenceSink, SqliteSink,
};

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    let results_dir = args
        .get(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("input"));
    let changes_dir = args
        .get(2)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("data/nameChanges"));

    let db_path = match env::var("STATION_DB") {
        Ok(path) => PathBuf::from(path),
        Err(_) => bail!("Missing STATION_DB environment variable"),
    };

    println!("📻 Station Lineage - quarterly survey ingest");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    // 1. Load survey results
    println!("\n📂 Loading survey results from {}...", results_dir.display());
    let results = load_results_dir(&results_dir)?;
    println!("✓ Loaded {} results", results.len());

    // 2. Load name changes
    println!("\n📂 Loading name changes from {}...", changes_dir.display());
    let changes = load_name_changes_dir(&changes_dir)?;
    println!("✓ Loaded {} name changes", changes.len());

    // 3. Validate + reconcile behind the all-or-nothing gate
    let batch = match run_batch(results, changes) {
        Ok(batch) => batch,
        Err(BatchError::Rejected(errors)) => {
            eprintln!("\n❌ Name change errors - skipping DB updates");
            for error in &errors {
                eprintln!("   {}", error);
            }
            std::process::exit(1);
        }
        Err(error @ BatchError::Consistency(_)) => return Err(error.into()),
    };
    println!("\n✓ Verified name changes");
    println!("✓ Reconciled {} stations", batch.stations.len());

    // 4. Persist
    println!("\n💾 Writing to {}...", db_path.display());
    let mut sink = SqliteSink::open(&db_path)?;
    let summary = sink.store(&batch)?;

    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!(
        "🎉 Done: {} stations, {} results, {} name changes",
        summary.stations, summary.results, summary.name_changes
    );

    Ok(())
}

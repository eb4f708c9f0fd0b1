use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Instant;

use grammy_reconcile::models::RunStats;
use grammy_reconcile::progress::{create_spinner, set_log_only};
use grammy_reconcile::{dedup, extract, matching, safety, star, warehouse};

#[derive(Parser)]
#[command(name = "grammy-reconcile")]
#[command(about = "Reconcile a streaming catalog with the Grammy ledger into a star-schema warehouse")]
struct Args {
    /// Staging database holding the raw_spotify and raw_grammy tables
    staging: PathBuf,

    /// Warehouse database to (re)create; filename must contain "warehouse"
    warehouse: PathBuf,

    /// Rayon worker threads (0 = default)
    #[arg(long, default_value = "0")]
    workers: usize,

    /// Skip persisting the merged_tracks contract table
    #[arg(long)]
    no_merged_table: bool,

    /// Write run statistics to this JSON file
    #[arg(long)]
    stats_json: Option<PathBuf>,

    /// Hide progress bars for tail-friendly output
    #[arg(long)]
    log_only: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    set_log_only(args.log_only);

    if args.workers > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(args.workers)
            .build_global()
            .context("Failed to set thread pool size")?;
    }

    // The loader drops and recreates the target; make sure it is not the
    // staging database before anything destructive happens.
    safety::validate_output_path(&args.warehouse, "warehouse", &[&args.staging])?;

    let start = Instant::now();
    let mut stats = RunStats::default();

    println!("Opening staging database: {:?}", args.staging);
    let staging_conn = extract::open_staging(&args.staging)?;

    let catalog = extract::read_catalog(&staging_conn, &mut stats)?;
    let nominations = extract::read_nominations(&staging_conn, &mut stats)?;
    drop(staging_conn);

    let spinner = create_spinner("Phase 2: Deduplicating by track id");
    let catalog = dedup::dedupe_by_id(catalog);
    stats.catalog_after_id_dedup = catalog.len();
    spinner.finish_with_message(format!(
        "Phase 2: {} tracks after id dedup",
        catalog.len()
    ));

    let spinner = create_spinner("Phase 2: Deduplicating by title + artist");
    let catalog = dedup::dedupe_by_title_artist(catalog);
    stats.catalog_after_title_artist_dedup = catalog.len();
    spinner.finish_with_message(format!(
        "Phase 2: {} tracks after title+artist dedup",
        catalog.len()
    ));

    let spinner = create_spinner("Phase 3: Matching nominations");
    let merged = matching::merge_sources(catalog, nominations);
    stats.merged_rows = merged.len();
    for row in &merged {
        match (&row.catalog, &row.nomination) {
            (Some(_), Some(_)) => stats.joined_pairs += 1,
            (Some(_), None) => stats.catalog_only_rows += 1,
            (None, Some(_)) => stats.nomination_only_rows += 1,
            (None, None) => {}
        }
        if row.is_nominee {
            stats.nominee_rows += 1;
        }
    }
    spinner.finish_with_message(format!(
        "Phase 3: {} merged rows, {} flagged nominees",
        stats.merged_rows, stats.nominee_rows
    ));

    let spinner = create_spinner("Phase 4: Building star schema");
    let flat = star::flatten(&merged);
    let schema = star::build_star(&flat);
    stats.dim_track_rows = schema.tracks.len();
    stats.dim_artist_rows = schema.artists.len();
    stats.dim_album_rows = schema.albums.len();
    stats.dim_genre_rows = schema.genres.len();
    stats.dim_time_rows = schema.times.len();
    stats.dim_grammy_rows = schema.grammys.len();
    stats.fact_exclusions = schema.excluded;
    spinner.finish_with_message(format!(
        "Phase 4: {} fact rows across 6 dimensions",
        schema.facts.len()
    ));
    if schema.excluded > 0 {
        eprintln!(
            "WARNING: {} merged rows failed a dimension join and were excluded from the fact load",
            schema.excluded
        );
    }

    println!("Creating warehouse database: {:?}", args.warehouse);
    let mut warehouse_conn = warehouse::open_warehouse(&args.warehouse)?;
    warehouse::recreate_schema(&warehouse_conn)?;
    if !args.no_merged_table {
        warehouse::write_merged(&mut warehouse_conn, &flat)?;
    }
    stats.fact_rows = warehouse::load_star(&mut warehouse_conn, &schema)?;
    stats.elapsed_seconds = start.elapsed().as_secs_f64();

    println!("\n{:=<60}", "");
    println!("Reconciliation complete!");
    println!("  Merged rows: {}", stats.merged_rows);
    println!(
        "  Nominees flagged: {} ({:.2}%)",
        stats.nominee_rows,
        stats.nominee_rate()
    );
    println!("  Fact rows persisted: {}", stats.fact_rows);
    println!("  Dimension-join exclusions: {}", stats.fact_exclusions);
    println!("  Elapsed: {:.2}s", stats.elapsed_seconds);
    println!("{:=<60}", "");

    stats.log_phase("summary");
    if let Some(path) = args.stats_json {
        stats
            .write_to_file(&path)
            .with_context(|| format!("writing stats to {}", path.display()))?;
    }

    Ok(())
}

//! Re-check a loaded warehouse: dimension uniqueness, fact foreign keys,
//! row counts.
//!
//! Usage: verify-warehouse <grammy-warehouse.sqlite3>
//!
//! The loader already enforces these through SQLite constraints; this
//! binary proves it after the fact, for operational reporting and for
//! catching a warehouse produced by an older build.

use anyhow::{bail, Context, Result};
use rusqlite::Connection;

/// (dimension table, surrogate key column, natural key expression)
const DIMENSIONS: &[(&str, &str, &str)] = &[
    ("dim_track", "track_key", "track_spotify_id"),
    ("dim_artist", "artist_key", "artist_credit"),
    ("dim_album", "album_key", "album_name || '|' || album_others"),
    ("dim_genre", "genre_key", "main_genre || '|' || sub_genre"),
    ("dim_time", "time_key", "year"),
    (
        "dim_grammy",
        "grammy_key",
        "award_title || '|' || category || '|' || nominee || '|' || artist_grammy",
    ),
];

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: verify-warehouse <grammy-warehouse.sqlite3>");
        std::process::exit(1);
    }

    let conn = Connection::open(&args[1])
        .with_context(|| format!("failed to open warehouse {}", args[1]))?;

    let mut violations = 0usize;

    println!("Dimension uniqueness");
    println!("{:-<60}", "");
    for (table, key, natural) in DIMENSIONS {
        let rows: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |r| {
            r.get(0)
        })?;
        let distinct_natural: i64 = conn.query_row(
            &format!("SELECT COUNT(DISTINCT {}) FROM {}", natural, table),
            [],
            |r| r.get(0),
        )?;
        let distinct_keys: i64 = conn.query_row(
            &format!("SELECT COUNT(DISTINCT {}) FROM {}", key, table),
            [],
            |r| r.get(0),
        )?;

        let ok = rows == distinct_natural && rows == distinct_keys;
        if !ok {
            violations += 1;
        }
        println!(
            "  {:<12} {:>8} rows, {:>8} natural keys, {:>8} surrogate keys  [{}]",
            table,
            rows,
            distinct_natural,
            distinct_keys,
            if ok { "ok" } else { "VIOLATION" }
        );
    }

    println!("\nFact foreign keys");
    println!("{:-<60}", "");
    let fact_rows: i64 =
        conn.query_row("SELECT COUNT(*) FROM fact_track_metrics", [], |r| r.get(0))?;
    for (table, key, _) in DIMENSIONS {
        let orphans: i64 = conn.query_row(
            &format!(
                "SELECT COUNT(*) FROM fact_track_metrics f
                 LEFT JOIN {table} d ON d.{key} = f.{key}
                 WHERE d.{key} IS NULL"
            ),
            [],
            |r| r.get(0),
        )?;
        if orphans > 0 {
            violations += 1;
        }
        println!(
            "  {:<12} {:>8} orphaned fact keys  [{}]",
            table,
            orphans,
            if orphans == 0 { "ok" } else { "VIOLATION" }
        );
    }

    let merged_rows: i64 = conn
        .query_row("SELECT COUNT(*) FROM merged_tracks", [], |r| r.get(0))
        .unwrap_or(0);

    println!("\n{:=<60}", "");
    println!("Fact rows: {}", fact_rows);
    if merged_rows > 0 {
        println!("Merged rows: {}", merged_rows);
        println!("Excluded from fact load: {}", merged_rows - fact_rows);
    }
    println!("{:=<60}", "");

    if violations > 0 {
        bail!("{} integrity violations found", violations);
    }
    println!("Warehouse integrity verified.");
    Ok(())
}

//! Staging readers: pull both raw extracts out of the staging database into
//! memory.
//!
//! Raw ingestion (flat file → staging table) belongs to the orchestration
//! layer; this module starts at the `raw_spotify` and `raw_grammy` tables it
//! leaves behind. Malformed rows are recovered locally: a nomination with a
//! blank nominee or artist gets the "not specified" sentinel, a catalog row
//! without an identifier or title cannot be keyed at all and is skipped
//! (counted, not an error).

use anyhow::{Context, Result};
use rusqlite::types::ValueRef;
use rusqlite::Connection;
use std::path::Path;

use crate::genre::map_genre;
use crate::models::{CatalogTrack, NominationRecord, RunStats, NOT_SPECIFIED};
use crate::normalize::normalize_text;
use crate::progress::create_progress_bar;

/// Open the staging database read-optimized, as left by the ingestion step.
pub fn open_staging(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)
        .with_context(|| format!("failed to open staging database {}", path.display()))?;
    conn.execute_batch(
        "PRAGMA mmap_size = 8589934592;
         PRAGMA cache_size = -1000000;
         PRAGMA temp_store = MEMORY;",
    )?;
    Ok(conn)
}

/// Strict two-valued flag coercion: "true"/"1" in any case parse true,
/// anything else (including unparseable text) defaults false.
pub fn parse_flag(raw: &str) -> bool {
    matches!(raw.trim().to_ascii_lowercase().as_str(), "true" | "1")
}

/// Flag column tolerant of the storage types a staging load produces.
fn flag_from_value(value: ValueRef) -> bool {
    match value {
        ValueRef::Integer(i) => i != 0,
        ValueRef::Text(t) => parse_flag(&String::from_utf8_lossy(t)),
        _ => false,
    }
}

fn text_or_sentinel(value: Option<String>, defaulted: &mut usize) -> String {
    let normalized = value.as_deref().map(normalize_text).unwrap_or_default();
    if normalized.is_empty() {
        *defaulted += 1;
        NOT_SPECIFIED.to_string()
    } else {
        normalized
    }
}

/// Read the streaming-catalog extract. Genre mapping is applied here so
/// every in-memory row already carries its main-genre bucket alongside the
/// retained label.
pub fn read_catalog(conn: &Connection, stats: &mut RunStats) -> Result<Vec<CatalogTrack>> {
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM raw_spotify", [], |row| row.get(0))
        .context("counting raw_spotify rows")?;
    let pb = create_progress_bar(count as u64, "Phase 1: Reading catalog");

    let mut stmt = conn.prepare(
        "SELECT track_id, track_name, artists, album_name, popularity, duration_ms,
                explicit, danceability, energy, loudness, speechiness, acousticness,
                instrumentalness, liveness, valence, tempo, track_genre
         FROM raw_spotify",
    )?;

    let mut tracks = Vec::with_capacity(count as usize);
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        pb.inc(1);
        let id: Option<String> = row.get(0)?;
        let title: Option<String> = row.get(1)?;
        let artists: Option<String> = row.get(2)?;
        let (id, title, artists) = match (id, title, artists) {
            (Some(id), Some(title), Some(artists))
                if !id.trim().is_empty() && !title.trim().is_empty() =>
            {
                (id, title, artists)
            }
            _ => {
                // No identifier or no title: the row cannot join anything
                stats.catalog_rows_skipped += 1;
                continue;
            }
        };

        let label: String = row
            .get::<_, Option<String>>(16)?
            .map(|l| l.trim().to_lowercase())
            .unwrap_or_else(|| NOT_SPECIFIED.to_string());

        tracks.push(CatalogTrack {
            id,
            title,
            artist_credit: artists,
            album: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
            album_others: None,
            popularity: row.get::<_, Option<i32>>(4)?.unwrap_or(0),
            duration_ms: row.get::<_, Option<i64>>(5)?.unwrap_or(0),
            explicit: flag_from_value(row.get_ref(6)?),
            danceability: row.get::<_, Option<f64>>(7)?.unwrap_or(0.0),
            energy: row.get::<_, Option<f64>>(8)?.unwrap_or(0.0),
            loudness: row.get::<_, Option<f64>>(9)?.unwrap_or(0.0),
            speechiness: row.get::<_, Option<f64>>(10)?.unwrap_or(0.0),
            acousticness: row.get::<_, Option<f64>>(11)?.unwrap_or(0.0),
            instrumentalness: row.get::<_, Option<f64>>(12)?.unwrap_or(0.0),
            liveness: row.get::<_, Option<f64>>(13)?.unwrap_or(0.0),
            valence: row.get::<_, Option<f64>>(14)?.unwrap_or(0.0),
            tempo: row.get::<_, Option<f64>>(15)?.unwrap_or(0.0),
            main_genre: map_genre(&label),
            sub_genre: Some(label),
        });
    }

    stats.catalog_rows_read = tracks.len();
    pb.finish_with_message(format!(
        "Phase 1: Read {} catalog tracks ({} skipped)",
        tracks.len(),
        stats.catalog_rows_skipped
    ));
    Ok(tracks)
}

/// Read the awards-nomination ledger. All text comes back normalized and
/// non-empty; missing fields become the sentinel rather than an error.
pub fn read_nominations(conn: &Connection, stats: &mut RunStats) -> Result<Vec<NominationRecord>> {
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM raw_grammy", [], |row| row.get(0))
        .context("counting raw_grammy rows")?;
    let pb = create_progress_bar(count as u64, "Phase 1: Reading nominations");

    let mut stmt = conn.prepare("SELECT year, title, category, nominee, artist FROM raw_grammy")?;

    let mut nominations = Vec::with_capacity(count as usize);
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        pb.inc(1);
        let mut defaulted = 0usize;
        nominations.push(NominationRecord {
            year: row.get::<_, Option<i32>>(0)?.unwrap_or(0),
            title: text_or_sentinel(row.get(1)?, &mut defaulted),
            category: text_or_sentinel(row.get(2)?, &mut defaulted),
            nominee: text_or_sentinel(row.get(3)?, &mut defaulted),
            artist_credit: text_or_sentinel(row.get(4)?, &mut defaulted),
        });
        stats.nomination_fields_defaulted += defaulted;
    }

    stats.nomination_rows_read = nominations.len();
    pb.finish_with_message(format!(
        "Phase 1: Read {} nominations ({} fields defaulted)",
        nominations.len(),
        stats.nomination_fields_defaulted
    ));
    Ok(nominations)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn staging_fixture() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE raw_spotify (
                track_id TEXT, track_name TEXT, artists TEXT, album_name TEXT,
                popularity INTEGER, duration_ms INTEGER, explicit TEXT,
                danceability REAL, energy REAL, loudness REAL, speechiness REAL,
                acousticness REAL, instrumentalness REAL, liveness REAL,
                valence REAL, tempo REAL, track_genre TEXT
            );
            CREATE TABLE raw_grammy (
                year INTEGER, title TEXT, category TEXT, nominee TEXT, artist TEXT
            );",
        )
        .unwrap();
        conn
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("true"));
        assert!(parse_flag("True"));
        assert!(parse_flag("1"));
        assert!(!parse_flag("false"));
        assert!(!parse_flag("0"));
        assert!(!parse_flag("maybe"));
        assert!(!parse_flag(""));
    }

    #[test]
    fn test_read_catalog_skips_unkeyed_rows() {
        let conn = staging_fixture();
        conn.execute_batch(
            "INSERT INTO raw_spotify VALUES
                ('t1', 'Shallow', 'Lady Gaga', 'A Star Is Born', 85, 180000, 'True',
                 0.6, 0.4, -6.0, 0.03, 0.4, 0.0, 0.3, 0.3, 96.0, 'pop'),
                (NULL, 'Orphan', 'Nobody', 'X', 10, 1000, '0',
                 0.1, 0.1, -9.0, 0.1, 0.1, 0.0, 0.1, 0.1, 100.0, 'rock');",
        )
        .unwrap();

        let mut stats = RunStats::default();
        let tracks = read_catalog(&conn, &mut stats).unwrap();
        assert_eq!(tracks.len(), 1);
        assert_eq!(stats.catalog_rows_skipped, 1);
        assert_eq!(tracks[0].id, "t1");
        assert!(tracks[0].explicit);
        assert_eq!(tracks[0].main_genre, "pop");
        assert_eq!(tracks[0].sub_genre.as_deref(), Some("pop"));
    }

    #[test]
    fn test_read_nominations_substitutes_sentinel() {
        let conn = staging_fixture();
        conn.execute_batch(
            "INSERT INTO raw_grammy VALUES
                (2019, '61st Annual GRAMMY Awards', 'Record Of The Year', 'Shallow',
                 'Lady Gaga & Bradley Cooper'),
                (1999, '41st Annual GRAMMY Awards', 'Best New Artist', NULL, '');",
        )
        .unwrap();

        let mut stats = RunStats::default();
        let noms = read_nominations(&conn, &mut stats).unwrap();
        assert_eq!(noms.len(), 2);
        assert_eq!(noms[0].nominee, "shallow");
        assert_eq!(noms[0].artist_credit, "lady gaga & bradley cooper");
        assert_eq!(noms[1].nominee, NOT_SPECIFIED);
        assert_eq!(noms[1].artist_credit, NOT_SPECIFIED);
        assert_eq!(stats.nomination_fields_defaulted, 2);
    }
}

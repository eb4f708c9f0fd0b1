//! Warehouse loader: persists the star schema (and the merged-table
//! contract) into a SQLite warehouse under referential-integrity
//! constraints.
//!
//! The target is disposable: every run drops and recreates the relations.
//! Dimensions land before the fact table. A uniqueness or foreign-key
//! rejection is fatal for the run — it means the dedup or join logic
//! produced an inconsistent model, not expected data noise — and the error
//! names the relation that refused the insert.

use anyhow::{Context, Result};
use rusqlite::{params, Connection};
use std::path::Path;

use crate::models::FlatRow;
use crate::progress::create_progress_bar;
use crate::star::StarSchema;

const WRITE_BATCH_SIZE: usize = 10_000;

/// Open (or create) the warehouse database write-optimized, with foreign
/// keys enforced.
pub fn open_warehouse(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)
        .with_context(|| format!("failed to create warehouse database {}", path.display()))?;
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA synchronous = NORMAL;
         PRAGMA cache_size = -64000;
         PRAGMA temp_store = MEMORY;
         PRAGMA foreign_keys = ON;",
    )?;
    Ok(conn)
}

/// Drop-and-recreate the warehouse relations.
pub fn recreate_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "DROP TABLE IF EXISTS fact_track_metrics;
        DROP TABLE IF EXISTS merged_tracks;
        DROP TABLE IF EXISTS dim_track;
        DROP TABLE IF EXISTS dim_artist;
        DROP TABLE IF EXISTS dim_album;
        DROP TABLE IF EXISTS dim_genre;
        DROP TABLE IF EXISTS dim_time;
        DROP TABLE IF EXISTS dim_grammy;

        CREATE TABLE dim_track (
            track_key INTEGER PRIMARY KEY,
            track_spotify_id TEXT NOT NULL UNIQUE,
            track_name TEXT NOT NULL
        );

        CREATE TABLE dim_artist (
            artist_key INTEGER PRIMARY KEY,
            artist_credit TEXT NOT NULL UNIQUE
        );

        CREATE TABLE dim_album (
            album_key INTEGER PRIMARY KEY,
            album_name TEXT NOT NULL,
            album_others TEXT NOT NULL,
            UNIQUE (album_name, album_others)
        );

        CREATE TABLE dim_genre (
            genre_key INTEGER PRIMARY KEY,
            main_genre TEXT NOT NULL,
            sub_genre TEXT NOT NULL,
            UNIQUE (main_genre, sub_genre)
        );

        CREATE TABLE dim_time (
            time_key INTEGER PRIMARY KEY,
            year INTEGER NOT NULL UNIQUE
        );

        CREATE TABLE dim_grammy (
            grammy_key INTEGER PRIMARY KEY,
            award_title TEXT NOT NULL,
            category TEXT NOT NULL,
            nominee TEXT NOT NULL,
            artist_grammy TEXT NOT NULL,
            UNIQUE (award_title, category, nominee, artist_grammy)
        );

        CREATE TABLE merged_tracks (
            track_id TEXT NOT NULL,
            track_name TEXT NOT NULL,
            artist_spotify TEXT NOT NULL,
            album_name TEXT NOT NULL,
            album_others TEXT NOT NULL,
            popularity REAL NOT NULL,
            duration_min REAL NOT NULL,
            explicit INTEGER NOT NULL,
            danceability REAL NOT NULL,
            energy REAL NOT NULL,
            loudness REAL NOT NULL,
            speechiness REAL NOT NULL,
            acousticness REAL NOT NULL,
            instrumentalness REAL NOT NULL,
            liveness REAL NOT NULL,
            valence REAL NOT NULL,
            tempo REAL NOT NULL,
            main_genre TEXT NOT NULL,
            sub_genre TEXT NOT NULL,
            year INTEGER NOT NULL,
            award_title TEXT NOT NULL,
            category TEXT NOT NULL,
            nominee TEXT NOT NULL,
            artist_grammy TEXT NOT NULL,
            grammy_nominee INTEGER NOT NULL
        );

        CREATE TABLE fact_track_metrics (
            fact_id INTEGER PRIMARY KEY,
            track_key INTEGER NOT NULL REFERENCES dim_track(track_key),
            artist_key INTEGER NOT NULL REFERENCES dim_artist(artist_key),
            album_key INTEGER NOT NULL REFERENCES dim_album(album_key),
            genre_key INTEGER NOT NULL REFERENCES dim_genre(genre_key),
            time_key INTEGER NOT NULL REFERENCES dim_time(time_key),
            grammy_key INTEGER NOT NULL REFERENCES dim_grammy(grammy_key),
            popularity REAL NOT NULL,
            duration_min REAL NOT NULL,
            explicit INTEGER NOT NULL,
            danceability REAL NOT NULL,
            energy REAL NOT NULL,
            loudness REAL NOT NULL,
            speechiness REAL NOT NULL,
            acousticness REAL NOT NULL,
            instrumentalness REAL NOT NULL,
            liveness REAL NOT NULL,
            valence REAL NOT NULL,
            tempo REAL NOT NULL,
            grammy_nominee INTEGER NOT NULL
        );",
    )
    .context("recreating warehouse schema")
}

/// Persist the merged-table contract consumed by the archival step.
pub fn write_merged(conn: &mut Connection, rows: &[FlatRow]) -> Result<()> {
    let pb = create_progress_bar(rows.len() as u64, "Phase 5: Writing merged table");
    for chunk in rows.chunks(WRITE_BATCH_SIZE) {
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO merged_tracks VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10,
                 ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25)",
            )?;
            for r in chunk {
                stmt.execute(params![
                    r.track_id,
                    r.track_name,
                    r.artist_spotify,
                    r.album_name,
                    r.album_others,
                    r.popularity,
                    r.duration_min,
                    r.explicit,
                    r.danceability,
                    r.energy,
                    r.loudness,
                    r.speechiness,
                    r.acousticness,
                    r.instrumentalness,
                    r.liveness,
                    r.valence,
                    r.tempo,
                    r.main_genre,
                    r.sub_genre,
                    r.year,
                    r.award_title,
                    r.category,
                    r.nominee,
                    r.artist_grammy,
                    r.grammy_nominee,
                ])
                .context("inserting into merged_tracks")?;
                pb.inc(1);
            }
        }
        tx.commit()?;
    }
    pb.finish_with_message(format!("Phase 5: Wrote {} merged rows", rows.len()));
    Ok(())
}

/// Load dimensions then facts. Returns the fact row count actually
/// persisted — the batch's completion signal.
pub fn load_star(conn: &mut Connection, star: &StarSchema) -> Result<usize> {
    let tx = conn.transaction()?;
    {
        let mut stmt = tx.prepare_cached(
            "INSERT INTO dim_track (track_key, track_spotify_id, track_name) VALUES (?1, ?2, ?3)",
        )?;
        for d in &star.tracks {
            stmt.execute(params![d.key, d.spotify_id, d.name])
                .context("inserting into dim_track")?;
        }

        let mut stmt = tx
            .prepare_cached("INSERT INTO dim_artist (artist_key, artist_credit) VALUES (?1, ?2)")?;
        for d in &star.artists {
            stmt.execute(params![d.key, d.artist_credit])
                .context("inserting into dim_artist")?;
        }

        let mut stmt = tx.prepare_cached(
            "INSERT INTO dim_album (album_key, album_name, album_others) VALUES (?1, ?2, ?3)",
        )?;
        for d in &star.albums {
            stmt.execute(params![d.key, d.name, d.others])
                .context("inserting into dim_album")?;
        }

        let mut stmt = tx.prepare_cached(
            "INSERT INTO dim_genre (genre_key, main_genre, sub_genre) VALUES (?1, ?2, ?3)",
        )?;
        for d in &star.genres {
            stmt.execute(params![d.key, d.main_genre, d.sub_genre])
                .context("inserting into dim_genre")?;
        }

        let mut stmt =
            tx.prepare_cached("INSERT INTO dim_time (time_key, year) VALUES (?1, ?2)")?;
        for d in &star.times {
            stmt.execute(params![d.key, d.year])
                .context("inserting into dim_time")?;
        }

        let mut stmt = tx.prepare_cached(
            "INSERT INTO dim_grammy (grammy_key, award_title, category, nominee, artist_grammy)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )?;
        for d in &star.grammys {
            stmt.execute(params![d.key, d.award_title, d.category, d.nominee, d.artist_credit])
                .context("inserting into dim_grammy")?;
        }
    }
    tx.commit().context("committing dimension load")?;

    let pb = create_progress_bar(star.facts.len() as u64, "Phase 5: Writing fact table");
    for chunk in star.facts.chunks(WRITE_BATCH_SIZE) {
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO fact_track_metrics (
                    track_key, artist_key, album_key, genre_key, time_key, grammy_key,
                    popularity, duration_min, explicit, danceability, energy, loudness,
                    speechiness, acousticness, instrumentalness, liveness, valence, tempo,
                    grammy_nominee
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14,
                    ?15, ?16, ?17, ?18, ?19)",
            )?;
            for f in chunk {
                stmt.execute(params![
                    f.track_key,
                    f.artist_key,
                    f.album_key,
                    f.genre_key,
                    f.time_key,
                    f.grammy_key,
                    f.popularity,
                    f.duration_min,
                    f.explicit,
                    f.danceability,
                    f.energy,
                    f.loudness,
                    f.speechiness,
                    f.acousticness,
                    f.instrumentalness,
                    f.liveness,
                    f.valence,
                    f.tempo,
                    f.grammy_nominee,
                ])
                .context("inserting into fact_track_metrics")?;
                pb.inc(1);
            }
        }
        tx.commit().context("committing fact load")?;
    }
    pb.finish_with_message(format!("Phase 5: Wrote {} fact rows", star.facts.len()));

    conn.execute_batch("ANALYZE;").context("analyzing warehouse")?;
    Ok(star.facts.len())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CatalogTrack, FactRow, MergedRow, NominationRecord};
    use crate::star::{build_star, flatten};

    fn memory_warehouse() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
        recreate_schema(&conn).unwrap();
        conn
    }

    fn sample_rows() -> Vec<MergedRow> {
        let catalog = CatalogTrack {
            id: "t1".to_string(),
            title: "shallow".to_string(),
            artist_credit: "lady gaga, bradley cooper".to_string(),
            album: "a star is born".to_string(),
            album_others: None,
            popularity: 85,
            duration_ms: 180_000,
            explicit: false,
            danceability: 0.6,
            energy: 0.4,
            loudness: -6.4,
            speechiness: 0.03,
            acousticness: 0.4,
            instrumentalness: 0.0,
            liveness: 0.3,
            valence: 0.3,
            tempo: 96.0,
            main_genre: "pop".to_string(),
            sub_genre: None,
        };
        let nomination = NominationRecord {
            year: 2019,
            title: "61st annual grammy awards".to_string(),
            category: "record of the year".to_string(),
            nominee: "shallow".to_string(),
            artist_credit: "lady gaga".to_string(),
        };
        vec![
            MergedRow {
                catalog: Some(catalog),
                nomination: Some(nomination.clone()),
                is_nominee: true,
            },
            MergedRow {
                catalog: None,
                nomination: Some(NominationRecord {
                    nominee: "one sweet day".to_string(),
                    ..nomination
                }),
                is_nominee: false,
            },
        ]
    }

    #[test]
    fn test_load_star_reports_fact_count() {
        let mut conn = memory_warehouse();
        let rows = flatten(&sample_rows());
        let star = build_star(&rows);

        write_merged(&mut conn, &rows).unwrap();
        let loaded = load_star(&mut conn, &star).unwrap();
        assert_eq!(loaded, 2);

        let merged_count: i64 = conn
            .query_row("SELECT COUNT(*) FROM merged_tracks", [], |r| r.get(0))
            .unwrap();
        assert_eq!(merged_count, 2);

        // FK round trip inside the sink: no orphaned fact keys
        let orphans: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM fact_track_metrics f
                 LEFT JOIN dim_track t ON t.track_key = f.track_key
                 WHERE t.track_key IS NULL",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(orphans, 0);
    }

    #[test]
    fn test_foreign_key_violation_is_fatal() {
        let mut conn = memory_warehouse();
        let star = StarSchema {
            facts: vec![FactRow {
                track_key: 99,
                artist_key: 99,
                album_key: 99,
                genre_key: 99,
                time_key: 99,
                grammy_key: 99,
                popularity: 0.0,
                duration_min: 0.0,
                explicit: false,
                danceability: 0.0,
                energy: 0.0,
                loudness: 0.0,
                speechiness: 0.0,
                acousticness: 0.0,
                instrumentalness: 0.0,
                liveness: 0.0,
                valence: 0.0,
                tempo: 0.0,
                grammy_nominee: false,
            }],
            ..StarSchema::default()
        };
        let err = load_star(&mut conn, &star).unwrap_err();
        assert!(err.to_string().contains("fact_track_metrics"));
    }

    #[test]
    fn test_duplicate_natural_key_is_fatal() {
        let mut conn = memory_warehouse();
        let rows = flatten(&sample_rows());
        let mut star = build_star(&rows);
        // A duplicated natural key means the upstream dedup failed
        let mut dup = star.tracks[0].clone();
        dup.key += 100;
        star.tracks.push(dup);

        let err = load_star(&mut conn, &star).unwrap_err();
        assert!(err.to_string().contains("dim_track"));
    }
}

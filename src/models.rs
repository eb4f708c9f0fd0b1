//! Core data models for the reconciliation pipeline.
//!
//! Structs here flow through the pipeline in order: `CatalogTrack` and
//! `NominationRecord` out of staging, `MergedRow` out of the entity matcher,
//! `FlatRow` out of the dimensional modeler's measure pass, then the
//! star-schema rows.

use rustc_hash::FxHashMap;
use serde::Serialize;

// ============================================================================
// Type Aliases
// ============================================================================

/// Blocking index mapping a normalized join key to row indices.
pub type TitleIndex = FxHashMap<String, Vec<usize>>;

// ============================================================================
// Source Models
// ============================================================================

/// One streaming-catalog track.
///
/// `sub_genre` starts as the raw genre label; after the id-dedup pass it
/// becomes the comma-joined set of the group's *other* labels (or None).
/// `album_others` is filled by the title+artist dedup pass.
#[derive(Clone, Debug)]
pub struct CatalogTrack {
    pub id: String,
    pub title: String,
    pub artist_credit: String,
    pub album: String,
    pub album_others: Option<String>,
    pub popularity: i32,
    pub duration_ms: i64,
    pub explicit: bool,
    pub danceability: f64,
    pub energy: f64,
    pub loudness: f64,
    pub speechiness: f64,
    pub acousticness: f64,
    pub instrumentalness: f64,
    pub liveness: f64,
    pub valence: f64,
    pub tempo: f64,
    pub main_genre: String,
    pub sub_genre: Option<String>,
}

/// One awards-ledger nomination. Text fields are normalized at extraction;
/// nominee/artist are never empty (the "not specified" sentinel substitutes).
#[derive(Clone, Debug)]
pub struct NominationRecord {
    pub year: i32,
    pub title: String,
    pub category: String,
    pub nominee: String,
    pub artist_credit: String,
}

// ============================================================================
// Merged Models
// ============================================================================

/// Outer-join product of the two sources. Every source row appears in at
/// least one `MergedRow`; an unmatched side is None.
#[derive(Clone, Debug)]
pub struct MergedRow {
    pub catalog: Option<CatalogTrack>,
    pub nomination: Option<NominationRecord>,
    pub is_nominee: bool,
}

/// Sentinel written wherever a text field is missing after the outer join.
pub const NOT_SPECIFIED: &str = "not specified";

/// Sentinel-filled, measure-coerced row: the merged-table contract and the
/// dimensional modeler's input. Duration is in minutes here, loudness is
/// clamped at 0 dB, flags are strict booleans.
#[derive(Clone, Debug)]
pub struct FlatRow {
    pub track_id: String,
    pub track_name: String,
    pub artist_spotify: String,
    pub album_name: String,
    pub album_others: String,
    pub popularity: f64,
    pub duration_min: f64,
    pub explicit: bool,
    pub danceability: f64,
    pub energy: f64,
    pub loudness: f64,
    pub speechiness: f64,
    pub acousticness: f64,
    pub instrumentalness: f64,
    pub liveness: f64,
    pub valence: f64,
    pub tempo: f64,
    pub main_genre: String,
    pub sub_genre: String,
    pub year: i32,
    pub award_title: String,
    pub category: String,
    pub nominee: String,
    pub artist_grammy: String,
    pub grammy_nominee: bool,
}

// ============================================================================
// Star-Schema Models
// ============================================================================

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DimTrack {
    pub key: i64,
    pub spotify_id: String,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DimArtist {
    pub key: i64,
    pub artist_credit: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DimAlbum {
    pub key: i64,
    pub name: String,
    pub others: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DimGenre {
    pub key: i64,
    pub main_genre: String,
    pub sub_genre: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DimTime {
    pub key: i64,
    pub year: i32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DimGrammy {
    pub key: i64,
    pub award_title: String,
    pub category: String,
    pub nominee: String,
    pub artist_credit: String,
}

/// One fact row: six surrogate foreign keys plus the measures. Never built
/// with a placeholder key — a row that cannot resolve every dimension is
/// excluded upstream.
#[derive(Clone, Debug)]
pub struct FactRow {
    pub track_key: i64,
    pub artist_key: i64,
    pub album_key: i64,
    pub genre_key: i64,
    pub time_key: i64,
    pub grammy_key: i64,
    pub popularity: f64,
    pub duration_min: f64,
    pub explicit: bool,
    pub danceability: f64,
    pub energy: f64,
    pub loudness: f64,
    pub speechiness: f64,
    pub acousticness: f64,
    pub instrumentalness: f64,
    pub liveness: f64,
    pub valence: f64,
    pub tempo: f64,
    pub grammy_nominee: bool,
}

// ============================================================================
// Statistics (Instrumentation)
// ============================================================================

/// Per-phase run statistics, reported at the end of the batch and optionally
/// written as JSON for operational tooling.
#[derive(Default, Debug, Clone, Serialize)]
pub struct RunStats {
    // Phase 1: extraction
    pub catalog_rows_read: usize,
    pub catalog_rows_skipped: usize,
    pub nomination_rows_read: usize,
    pub nomination_fields_defaulted: usize,

    // Phase 2: intra-source dedup
    pub catalog_after_id_dedup: usize,
    pub catalog_after_title_artist_dedup: usize,

    // Phase 3: entity matching
    pub merged_rows: usize,
    pub joined_pairs: usize,
    pub catalog_only_rows: usize,
    pub nomination_only_rows: usize,
    pub nominee_rows: usize,

    // Phase 4: dimensional model
    pub dim_track_rows: usize,
    pub dim_artist_rows: usize,
    pub dim_album_rows: usize,
    pub dim_genre_rows: usize,
    pub dim_time_rows: usize,
    pub dim_grammy_rows: usize,
    pub fact_rows: usize,
    pub fact_exclusions: usize,

    // Timing
    pub elapsed_seconds: f64,
}

impl RunStats {
    /// Share of merged rows flagged as nominees
    pub fn nominee_rate(&self) -> f64 {
        if self.merged_rows == 0 {
            0.0
        } else {
            100.0 * self.nominee_rows as f64 / self.merged_rows as f64
        }
    }

    /// Log stats to stderr in JSON format
    pub fn log_phase(&self, phase: &str) {
        if let Ok(json) = serde_json::to_string_pretty(self) {
            eprintln!("[STATS:{}]\n{}", phase, json);
        }
    }

    /// Write stats to a JSON file
    pub fn write_to_file(&self, path: &std::path::Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

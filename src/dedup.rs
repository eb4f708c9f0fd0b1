//! Intra-source deduplication: two reduction passes over the catalog.
//!
//! Pass 1 collapses rows sharing a source identifier (one row per genre
//! label for the same physical track); pass 2 collapses re-releases sharing
//! (normalized title, normalized artist-credit). Both keep the most popular
//! row, tie-broken by the lexicographically smallest identifier, and merge
//! the losers' secondary attributes into the survivor. Groups are
//! independent, so the reductions run under rayon; results are identical
//! under sequential execution.
//!
//! Re-running either pass on its own output is a fixed point.

use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::BTreeSet;

use crate::models::CatalogTrack;
use crate::normalize::normalize_text;

/// Group rows by a key, preserving first-seen group order so downstream
/// surrogate keys stay stable within a run.
fn group_by<K, F>(rows: Vec<CatalogTrack>, key_fn: F) -> Vec<Vec<CatalogTrack>>
where
    K: std::hash::Hash + Eq,
    F: Fn(&CatalogTrack) -> K,
{
    let mut index: FxHashMap<K, usize> = FxHashMap::default();
    let mut groups: Vec<Vec<CatalogTrack>> = Vec::new();
    for row in rows {
        let key = key_fn(&row);
        match index.get(&key) {
            Some(&i) => groups[i].push(row),
            None => {
                index.insert(key, groups.len());
                groups.push(vec![row]);
            }
        }
    }
    groups
}

/// Survivor selection: maximum popularity, ties to the lexicographically
/// smallest id, further ties to the earliest row.
fn survivor_index(group: &[CatalogTrack]) -> usize {
    let mut best = 0;
    for (i, row) in group.iter().enumerate().skip(1) {
        let cur = &group[best];
        if row.popularity > cur.popularity
            || (row.popularity == cur.popularity && row.id < cur.id)
        {
            best = i;
        }
    }
    best
}

/// Pass 1: collapse rows sharing the same source identifier.
///
/// The survivor's `sub_genre` becomes the sorted, comma-joined set of all
/// distinct labels seen in the group except the one equal to the resolved
/// main genre, or None when nothing remains.
pub fn dedupe_by_id(rows: Vec<CatalogTrack>) -> Vec<CatalogTrack> {
    group_by(rows, |r| r.id.clone())
        .into_par_iter()
        .map(reduce_id_group)
        .collect()
}

fn reduce_id_group(mut group: Vec<CatalogTrack>) -> CatalogTrack {
    let idx = survivor_index(&group);
    let main_genre = group[idx].main_genre.clone();

    let mut labels: BTreeSet<String> = group
        .iter()
        .filter_map(|r| r.sub_genre.clone())
        .collect();
    labels.remove(&main_genre);

    let mut survivor = group.swap_remove(idx);
    survivor.sub_genre = if labels.is_empty() {
        None
    } else {
        Some(labels.into_iter().collect::<Vec<_>>().join(", "))
    };
    survivor
}

/// Pass 2: collapse re-releases sharing (title, artist-credit).
///
/// Free-text columns are normalized in place first; the grouping key is the
/// normalized pair. The survivor's `album_others` accumulates every other
/// distinct album observed in the group, semicolon-joined, or None when the
/// group only ever saw one album.
pub fn dedupe_by_title_artist(mut rows: Vec<CatalogTrack>) -> Vec<CatalogTrack> {
    for row in &mut rows {
        row.title = normalize_text(&row.title);
        row.artist_credit = normalize_text(&row.artist_credit);
        row.album = normalize_text(&row.album);
    }

    group_by(rows, |r| (r.title.clone(), r.artist_credit.clone()))
        .into_par_iter()
        .map(reduce_release_group)
        .collect()
}

fn reduce_release_group(mut group: Vec<CatalogTrack>) -> CatalogTrack {
    let idx = survivor_index(&group);
    let main_album = group[idx].album.clone();

    // Distinct other albums in observation order; carried-over album_others
    // entries count as observations so a re-run is a fixed point.
    let mut seen: FxHashSet<String> = FxHashSet::default();
    seen.insert(main_album);
    let mut others: Vec<String> = Vec::new();
    for row in &group {
        let carried = row.album_others.as_deref().unwrap_or("");
        for album in std::iter::once(row.album.as_str()).chain(carried.split("; ")) {
            if !album.is_empty() && seen.insert(album.to_string()) {
                others.push(album.to_string());
            }
        }
    }

    let mut survivor = group.swap_remove(idx);
    survivor.album_others = if others.is_empty() {
        None
    } else {
        Some(others.join("; "))
    };
    survivor
}

// ============================================================================
// TESTS
// ============================================================================

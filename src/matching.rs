//! Entity matcher: outer join across the two sources on normalized title
//! equality, then per-pair nominee resolution.
//!
//! The join key is the already-normalized catalog title against the
//! nomination's nominee field, looked up through a hash blocking index so
//! the step stays O(n+m) instead of pairwise. Every row from both sides
//! survives the join: a catalog track with no nominee lands in one row with
//! an empty award side, and vice versa. A catalog track nominated in
//! several categories or years yields one row per nomination.

use rayon::prelude::*;

use crate::models::{CatalogTrack, MergedRow, NominationRecord, TitleIndex};
use crate::normalize::{is_compilation_credit, split_artist_credits};
use crate::scoring::{fuzzy_artist_match, fuzzy_title_match};

/// Outer-join the deduplicated catalog against the nomination ledger and
/// flag each joined pair.
pub fn merge_sources(
    catalog: Vec<CatalogTrack>,
    nominations: Vec<NominationRecord>,
) -> Vec<MergedRow> {
    let catalog_tokens: Vec<Vec<String>> = catalog
        .iter()
        .map(|c| split_artist_credits(&c.artist_credit))
        .collect();
    let nomination_tokens: Vec<Vec<String>> = nominations
        .iter()
        .map(|n| split_artist_credits(&n.artist_credit))
        .collect();
    let compilation_flags: Vec<bool> = nominations
        .iter()
        .map(|n| is_compilation_credit(&n.artist_credit))
        .collect();

    // Blocking index: nominee → nomination row indices
    let mut index = TitleIndex::default();
    for (ni, nomination) in nominations.iter().enumerate() {
        index
            .entry(nomination.nominee.clone())
            .or_default()
            .push(ni);
    }

    // Joined pairs in catalog order; nominations touched here are consumed
    // from the right side of the outer join.
    let mut used = vec![false; nominations.len()];
    let mut pairs: Vec<(usize, usize)> = Vec::new();
    for (ci, track) in catalog.iter().enumerate() {
        if let Some(hits) = index.get(&track.title) {
            for &ni in hits {
                used[ni] = true;
                pairs.push((ci, ni));
            }
        }
    }

    let flags: Vec<bool> = pairs
        .par_iter()
        .map(|&(ci, ni)| {
            resolve_pair(
                &catalog[ci],
                &catalog_tokens[ci],
                &nominations[ni],
                &nomination_tokens[ni],
                compilation_flags[ni],
            )
        })
        .collect();

    let mut rows = Vec::with_capacity(catalog.len() + nominations.len());
    let mut cursor = 0;
    for (ci, track) in catalog.iter().enumerate() {
        let first = cursor;
        while cursor < pairs.len() && pairs[cursor].0 == ci {
            cursor += 1;
        }
        if first == cursor {
            rows.push(MergedRow {
                catalog: Some(track.clone()),
                nomination: None,
                is_nominee: false,
            });
        } else {
            for p in first..cursor {
                rows.push(MergedRow {
                    catalog: Some(track.clone()),
                    nomination: Some(nominations[pairs[p].1].clone()),
                    is_nominee: flags[p],
                });
            }
        }
    }
    for (ni, nomination) in nominations.into_iter().enumerate() {
        if !used[ni] {
            rows.push(MergedRow {
                catalog: None,
                nomination: Some(nomination),
                is_nominee: false,
            });
        }
    }
    rows
}

/// Nominee decision for one joined pair.
///
/// The title gate applies first and rejects regardless of artists. A
/// compilation nominee accepts on a multi-artist catalog credit alone; any
/// other nominee needs one artist-token pair at the similarity threshold.
/// Blank titles or credits never match.
fn resolve_pair(
    catalog: &CatalogTrack,
    catalog_tokens: &[String],
    nomination: &NominationRecord,
    nomination_tokens: &[String],
    compilation: bool,
) -> bool {
    if !fuzzy_title_match(&catalog.title, &nomination.nominee) {
        return false;
    }
    if compilation {
        return catalog_tokens.len() > 1;
    }
    fuzzy_artist_match(catalog_tokens, nomination_tokens)
}

// ============================================================================
// TESTS
// ============================================================================

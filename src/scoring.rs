//! Token-set similarity scoring for the entity matcher.
//!
//! The score compares two texts as unordered bags of whitespace tokens: the
//! shared-token core is rebuilt into sorted strings and the best pairwise
//! string ratio among (core, core+rest_a, core+rest_b) wins. Reordered
//! credit lists and one title being a word-subset of the other both score
//! 100, which is what lets the matcher survive "feat. X" suffixes and
//! swapped artist orders without exact equality.

use std::collections::BTreeSet;

// ============================================================================
// Score Thresholds
// ============================================================================

// Policy constants, not algorithm: review alongside the genre tables.

/// Minimum title similarity for a joined pair to stay eligible
pub const TITLE_MATCH_THRESHOLD: i32 = 90;

/// Minimum artist-token similarity for a non-compilation match
pub const ARTIST_MATCH_THRESHOLD: i32 = 90;

// ============================================================================
// Token-Set Similarity
// ============================================================================

/// Base string ratio on a 0.0–1.0 scale.
fn ratio(a: &str, b: &str) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    strsim::normalized_levenshtein(a, b)
}

/// Token-set similarity on a 0–100 scale.
///
/// Order- and repetition-insensitive: tokens are deduplicated into sorted
/// sets, split into the shared core and each side's remainder, and the
/// maximum of the three pairwise ratios is scaled to 0–100. Returns 0 when
/// either side has no tokens.
pub fn token_set_ratio(a: &str, b: &str) -> i32 {
    let tokens_a: BTreeSet<&str> = a.split_whitespace().collect();
    let tokens_b: BTreeSet<&str> = b.split_whitespace().collect();
    if tokens_a.is_empty() || tokens_b.is_empty() {
        return 0;
    }

    let core_tokens: Vec<&str> = tokens_a.intersection(&tokens_b).copied().collect();
    let rest_a_tokens: Vec<&str> = tokens_a.difference(&tokens_b).copied().collect();
    let rest_b_tokens: Vec<&str> = tokens_b.difference(&tokens_a).copied().collect();

    let core = core_tokens.join(" ");
    let combined_a = concat(&core, &rest_a_tokens.join(" "));
    let combined_b = concat(&core, &rest_b_tokens.join(" "));

    let best = ratio(&core, &combined_a)
        .max(ratio(&core, &combined_b))
        .max(ratio(&combined_a, &combined_b));
    (best * 100.0).round() as i32
}

fn concat(core: &str, rest: &str) -> String {
    match (core.is_empty(), rest.is_empty()) {
        (_, true) => core.to_string(),
        (true, false) => rest.to_string(),
        (false, false) => format!("{} {}", core, rest),
    }
}

// ============================================================================
// Match Predicates
// ============================================================================

/// Title gate: both present and token-set similar at the policy threshold.
pub fn fuzzy_title_match(a: &str, b: &str) -> bool {
    if a.trim().is_empty() || b.trim().is_empty() {
        return false;
    }
    token_set_ratio(a, b) >= TITLE_MATCH_THRESHOLD
}

/// Any-to-any artist-token comparison: true when any pair of tokens from
/// the two credit lists reaches the policy threshold. Either list being
/// empty never matches.
pub fn fuzzy_artist_match(list_a: &[String], list_b: &[String]) -> bool {
    if list_a.is_empty() || list_b.is_empty() {
        return false;
    }
    list_a.iter().any(|a| {
        list_b
            .iter()
            .any(|b| token_set_ratio(a, b) >= ARTIST_MATCH_THRESHOLD)
    })
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equal_strings_score_100() {
        assert_eq!(token_set_ratio("shallow", "shallow"), 100);
        assert_eq!(token_set_ratio("lady gaga", "lady gaga"), 100);
    }

    #[test]
    fn test_reordering_scores_100() {
        assert_eq!(token_set_ratio("gaga lady", "lady gaga"), 100);
        assert_eq!(
            token_set_ratio("cooper bradley gaga lady", "lady gaga bradley cooper"),
            100
        );
    }

    #[test]
    fn test_token_subset_scores_100() {
        // One side being a word-subset of the other collapses to the core
        assert_eq!(token_set_ratio("shallow", "shallow radio edit"), 100);
        assert_eq!(token_set_ratio("lady gaga", "lady gaga bradley cooper"), 100);
    }

    #[test]
    fn test_repetition_is_ignored() {
        assert_eq!(token_set_ratio("bad bunny bad bunny", "bad bunny"), 100);
    }

    #[test]
    fn test_disjoint_strings_score_low() {
        assert!(token_set_ratio("bad bunny", "taylor swift") < ARTIST_MATCH_THRESHOLD);
        assert!(token_set_ratio("shallow", "bohemian rhapsody") < TITLE_MATCH_THRESHOLD);
    }

    #[test]
    fn test_empty_sides_score_zero() {
        assert_eq!(token_set_ratio("", "shallow"), 0);
        assert_eq!(token_set_ratio("shallow", ""), 0);
        assert_eq!(token_set_ratio("", ""), 0);
    }

    #[test]
    fn test_fuzzy_title_match_gate() {
        assert!(fuzzy_title_match("shallow", "shallow"));
        assert!(!fuzzy_title_match("", "shallow"));
        assert!(!fuzzy_title_match("shallow", "bohemian rhapsody"));
    }

    #[test]
    fn test_fuzzy_artist_match_any_pair() {
        let catalog = vec!["lady gaga".to_string(), "bradley cooper".to_string()];
        let nomination = vec!["lady gaga".to_string()];
        assert!(fuzzy_artist_match(&catalog, &nomination));

        let other = vec!["taylor swift".to_string()];
        assert!(!fuzzy_artist_match(&catalog, &other));
        assert!(!fuzzy_artist_match(&[], &nomination));
        assert!(!fuzzy_artist_match(&catalog, &[]));
    }
}

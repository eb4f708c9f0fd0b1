//! Shared text normalization for catalog-nomination matching.
//! Used by the extraction phase, both dedup passes and the entity matcher.
//!
//! CRITICAL: the dedup grouping keys and the outer-join key are both built
//! from `normalize_text`. Any change here shifts group membership and match
//! results. Run tests after changes.

use any_ascii::any_ascii;
use once_cell::sync::Lazy;
use regex::Regex;
use rustc_hash::FxHashSet;
use unicode_normalization::UnicodeNormalization;

// ============================================================================
// REGEX PATTERNS
// ============================================================================

/// Credit boundaries in a multi-artist string: "feat.", "featuring", "with",
/// "and", ",", "&", ";" (case-insensitive, surrounding whitespace absorbed).
static CREDIT_SEPARATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s*(?:featuring|feat\.?|with|and|,|&|;)\s*").unwrap());

/// "various artists" and regional spellings not covered by the fixed alias
/// set, e.g. "various artists vol. 2".
static VARIOUS_ARTISTS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:various|varios)\s+artists?\b").unwrap());

/// Collapse multiple whitespace into a single space
static MULTI_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s{2,}").unwrap());

/// Fixed compilation-credit aliases, compared against normalized text.
static COMPILATION_ALIASES: Lazy<FxHashSet<&'static str>> = Lazy::new(|| {
    [
        "various artists",
        "varios artistas",
        "v.a.",
        "v.a",
        "varios",
        "various",
        "artistas varios",
        "compilation",
        "compilacion",
    ]
    .into_iter()
    .collect()
});

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

/// Check if a character is a Unicode combining mark (diacritical mark).
/// Used to filter out accents during normalization.
fn is_combining_mark(c: char) -> bool {
    matches!(c as u32, 0x0300..=0x036F | 0x1AB0..=0x1AFF | 0x1DC0..=0x1DFF | 0xFE20..=0xFE2F)
}

/// Fold Unicode text to ASCII by applying NFKD decomposition and removing
/// combining marks, e.g. "Rosalía" → "rosalia", "Beyoncé" → "beyonce".
/// Remaining non-ASCII (Cyrillic, CJK, ...) is transliterated.
pub fn fold_to_ascii(s: &str) -> String {
    let stripped: String = s.nfkd().filter(|c| !is_combining_mark(*c)).collect();
    any_ascii(&stripped).to_lowercase()
}

// ============================================================================
// NORMALIZATION FUNCTIONS
// ============================================================================

/// Canonical form of a free-text field: diacritics stripped, lower-cased,
/// trimmed, inner whitespace runs collapsed.
pub fn normalize_text(s: &str) -> String {
    let folded = fold_to_ascii(s);
    MULTI_SPACE.replace_all(folded.trim(), " ").to_string()
}

/// Split a multi-artist credit string into atomic artist tokens.
///
/// Separator variants ("feat.", "featuring", "with", "and", ",", "&", ";")
/// all mark a credit boundary. Tokens come back normalized, trimmed and
/// non-empty, in source order, without deduplication. Blank input yields an
/// empty vec.
pub fn split_artist_credits(credit: &str) -> Vec<String> {
    if credit.trim().is_empty() {
        return Vec::new();
    }
    let folded = fold_to_ascii(credit);
    CREDIT_SEPARATOR
        .split(&folded)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Whether a credit string names a compilation / "various artists" release
/// rather than an identifiable act. Blank input is not a compilation.
pub fn is_compilation_credit(credit: &str) -> bool {
    if credit.trim().is_empty() {
        return false;
    }
    let norm = normalize_text(credit);
    COMPILATION_ALIASES.contains(norm.as_str()) || VARIOUS_ARTISTS.is_match(&norm)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fold_to_ascii() {
        assert_eq!(fold_to_ascii("Björk"), "bjork");
        assert_eq!(fold_to_ascii("Motörhead"), "motorhead");
        assert_eq!(fold_to_ascii("Rosalía"), "rosalia");
    }

    #[test]
    fn test_normalize_text() {
        assert_eq!(normalize_text("  Bad  Bunny "), "bad bunny");
        assert_eq!(normalize_text("SHAKIRA"), "shakira");
        assert_eq!(normalize_text("Café\tTacvba"), "cafe tacvba");
    }

    #[test]
    fn test_split_artist_credits_order_and_diacritics() {
        // Order preserved, diacritics stripped, no dedup across tokens
        assert_eq!(
            split_artist_credits("Bad Bunny, Rosalía & ROSALÍA"),
            vec!["bad bunny", "rosalia", "rosalia"]
        );
    }

    #[test]
    fn test_split_artist_credits_separators() {
        assert_eq!(
            split_artist_credits("Lady Gaga feat. Bradley Cooper"),
            vec!["lady gaga", "bradley cooper"]
        );
        assert_eq!(
            split_artist_credits("Simon AND Garfunkel"),
            vec!["simon", "garfunkel"]
        );
        assert_eq!(
            split_artist_credits("Santana with Rob Thomas; Wyclef"),
            vec!["santana", "rob thomas", "wyclef"]
        );
        assert_eq!(
            split_artist_credits("Eminem featuring Dido"),
            vec!["eminem", "dido"]
        );
        assert_eq!(split_artist_credits("Beyoncé"), vec!["beyonce"]);
    }

    #[test]
    fn test_split_artist_credits_blank() {
        assert!(split_artist_credits("").is_empty());
        assert!(split_artist_credits("   ").is_empty());
    }

    #[test]
    fn test_is_compilation_credit_aliases() {
        assert!(is_compilation_credit("Various Artists"));
        assert!(is_compilation_credit("varios artistas"));
        assert!(is_compilation_credit("V.A."));
        assert!(is_compilation_credit("Compilación"));
    }

    #[test]
    fn test_is_compilation_credit_pattern() {
        assert!(is_compilation_credit("Various Artists of the 90s"));
        assert!(is_compilation_credit("Varios Artistas Latinos"));
    }

    #[test]
    fn test_is_compilation_credit_negative() {
        assert!(!is_compilation_credit("Bad Bunny"));
        assert!(!is_compilation_credit(""));
        assert!(!is_compilation_credit("  "));
        // "variety" must not trip the word-boundary pattern
        assert!(!is_compilation_credit("Variety Hour Band"));
    }
}

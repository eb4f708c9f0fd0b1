//! Genre taxonomy: folds the catalog's noisy sub-genre labels onto a small
//! set of main-genre buckets.
//!
//! The synonym table and the bucket table are policy data, not logic. Labels
//! absent from both pass through unchanged (identity fallback) — an unknown
//! genre must never drop a row or raise an error. The original label is
//! always kept as the sub-genre attribute by the caller.

use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;

/// Regional/legacy spellings folded before the bucket lookup.
static GENRE_SYNONYMS: Lazy<FxHashMap<&'static str, &'static str>> = Lazy::new(|| {
    let mut m = FxHashMap::default();
    m.insert("latino", "latin");
    m.insert("kids", "children");
    m
});

/// Many-to-one sub-genre → main-genre bucket table.
static GENRE_BUCKETS: Lazy<FxHashMap<&'static str, &'static str>> = Lazy::new(|| {
    let mut m = FxHashMap::default();
    // rock
    m.insert("alt-rock", "rock");
    m.insert("hard-rock", "rock");
    m.insert("punk-rock", "rock");
    m.insert("rock-n-roll", "rock");
    m.insert("rockabilly", "rock");
    m.insert("grunge", "rock");
    m.insert("psych-rock", "rock");
    m.insert("punk", "rock");
    m.insert("rock", "rock");
    // metal
    m.insert("metal", "metal");
    m.insert("black-metal", "metal");
    m.insert("death-metal", "metal");
    m.insert("heavy-metal", "metal");
    m.insert("metalcore", "metal");
    m.insert("grindcore", "metal");
    // pop
    m.insert("pop", "pop");
    m.insert("indie-pop", "pop");
    m.insert("power-pop", "pop");
    m.insert("synth-pop", "pop");
    m.insert("pop-film", "pop");
    m.insert("k-pop", "pop");
    m.insert("j-pop", "pop");
    m.insert("mandopop", "pop");
    m.insert("cantopop", "pop");
    // electronic
    m.insert("edm", "electronic");
    m.insert("electro", "electronic");
    m.insert("electronic", "electronic");
    m.insert("deep-house", "electronic");
    m.insert("detroit-techno", "electronic");
    m.insert("techno", "electronic");
    m.insert("house", "electronic");
    m.insert("progressive-house", "electronic");
    m.insert("chicago-house", "electronic");
    m.insert("trance", "electronic");
    m.insert("dubstep", "electronic");
    m.insert("drum-and-bass", "electronic");
    m.insert("idm", "electronic");
    m.insert("trip-hop", "electronic");
    m.insert("minimal-techno", "electronic");
    m.insert("club", "electronic");
    m.insert("dance", "electronic");
    m.insert("dancehall", "electronic");
    m.insert("disco", "electronic");
    m.insert("dub", "electronic");
    m.insert("garage", "electronic");
    m.insert("breakbeat", "electronic");
    // hip hop / r&b
    m.insert("hip-hop", "hip-hop");
    m.insert("r-n-b", "hip-hop");
    // jazz / blues
    m.insert("jazz", "jazz");
    m.insert("blues", "blues");
    m.insert("bluegrass", "blues");
    // latin
    m.insert("latin", "latin");
    m.insert("salsa", "latin");
    m.insert("samba", "latin");
    m.insert("pagode", "latin");
    m.insert("sertanejo", "latin");
    m.insert("brazil", "latin");
    m.insert("forro", "latin");
    m.insert("mpb", "latin");
    // other mains
    m.insert("country", "country");
    m.insert("folk", "folk");
    m.insert("gospel", "gospel");
    m.insert("opera", "classical");
    m.insert("classical", "classical");
    m.insert("piano", "classical");
    m.insert("acoustic", "acoustic");
    m.insert("singer-songwriter", "acoustic");
    m.insert("songwriter", "acoustic");
    // j-music
    m.insert("anime", "j-music");
    m.insert("j-rock", "j-music");
    m.insert("j-idol", "j-music");
    m.insert("j-dance", "j-music");
    // misc
    m.insert("alternative", "alternative");
    m.insert("ambient", "ambient");
    m.insert("world-music", "world");
    m.insert("afrobeat", "world");
    m.insert("indian", "world");
    m.insert("iranian", "world");
    m.insert("turkish", "world");
    m.insert("swedish", "world");
    m.insert("french", "world");
    m.insert("german", "world");
    m.insert("spanish", "world");
    m.insert("malay", "world");
    m.insert("emo", "emo");
    m.insert("hardcore", "hardcore");
    m.insert("hardstyle", "hardstyle");
    m.insert("industrial", "industrial");
    m.insert("goth", "goth");
    m.insert("groove", "groove");
    m.insert("funk", "funk");
    m.insert("soul", "soul");
    m.insert("comedy", "comedy");
    m.insert("children", "children");
    m.insert("disney", "children");
    m.insert("study", "study");
    m.insert("sleep", "study");
    m.insert("happy", "mood");
    m.insert("sad", "mood");
    m.insert("romance", "mood");
    m.insert("party", "mood");
    m.insert("show-tunes", "theatre");
    m.insert("new-age", "new-age");
    m.insert("chill", "chill");
    m.insert("guitar", "instrumental");
    m
});

/// Map a sub-genre label to its main-genre bucket.
///
/// Synonyms fold first, then the bucket table; an unmapped label becomes its
/// own main genre.
pub fn map_genre(label: &str) -> String {
    let trimmed = label.trim().to_lowercase();
    let canonical = GENRE_SYNONYMS
        .get(trimmed.as_str())
        .copied()
        .unwrap_or(trimmed.as_str());
    GENRE_BUCKETS
        .get(canonical)
        .copied()
        .unwrap_or(canonical)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_lookup() {
        assert_eq!(map_genre("grunge"), "rock");
        assert_eq!(map_genre("detroit-techno"), "electronic");
        assert_eq!(map_genre("opera"), "classical");
        assert_eq!(map_genre("r-n-b"), "hip-hop");
    }

    #[test]
    fn test_synonym_folds_before_lookup() {
        assert_eq!(map_genre("latino"), "latin");
        assert_eq!(map_genre("kids"), "children");
    }

    #[test]
    fn test_identity_fallback() {
        // Unknown labels pass through as their own main genre, never an error
        assert_eq!(map_genre("vaporwave"), "vaporwave");
        assert_eq!(map_genre("  Chiptune "), "chiptune");
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(map_genre("K-Pop"), "pop");
        assert_eq!(map_genre("SALSA"), "latin");
    }
}

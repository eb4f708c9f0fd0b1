//! Dimensional modeler: flattens the merged rows into the warehouse
//! contract, derives the six dimensions and the fact relation.
//!
//! Surrogate keys are dense 1-based integers assigned in first-seen order
//! over the flat rows; only stability within a run matters. Dimension
//! deduplication is exact-match on the already-normalized text, not fuzzy.
//! A flat row that cannot resolve all six keys is excluded from the fact
//! set and counted — never inserted with a placeholder key.

use rustc_hash::FxHashMap;

use crate::models::{
    DimAlbum, DimArtist, DimGenre, DimGrammy, DimTime, DimTrack, FactRow, FlatRow, MergedRow,
    NOT_SPECIFIED,
};

const MS_PER_MINUTE: f64 = 60_000.0;

/// All dimension relations plus the fact relation for one batch run.
#[derive(Debug, Default)]
pub struct StarSchema {
    pub tracks: Vec<DimTrack>,
    pub artists: Vec<DimArtist>,
    pub albums: Vec<DimAlbum>,
    pub genres: Vec<DimGenre>,
    pub times: Vec<DimTime>,
    pub grammys: Vec<DimGrammy>,
    pub facts: Vec<FactRow>,
    /// Merged rows that failed to join to at least one dimension
    pub excluded: usize,
}

// ============================================================================
// Measure Pass
// ============================================================================

/// Project a merged row onto the flat warehouse contract.
///
/// Text gaps become the "not specified" sentinel and numeric gaps become 0,
/// so the flat relation carries no nulls. Duration is rescaled from
/// milliseconds to minutes; a positive loudness reading is physically
/// implausible and clamps to 0 dB.
fn flatten_row(row: &MergedRow) -> FlatRow {
    let mut flat = match &row.catalog {
        Some(c) => FlatRow {
            track_id: c.id.clone(),
            track_name: c.title.clone(),
            artist_spotify: c.artist_credit.clone(),
            album_name: c.album.clone(),
            album_others: c
                .album_others
                .clone()
                .unwrap_or_else(|| NOT_SPECIFIED.to_string()),
            popularity: c.popularity as f64,
            duration_min: c.duration_ms as f64 / MS_PER_MINUTE,
            explicit: c.explicit,
            danceability: c.danceability,
            energy: c.energy,
            loudness: c.loudness.min(0.0),
            speechiness: c.speechiness,
            acousticness: c.acousticness,
            instrumentalness: c.instrumentalness,
            liveness: c.liveness,
            valence: c.valence,
            tempo: c.tempo,
            main_genre: c.main_genre.clone(),
            sub_genre: c
                .sub_genre
                .clone()
                .unwrap_or_else(|| NOT_SPECIFIED.to_string()),
            year: 0,
            award_title: NOT_SPECIFIED.to_string(),
            category: NOT_SPECIFIED.to_string(),
            nominee: NOT_SPECIFIED.to_string(),
            artist_grammy: NOT_SPECIFIED.to_string(),
            grammy_nominee: row.is_nominee,
        },
        None => FlatRow {
            track_id: NOT_SPECIFIED.to_string(),
            track_name: NOT_SPECIFIED.to_string(),
            artist_spotify: NOT_SPECIFIED.to_string(),
            album_name: NOT_SPECIFIED.to_string(),
            album_others: NOT_SPECIFIED.to_string(),
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
            main_genre: NOT_SPECIFIED.to_string(),
            sub_genre: NOT_SPECIFIED.to_string(),
            year: 0,
            award_title: NOT_SPECIFIED.to_string(),
            category: NOT_SPECIFIED.to_string(),
            nominee: NOT_SPECIFIED.to_string(),
            artist_grammy: NOT_SPECIFIED.to_string(),
            grammy_nominee: row.is_nominee,
        },
    };

    if let Some(n) = &row.nomination {
        flat.year = n.year;
        flat.award_title = n.title.clone();
        flat.category = n.category.clone();
        flat.nominee = n.nominee.clone();
        flat.artist_grammy = n.artist_credit.clone();
    }
    flat
}

/// Flatten the full merged set in row order.
pub fn flatten(merged: &[MergedRow]) -> Vec<FlatRow> {
    merged.iter().map(flatten_row).collect()
}

// ============================================================================
// Dimension & Fact Derivation
// ============================================================================

/// Assign-or-look-up helper for one dimension keyed by its natural tuple.
struct KeyedDim<K> {
    index: FxHashMap<K, i64>,
}

impl<K: std::hash::Hash + Eq + Clone> KeyedDim<K> {
    fn new() -> Self {
        Self {
            index: FxHashMap::default(),
        }
    }

    /// Returns the surrogate key, calling `materialize` on first sight of a
    /// natural key. Keys are dense and 1-based in first-seen order.
    fn resolve(&mut self, key: &K, materialize: impl FnOnce(i64)) -> i64 {
        match self.index.get(key) {
            Some(&k) => k,
            None => {
                let k = self.index.len() as i64 + 1;
                self.index.insert(key.clone(), k);
                materialize(k);
                k
            }
        }
    }
}

/// Derive the six dimensions and the fact relation from the flat rows.
pub fn build_star(rows: &[FlatRow]) -> StarSchema {
    let mut star = StarSchema::default();

    let mut track_keys: KeyedDim<(String, String)> = KeyedDim::new();
    let mut artist_keys: KeyedDim<String> = KeyedDim::new();
    let mut album_keys: KeyedDim<(String, String)> = KeyedDim::new();
    let mut genre_keys: KeyedDim<(String, String)> = KeyedDim::new();
    let mut time_keys: KeyedDim<i32> = KeyedDim::new();
    let mut grammy_keys: KeyedDim<(String, String, String, String)> = KeyedDim::new();

    // First pass: distinct natural-key projections
    for row in rows {
        track_keys.resolve(&(row.track_id.clone(), row.track_name.clone()), |key| {
            star.tracks.push(DimTrack {
                key,
                spotify_id: row.track_id.clone(),
                name: row.track_name.clone(),
            })
        });
        artist_keys.resolve(&row.artist_spotify, |key| {
            star.artists.push(DimArtist {
                key,
                artist_credit: row.artist_spotify.clone(),
            })
        });
        album_keys.resolve(&(row.album_name.clone(), row.album_others.clone()), |key| {
            star.albums.push(DimAlbum {
                key,
                name: row.album_name.clone(),
                others: row.album_others.clone(),
            })
        });
        genre_keys.resolve(&(row.main_genre.clone(), row.sub_genre.clone()), |key| {
            star.genres.push(DimGenre {
                key,
                main_genre: row.main_genre.clone(),
                sub_genre: row.sub_genre.clone(),
            })
        });
        time_keys.resolve(&row.year, |key| {
            star.times.push(DimTime {
                key,
                year: row.year,
            })
        });
        grammy_keys.resolve(
            &(
                row.award_title.clone(),
                row.category.clone(),
                row.nominee.clone(),
                row.artist_grammy.clone(),
            ),
            |key| {
                star.grammys.push(DimGrammy {
                    key,
                    award_title: row.award_title.clone(),
                    category: row.category.clone(),
                    nominee: row.nominee.clone(),
                    artist_credit: row.artist_grammy.clone(),
                })
            },
        );
    }

    // Second pass: fact rows via natural-key lookups. Every key was just
    // registered above, so a miss means the model itself is inconsistent;
    // the row is excluded and counted, never inserted with a null key.
    for row in rows {
        let keys = (
            track_keys
                .index
                .get(&(row.track_id.clone(), row.track_name.clone())),
            artist_keys.index.get(&row.artist_spotify),
            album_keys
                .index
                .get(&(row.album_name.clone(), row.album_others.clone())),
            genre_keys
                .index
                .get(&(row.main_genre.clone(), row.sub_genre.clone())),
            time_keys.index.get(&row.year),
            grammy_keys.index.get(&(
                row.award_title.clone(),
                row.category.clone(),
                row.nominee.clone(),
                row.artist_grammy.clone(),
            )),
        );
        match keys {
            (Some(&t), Some(&a), Some(&al), Some(&g), Some(&tm), Some(&gr)) => {
                star.facts.push(FactRow {
                    track_key: t,
                    artist_key: a,
                    album_key: al,
                    genre_key: g,
                    time_key: tm,
                    grammy_key: gr,
                    popularity: row.popularity,
                    duration_min: row.duration_min,
                    explicit: row.explicit,
                    danceability: row.danceability,
                    energy: row.energy,
                    loudness: row.loudness,
                    speechiness: row.speechiness,
                    acousticness: row.acousticness,
                    instrumentalness: row.instrumentalness,
                    liveness: row.liveness,
                    valence: row.valence,
                    tempo: row.tempo,
                    grammy_nominee: row.grammy_nominee,
                });
            }
            _ => star.excluded += 1,
        }
    }

    star
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CatalogTrack, NominationRecord};
    use rustc_hash::FxHashSet;

    fn catalog_track(id: &str, title: &str) -> CatalogTrack {
        CatalogTrack {
            id: id.to_string(),
            title: title.to_string(),
            artist_credit: "lady gaga".to_string(),
            album: "a star is born".to_string(),
            album_others: None,
            popularity: 85,
            duration_ms: 180_000,
            explicit: false,
            danceability: 0.6,
            energy: 0.4,
            loudness: 3.2,
            speechiness: 0.03,
            acousticness: 0.4,
            instrumentalness: 0.0,
            liveness: 0.3,
            valence: 0.3,
            tempo: 96.0,
            main_genre: "pop".to_string(),
            sub_genre: None,
        }
    }

    fn nomination(nominee: &str) -> NominationRecord {
        NominationRecord {
            year: 2019,
            title: "61st annual grammy awards".to_string(),
            category: "record of the year".to_string(),
            nominee: nominee.to_string(),
            artist_credit: "lady gaga".to_string(),
        }
    }

    fn merged(catalog: Option<CatalogTrack>, nom: Option<NominationRecord>) -> MergedRow {
        let is_nominee = catalog.is_some() && nom.is_some();
        MergedRow {
            catalog,
            nomination: nom,
            is_nominee,
        }
    }

    #[test]
    fn test_measure_coercions() {
        let rows = flatten(&[merged(Some(catalog_track("t1", "shallow")), None)]);
        // 180000 ms → 3.0 min; +3.2 dB is implausible and clamps to 0
        assert_eq!(rows[0].duration_min, 3.0);
        assert_eq!(rows[0].loudness, 0.0);
    }

    #[test]
    fn test_negative_loudness_unclamped() {
        let mut c = catalog_track("t1", "shallow");
        c.loudness = -7.8;
        let rows = flatten(&[merged(Some(c), None)]);
        assert_eq!(rows[0].loudness, -7.8);
    }

    #[test]
    fn test_sentinels_fill_missing_sides() {
        let rows = flatten(&[
            merged(Some(catalog_track("t1", "shallow")), None),
            merged(None, Some(nomination("one sweet day"))),
        ]);
        assert_eq!(rows[0].nominee, NOT_SPECIFIED);
        assert_eq!(rows[0].year, 0);
        assert_eq!(rows[1].track_id, NOT_SPECIFIED);
        assert_eq!(rows[1].popularity, 0.0);
        assert_eq!(rows[1].nominee, "one sweet day");
        assert!(!rows[1].grammy_nominee);
    }

    #[test]
    fn test_surrogate_keys_dense_and_unique() {
        let rows = flatten(&[
            merged(Some(catalog_track("t1", "shallow")), Some(nomination("shallow"))),
            merged(Some(catalog_track("t2", "bad guy")), None),
            merged(None, Some(nomination("one sweet day"))),
        ]);
        let star = build_star(&rows);

        assert_eq!(star.tracks.len(), 3); // two tracks + the sentinel pair
        for (i, d) in star.tracks.iter().enumerate() {
            assert_eq!(d.key, i as i64 + 1);
        }
        let ids: FxHashSet<&str> = star.tracks.iter().map(|d| d.spotify_id.as_str()).collect();
        assert_eq!(ids.len(), star.tracks.len());
    }

    #[test]
    fn test_grammy_dimension_dedupes_exact_composites() {
        let rows = flatten(&[
            merged(Some(catalog_track("t1", "shallow")), Some(nomination("shallow"))),
            merged(Some(catalog_track("t2", "shallow")), Some(nomination("shallow"))),
        ]);
        let star = build_star(&rows);
        assert_eq!(star.grammys.len(), 1);
    }

    #[test]
    fn test_fact_keys_round_trip_to_dimensions() {
        let rows = flatten(&[
            merged(Some(catalog_track("t1", "shallow")), Some(nomination("shallow"))),
            merged(Some(catalog_track("t2", "bad guy")), None),
            merged(None, Some(nomination("one sweet day"))),
        ]);
        let star = build_star(&rows);

        let track_keys: FxHashSet<i64> = star.tracks.iter().map(|d| d.key).collect();
        let artist_keys: FxHashSet<i64> = star.artists.iter().map(|d| d.key).collect();
        let album_keys: FxHashSet<i64> = star.albums.iter().map(|d| d.key).collect();
        let genre_keys: FxHashSet<i64> = star.genres.iter().map(|d| d.key).collect();
        let time_keys: FxHashSet<i64> = star.times.iter().map(|d| d.key).collect();
        let grammy_keys: FxHashSet<i64> = star.grammys.iter().map(|d| d.key).collect();

        for f in &star.facts {
            assert!(track_keys.contains(&f.track_key));
            assert!(artist_keys.contains(&f.artist_key));
            assert!(album_keys.contains(&f.album_key));
            assert!(genre_keys.contains(&f.genre_key));
            assert!(time_keys.contains(&f.time_key));
            assert!(grammy_keys.contains(&f.grammy_key));
        }
    }

    #[test]
    fn test_facts_plus_exclusions_equal_attempted() {
        let rows = flatten(&[
            merged(Some(catalog_track("t1", "shallow")), Some(nomination("shallow"))),
            merged(Some(catalog_track("t2", "bad guy")), None),
            merged(None, Some(nomination("one sweet day"))),
        ]);
        let star = build_star(&rows);
        assert_eq!(star.facts.len() + star.excluded, rows.len());
        assert_eq!(star.excluded, 0);
    }
}

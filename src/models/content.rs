use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::TOP_CAST_COUNT;

/// Placeholder metadata sources use for an unknown language or studio
pub const NOT_AVAILABLE: &str = "N/A";

/// Metadata for one unwatched item being scored against a profile
///
/// Deserialization goes through [`RawContent`], which accepts every historical key
/// spelling (`studio`/`studios`, `keywords`/`tmdb_keywords`, `cast`/`actors`), prefers
/// the canonical key when both are present, and cleans the lists once so scoring
/// never has to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawContent")]
pub struct ContentCandidate {
    pub title: Option<String>,
    pub year: Option<i32>,
    pub tmdb_id: Option<u64>,
    pub genres: Vec<String>,
    pub directors: Vec<String>,
    pub studios: Vec<String>,
    pub cast: Vec<String>,
    pub language: Option<String>,
    pub keywords: Vec<String>,
    pub rating: Option<f64>,
    pub vote_count: Option<u64>,
    pub collection_id: Option<u64>,
}

impl ContentCandidate {
    /// True when the item carries nothing a profile could match against
    pub fn is_empty(&self) -> bool {
        self.genres.is_empty()
            && self.directors.is_empty()
            && self.studios.is_empty()
            && self.cast.is_empty()
            && self.keywords.is_empty()
            && self.scoreable_language().is_none()
    }

    /// The primary language, unless it is missing or the `N/A` placeholder
    pub fn scoreable_language(&self) -> Option<&str> {
        self.language
            .as_deref()
            .map(str::trim)
            .filter(|lang| !lang.is_empty() && !lang.eq_ignore_ascii_case(NOT_AVAILABLE))
    }

    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or("Unknown")
    }
}

/// A field that some sources send as a bare string and others as a list
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(Option<String>),
    Many(Vec<Option<String>>),
}

impl OneOrMany {
    fn into_vec(self) -> Vec<Option<String>> {
        match self {
            OneOrMany::One(value) => vec![value],
            OneOrMany::Many(values) => values,
        }
    }
}

/// Wire shape of a candidate as produced by metadata sources
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct RawContent {
    title: Option<String>,
    year: Option<i32>,
    tmdb_id: Option<u64>,
    genres: Option<Vec<Option<String>>>,
    directors: Option<OneOrMany>,
    studios: Option<OneOrMany>,
    studio: Option<OneOrMany>,
    cast: Option<Vec<Option<String>>>,
    actors: Option<Vec<Option<String>>>,
    language: Option<String>,
    keywords: Option<Vec<Option<String>>>,
    tmdb_keywords: Option<Vec<Option<String>>>,
    rating: Option<f64>,
    vote_count: Option<u64>,
    collection_id: Option<u64>,
}

impl From<RawContent> for ContentCandidate {
    fn from(raw: RawContent) -> Self {
        let mut cast = clean_list(raw.cast.or(raw.actors).unwrap_or_default());
        cast.truncate(TOP_CAST_COUNT);

        let studios = raw.studios.or(raw.studio).map(OneOrMany::into_vec);
        let studios = clean_list(studios.unwrap_or_default())
            .into_iter()
            .filter(|studio| !studio.eq_ignore_ascii_case(NOT_AVAILABLE))
            .collect();

        let language = raw
            .language
            .map(|lang| lang.trim().to_string())
            .filter(|lang| !lang.is_empty() && !lang.eq_ignore_ascii_case(NOT_AVAILABLE));

        ContentCandidate {
            title: raw.title,
            year: raw.year,
            tmdb_id: raw.tmdb_id,
            genres: clean_list(raw.genres.unwrap_or_default()),
            directors: clean_list(raw.directors.map(OneOrMany::into_vec).unwrap_or_default()),
            studios,
            cast,
            language,
            keywords: clean_list(raw.keywords.or(raw.tmdb_keywords).unwrap_or_default()),
            rating: raw.rating,
            vote_count: raw.vote_count,
            collection_id: raw.collection_id,
        }
    }
}

/// Trims entries, drops nulls and blanks, and removes case-insensitive duplicates
fn clean_list(values: Vec<Option<String>>) -> Vec<String> {
    let mut seen = HashSet::new();
    values
        .into_iter()
        .flatten()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .filter(|value| seen.insert(value.to_lowercase()))
        .collect()
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::Display;

use super::{MediaType, WeightedMap};

/// Accumulated taste signal for one user (or a combined group of users)
///
/// Movie profiles fill `directors` and `collections`; TV profiles fill `studios`.
/// Both historical spellings of the studio and keyword categories are accepted
/// when deserializing; when a document carries both, the canonical key wins.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawProfile")]
pub struct UserProfile {
    pub genres: WeightedMap,
    pub actors: WeightedMap,
    pub directors: WeightedMap,
    pub studios: WeightedMap,
    pub languages: WeightedMap,
    pub keywords: WeightedMap,
    pub collections: WeightedMap,
    /// Everything that contributed to the profile; only used to exclude watched items
    pub tmdb_ids: BTreeSet<u64>,
}

impl UserProfile {
    pub fn new() -> Self {
        Self::default()
    }

    /// The director map for movies, the studio map for TV
    pub fn creators(&self, media_type: MediaType) -> &WeightedMap {
        match media_type {
            MediaType::Movie => &self.directors,
            MediaType::Tv => &self.studios,
        }
    }

    /// True when no scoring category holds any entry
    pub fn is_empty(&self) -> bool {
        self.genres.is_empty()
            && self.actors.is_empty()
            && self.directors.is_empty()
            && self.studios.is_empty()
            && self.languages.is_empty()
            && self.keywords.is_empty()
    }
}

/// Stored or submitted profile shape, before the key spellings are merged
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawProfile {
    genres: WeightedMap,
    actors: WeightedMap,
    directors: WeightedMap,
    studios: Option<WeightedMap>,
    studio: Option<WeightedMap>,
    languages: WeightedMap,
    keywords: Option<WeightedMap>,
    tmdb_keywords: Option<WeightedMap>,
    collections: WeightedMap,
    tmdb_ids: BTreeSet<u64>,
}

impl From<RawProfile> for UserProfile {
    fn from(raw: RawProfile) -> Self {
        Self {
            genres: raw.genres,
            actors: raw.actors,
            directors: raw.directors,
            studios: raw.studios.or(raw.studio).unwrap_or_default(),
            languages: raw.languages,
            keywords: raw.keywords.or(raw.tmdb_keywords).unwrap_or_default(),
            collections: raw.collections,
            tmdb_ids: raw.tmdb_ids,
        }
    }
}

/// Bump whenever the stored snapshot layout changes; older snapshots are rebuilt
pub const PROFILE_CACHE_VERSION: u32 = 3;

/// Identifies one stored profile: a set of users for one media type
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProfileKey {
    pub media_type: MediaType,
    pub users: String,
}

impl ProfileKey {
    /// Key for a group of users. Names are sanitized to `[a-z0-9_]`, de-duplicated
    /// and sorted, so the same group always maps to the same key.
    ///
    /// Returns `None` when no name survives sanitizing.
    pub fn for_users<S: AsRef<str>>(media_type: MediaType, users: &[S]) -> Option<Self> {
        let names: BTreeSet<String> = users
            .iter()
            .map(|user| sanitize(user.as_ref()))
            .filter(|name| !name.is_empty())
            .collect();

        if names.is_empty() {
            return None;
        }

        Some(Self {
            media_type,
            users: names.into_iter().collect::<Vec<_>>().join("_"),
        })
    }

    /// Rebuilds a key from its already-joined user part
    pub fn parse(media_type: MediaType, users: &str) -> Option<Self> {
        let users = sanitize(users);
        (!users.is_empty()).then_some(Self { media_type, users })
    }
}

impl Display for ProfileKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.media_type, self.users)
    }
}

fn sanitize(name: &str) -> String {
    name.trim()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect::<String>()
        .to_lowercase()
}

/// Stored profile plus what is needed to decide whether it is stale
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedProfile {
    pub version: u32,
    /// Size of the watch history the profile was built from
    pub watched_count: usize,
    pub updated_at: DateTime<Utc>,
    pub profile: UserProfile,
}

impl CachedProfile {
    pub fn new(watched_count: usize, profile: UserProfile) -> Self {
        Self {
            version: PROFILE_CACHE_VERSION,
            watched_count,
            updated_at: Utc::now(),
            profile,
        }
    }

    /// True when this snapshot was built by the current format from a history
    /// of exactly `watched_count` items
    pub fn is_current(&self, watched_count: usize) -> bool {
        self.version == PROFILE_CACHE_VERSION && self.watched_count == watched_count
    }
}

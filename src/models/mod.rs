use serde::{Deserialize, Serialize};
use std::fmt::Display;

pub mod breakdown;
pub mod content;
pub mod profile;
pub mod watch;
pub mod weighted_map;

pub use breakdown::{MatchDetail, MatchDetails, MatchKind, ScoreBreakdown};
pub use content::ContentCandidate;
pub use profile::{CachedProfile, ProfileKey, UserProfile, PROFILE_CACHE_VERSION};
pub use watch::WatchEvent;
pub use weighted_map::WeightedMap;

/// Number of top-billed cast members tracked per item
pub const TOP_CAST_COUNT: usize = 3;

/// Which library a profile or candidate belongs to.
///
/// Movies track directors, TV tracks studios. The two never mix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    #[serde(alias = "movies")]
    Movie,
    #[serde(alias = "show", alias = "shows")]
    Tv,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Movie => "movie",
            MediaType::Tv => "tv",
        }
    }
}

impl Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

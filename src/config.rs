use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

use crate::models::MediaType;
use crate::services::decay::{NegativeSignals, RatingMultipliers, RecencyDecay, StarMultipliers};
use crate::services::profile_builder::WatchWeighting;
use crate::services::recommendations::TierConfig;
use crate::services::scoring::ScoringOptions;
use crate::services::weights::WeightConfig;

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Redis connection URL; profiles are kept in memory when unset
    #[serde(default)]
    pub redis_url: Option<String>,

    /// Path to the JSON engine document
    #[serde(default)]
    pub engine_config_path: Option<String>,

    /// Profile snapshot expiry in seconds, `0` for none
    #[serde(default = "default_profile_cache_ttl")]
    pub profile_cache_ttl: u64,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_profile_cache_ttl() -> u64 {
    30 * 24 * 60 * 60
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }

    /// The engine document at `engine_config_path`, or the built-in defaults
    pub fn engine(&self) -> anyhow::Result<EngineConfig> {
        match &self.engine_config_path {
            Some(path) => EngineConfig::load(path),
            None => Ok(EngineConfig::default()),
        }
    }
}

/// Per-media-type ranking settings
#[derive(Debug, Clone, PartialEq)]
pub struct MediaSettings {
    pub weights: WeightConfig,
    /// Number of recommendations to return
    pub limit: usize,
    /// Use tiered random selection instead of a plain top-N
    pub randomize: bool,
    pub min_rating: f64,
    pub min_vote_count: u64,
    pub exclude_genres: Vec<String>,
}

impl MediaSettings {
    pub fn movie_defaults() -> Self {
        Self {
            weights: WeightConfig::default(),
            limit: 50,
            randomize: false,
            min_rating: 5.0,
            min_vote_count: 50,
            exclude_genres: Vec::new(),
        }
    }

    pub fn tv_defaults() -> Self {
        Self {
            limit: 20,
            min_rating: 0.0,
            min_vote_count: 0,
            ..Self::movie_defaults()
        }
    }
}

/// Scoring, decay and selection settings shared by the service
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "RawEngineConfig")]
pub struct EngineConfig {
    pub movie: MediaSettings,
    pub tv: MediaSettings,
    pub recency_decay: RecencyDecay,
    /// Star-scale overrides; the built-in ten-point table is used when absent
    pub rating_multipliers: Option<StarMultipliers>,
    pub negative_signals: NegativeSignals,
    pub scoring: ScoringOptions,
    pub tiers: TierConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        RawEngineConfig::default().into()
    }
}

impl EngineConfig {
    /// Reads and validates the engine document at `path`
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read engine config {}", path.display()))?;
        Self::from_json(&raw)
            .with_context(|| format!("Failed to parse engine config {}", path.display()))
    }

    pub fn from_json(raw: &str) -> anyhow::Result<Self> {
        let config: EngineConfig = serde_json::from_str(raw)?;
        config.validate();
        Ok(config)
    }

    /// Warns about weight sets that do not sum to one; never rejects
    pub fn validate(&self) {
        self.movie.weights.validate(MediaType::Movie);
        self.tv.weights.validate(MediaType::Tv);
    }

    pub fn settings(&self, media_type: MediaType) -> &MediaSettings {
        match media_type {
            MediaType::Movie => &self.movie,
            MediaType::Tv => &self.tv,
        }
    }

    pub fn rating_table(&self) -> RatingMultipliers {
        self.rating_multipliers
            .map(RatingMultipliers::from)
            .unwrap_or_default()
    }

    pub fn watch_weighting(&self) -> WatchWeighting {
        WatchWeighting {
            recency: self.recency_decay.clone(),
            ratings: self.rating_table(),
            negative_signals: self.negative_signals.clone(),
        }
    }
}

/// Media section as written; missing keys fall back to that media type's defaults
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawMediaSettings {
    weights: Option<WeightConfig>,
    limit: Option<usize>,
    randomize: Option<bool>,
    min_rating: Option<f64>,
    min_vote_count: Option<u64>,
    exclude_genres: Option<Vec<String>>,
}

impl RawMediaSettings {
    fn resolve(self, defaults: MediaSettings) -> MediaSettings {
        MediaSettings {
            weights: self.weights.unwrap_or(defaults.weights),
            limit: self.limit.unwrap_or(defaults.limit),
            randomize: self.randomize.unwrap_or(defaults.randomize),
            min_rating: self.min_rating.unwrap_or(defaults.min_rating),
            min_vote_count: self.min_vote_count.unwrap_or(defaults.min_vote_count),
            exclude_genres: self.exclude_genres.unwrap_or(defaults.exclude_genres),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawEngineConfig {
    #[serde(alias = "movies")]
    movie: RawMediaSettings,
    #[serde(alias = "shows")]
    tv: RawMediaSettings,
    recency_decay: RecencyDecay,
    rating_multipliers: Option<StarMultipliers>,
    negative_signals: NegativeSignals,
    scoring: ScoringOptions,
    tiers: TierConfig,
}

impl From<RawEngineConfig> for EngineConfig {
    fn from(raw: RawEngineConfig) -> Self {
        Self {
            movie: raw.movie.resolve(MediaSettings::movie_defaults()),
            tv: raw.tv.resolve(MediaSettings::tv_defaults()),
            recency_decay: raw.recency_decay,
            rating_multipliers: raw.rating_multipliers,
            negative_signals: raw.negative_signals,
            scoring: raw.scoring,
            tiers: raw.tiers,
        }
    }
}

use serde::{Deserialize, Serialize};
use std::fmt::Display;

use crate::models::{MediaType, UserProfile};

/// Allowed drift of a weight set from summing to one
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// One scoring component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Component {
    Genre,
    Director,
    Studio,
    Actor,
    Language,
    Keyword,
}

impl Component {
    pub const ALL: [Component; 6] = [
        Component::Genre,
        Component::Director,
        Component::Studio,
        Component::Actor,
        Component::Language,
        Component::Keyword,
    ];

    /// The five components that apply to a media type; movies score directors, TV studios
    pub fn for_media(media_type: MediaType) -> [Component; 5] {
        let creator = match media_type {
            MediaType::Movie => Component::Director,
            MediaType::Tv => Component::Studio,
        };
        [
            Component::Genre,
            creator,
            Component::Actor,
            Component::Language,
            Component::Keyword,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Component::Genre => "genre",
            Component::Director => "director",
            Component::Studio => "studio",
            Component::Actor => "actor",
            Component::Language => "language",
            Component::Keyword => "keyword",
        }
    }

    /// Whether `profile` holds any entry for this component
    pub fn has_profile_data(&self, profile: &UserProfile) -> bool {
        let map = match self {
            Component::Genre => &profile.genres,
            Component::Director => &profile.directors,
            Component::Studio => &profile.studios,
            Component::Actor => &profile.actors,
            Component::Language => &profile.languages,
            Component::Keyword => &profile.keywords,
        };
        !map.is_empty()
    }
}

impl Display for Component {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Configured component weights
///
/// Each key also accepts the older `<name>_weight` spelling; the short key wins
/// when both are given.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawWeightConfig")]
pub struct WeightConfig {
    pub genre: f64,
    pub director: f64,
    pub studio: f64,
    pub actor: f64,
    pub language: f64,
    pub keyword: f64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawWeightConfig {
    genre: Option<f64>,
    genre_weight: Option<f64>,
    director: Option<f64>,
    director_weight: Option<f64>,
    studio: Option<f64>,
    studio_weight: Option<f64>,
    actor: Option<f64>,
    actor_weight: Option<f64>,
    language: Option<f64>,
    language_weight: Option<f64>,
    keyword: Option<f64>,
    keyword_weight: Option<f64>,
}

impl From<RawWeightConfig> for WeightConfig {
    fn from(raw: RawWeightConfig) -> Self {
        let defaults = WeightConfig::default();
        Self {
            genre: raw.genre.or(raw.genre_weight).unwrap_or(defaults.genre),
            director: raw.director.or(raw.director_weight).unwrap_or(defaults.director),
            studio: raw.studio.or(raw.studio_weight).unwrap_or(defaults.studio),
            actor: raw.actor.or(raw.actor_weight).unwrap_or(defaults.actor),
            language: raw.language.or(raw.language_weight).unwrap_or(defaults.language),
            keyword: raw.keyword.or(raw.keyword_weight).unwrap_or(defaults.keyword),
        }
    }
}

impl Default for WeightConfig {
    fn default() -> Self {
        Self {
            genre: 0.25,
            director: 0.05,
            studio: 0.10,
            actor: 0.20,
            language: 0.0,
            keyword: 0.50,
        }
    }
}

impl WeightConfig {
    pub fn get(&self, component: Component) -> f64 {
        match component {
            Component::Genre => self.genre,
            Component::Director => self.director,
            Component::Studio => self.studio,
            Component::Actor => self.actor,
            Component::Language => self.language,
            Component::Keyword => self.keyword,
        }
    }

    /// Sum of the weights that apply to `media_type`
    pub fn sum_for(&self, media_type: MediaType) -> f64 {
        Component::for_media(media_type)
            .iter()
            .map(|c| self.get(*c))
            .sum()
    }

    /// Logs a warning when the applicable weights do not sum to one.
    ///
    /// Returns whether the set is balanced; an unbalanced set is still usable.
    pub fn validate(&self, media_type: MediaType) -> bool {
        let sum = self.sum_for(media_type);
        let balanced = (sum - 1.0).abs() <= WEIGHT_SUM_TOLERANCE;
        if !balanced {
            tracing::warn!(
                media_type = %media_type,
                sum,
                "Scoring weights do not sum to 1.0"
            );
        }
        balanced
    }
}

/// Per-profile weights after sparsity redistribution
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct EffectiveWeights {
    pub genre: f64,
    pub director: f64,
    pub studio: f64,
    pub actor: f64,
    pub language: f64,
    pub keyword: f64,
}

impl EffectiveWeights {
    pub fn get(&self, component: Component) -> f64 {
        match component {
            Component::Genre => self.genre,
            Component::Director => self.director,
            Component::Studio => self.studio,
            Component::Actor => self.actor,
            Component::Language => self.language,
            Component::Keyword => self.keyword,
        }
    }

    fn set(&mut self, component: Component, weight: f64) {
        let slot = match component {
            Component::Genre => &mut self.genre,
            Component::Director => &mut self.director,
            Component::Studio => &mut self.studio,
            Component::Actor => &mut self.actor,
            Component::Language => &mut self.language,
            Component::Keyword => &mut self.keyword,
        };
        *slot = weight;
    }
}

impl From<&WeightConfig> for EffectiveWeights {
    fn from(config: &WeightConfig) -> Self {
        let mut weights = EffectiveWeights::default();
        for component in Component::ALL {
            weights.set(component, config.get(component));
        }
        weights
    }
}

/// Moves the weight of components the profile has no data for onto the ones it does.
///
/// Populated components are scaled by `(used + unused) / used`; empty ones, and the
/// creator component that does not apply to `media_type`, drop to zero. When the
/// profile has no data for any weighted component the configured weights are
/// returned unchanged.
pub fn redistribute_weights(
    base: &WeightConfig,
    profile: &UserProfile,
    media_type: MediaType,
) -> EffectiveWeights {
    let components = Component::for_media(media_type);

    let (used, unused) = components.iter().fold((0.0, 0.0), |(used, unused), c| {
        if c.has_profile_data(profile) {
            (used + base.get(*c), unused)
        } else {
            (used, unused + base.get(*c))
        }
    });

    if used == 0.0 {
        return EffectiveWeights::from(base);
    }

    let multiplier = (used + unused) / used;
    let mut effective = EffectiveWeights::default();
    for component in components {
        if component.has_profile_data(profile) {
            effective.set(component, base.get(component) * multiplier);
        }
    }
    effective
}

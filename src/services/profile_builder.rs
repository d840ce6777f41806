use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::{MediaType, UserProfile, WatchEvent, TOP_CAST_COUNT};

use super::decay::{
    rating_multiplier, rewatch_multiplier, NegativeSignals, RatingMultipliers, RecencyDecay,
};

/// Errors that cause a single watch event to be skipped
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("Non-finite contribution weight for '{title}'")]
    NonFiniteWeight { title: String },
}

/// Turns a watch event into a signed contribution weight
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WatchWeighting {
    pub recency: RecencyDecay,
    pub ratings: RatingMultipliers,
    pub negative_signals: NegativeSignals,
}

impl WatchWeighting {
    /// `recency * rewatch * rating`, unless the event carries its own weight
    pub fn weight_at(&self, event: &WatchEvent, now: DateTime<Utc>) -> f64 {
        if let Some(weight) = event.weight {
            return weight;
        }

        let recency = event
            .viewed_at
            .map_or(1.0, |viewed_at| self.recency.multiplier_at(viewed_at, now));

        recency
            * rewatch_multiplier(event.view_count)
            * rating_multiplier(event.user_rating, &self.ratings, &self.negative_signals)
    }
}

/// Folds watch history into a [`UserProfile`]
pub struct ProfileBuilder {
    media_type: MediaType,
    weighting: WatchWeighting,
    now: DateTime<Utc>,
}

impl ProfileBuilder {
    pub fn new(media_type: MediaType, weighting: WatchWeighting) -> Self {
        Self {
            media_type,
            weighting,
            now: Utc::now(),
        }
    }

    /// Pins the clock used for recency decay
    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    /// Adds one watch event to `profile`.
    ///
    /// Returns `true` when the event was a negative signal. The item's TMDB id is
    /// recorded whatever the weight, so disliked items are still excluded later.
    pub fn apply_watch(
        &self,
        profile: &mut UserProfile,
        event: &WatchEvent,
    ) -> Result<bool, ProfileError> {
        let content = &event.content;

        if let Some(tmdb_id) = content.tmdb_id {
            profile.tmdb_ids.insert(tmdb_id);
        }

        let weight = self.weighting.weight_at(event, self.now);
        if !weight.is_finite() {
            return Err(ProfileError::NonFiniteWeight {
                title: content.display_title().to_string(),
            });
        }

        let cap = self.weighting.negative_signals.cap_penalty();

        for genre in non_empty(&content.genres) {
            profile
                .genres
                .apply_capped_weight(&genre.to_lowercase(), weight, cap);
        }

        for actor in non_empty(&content.cast).take(TOP_CAST_COUNT) {
            profile.actors.apply_capped_weight(actor, weight, cap);
        }

        match self.media_type {
            MediaType::Movie => {
                for director in non_empty(&content.directors) {
                    profile.directors.apply_capped_weight(director, weight, cap);
                }
                if let Some(collection_id) = content.collection_id {
                    profile
                        .collections
                        .apply_capped_weight(&collection_id.to_string(), weight, cap);
                }
            }
            MediaType::Tv => {
                for studio in non_empty(&content.studios) {
                    profile
                        .studios
                        .apply_capped_weight(&studio.to_lowercase(), weight, cap);
                }
            }
        }

        if let Some(language) = content.scoreable_language() {
            profile
                .languages
                .apply_capped_weight(&language.to_lowercase(), weight, cap);
        }

        for keyword in non_empty(&content.keywords) {
            profile
                .keywords
                .apply_capped_weight(&keyword.to_lowercase(), weight, cap);
        }

        Ok(weight < 0.0)
    }

    /// Builds a fresh profile from the whole history; failing events are logged and skipped
    pub fn build(&self, history: &[WatchEvent]) -> UserProfile {
        let mut profile = UserProfile::new();
        let mut negative = 0usize;
        let mut skipped = 0usize;

        for event in history {
            match self.apply_watch(&mut profile, event) {
                Ok(true) => negative += 1,
                Ok(false) => {}
                Err(e) => {
                    skipped += 1;
                    tracing::warn!(
                        title = %event.content.display_title(),
                        error = %e,
                        "Skipping watch event"
                    );
                }
            }
        }

        tracing::debug!(
            media_type = %self.media_type,
            events = history.len(),
            negative,
            skipped,
            "Built profile from watch history"
        );

        profile
    }
}

fn non_empty(values: &[String]) -> impl Iterator<Item = &str> {
    values.iter().map(|v| v.trim()).filter(|v| !v.is_empty())
}

use std::cell::RefCell;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{
    ContentCandidate, MatchDetail, MediaType, ScoreBreakdown, UserProfile, WeightedMap,
};

use super::fuzzy::{fuzzy_keyword_match, KeywordMatch};
use super::genre::normalize_genre;
use super::weights::{redistribute_weights, Component, EffectiveWeights, WeightConfig};

/// Share of a negative entry's relative size that becomes a penalty
pub const NEGATIVE_PENALTY_SCALE: f64 = 0.5;

const TFIDF_GENRE_PENALTY: f64 = 0.10;
const TFIDF_KEYWORD_PENALTY: f64 = 0.05;
const UNSEEN_GENRE_PENALTY: f64 = 0.05;
const UNSEEN_KEYWORD_PENALTY: f64 = 0.01;

const POPULARITY_DAMPENING_FACTOR: f64 = 0.03;
const POPULARITY_DAMPENING_CAP: f64 = 0.9;

/// Errors that abort a single scoring call
#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("Non-finite {category} weight for '{key}'")]
    NonFiniteWeight { category: Component, key: String },

    #[error("Score is not a finite number")]
    NonFiniteScore,
}

/// Scoring switches
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringOptions {
    /// sqrt normalization when true, linear capped at 1.0 otherwise
    pub normalize: bool,
    pub use_fuzzy_keywords: bool,
    /// Penalize genres and keywords that are rare or absent in the profile
    pub use_tfidf: bool,
    /// Fraction of the category maximum below which a match counts as rare
    pub tfidf_penalty_threshold: f64,
    pub use_popularity_dampening: bool,
    /// Vote count above which dampening starts
    pub popularity_threshold: u64,
}

impl Default for ScoringOptions {
    fn default() -> Self {
        Self {
            normalize: true,
            use_fuzzy_keywords: true,
            use_tfidf: false,
            tfidf_penalty_threshold: 0.15,
            use_popularity_dampening: false,
            popularity_threshold: 50_000,
        }
    }
}

/// Realized result of one component for one item, as seen by the lost-weight pass
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComponentOutcome {
    /// Effective weight after profile-sparsity redistribution
    pub weight: f64,
    /// Weighted score the component produced
    pub score: f64,
    /// Whether the component matched or was penalized for this item
    pub active: bool,
}

/// Hands the weight of components that did not participate for this item to
/// the ones that did.
///
/// Each active component receives a share of the lost weight proportional to its
/// own weight and converts it to score at its realized `score / weight` ratio.
/// Returns the extra score. Components with no weight are ignored entirely.
pub fn redistribute_lost_weight(outcomes: &[ComponentOutcome]) -> f64 {
    let weighted = || outcomes.iter().filter(|o| o.weight > 0.0);

    let lost: f64 = weighted().filter(|o| !o.active).map(|o| o.weight).sum();
    let total_active: f64 = weighted().filter(|o| o.active).map(|o| o.weight).sum();

    if lost <= 0.0 || total_active <= 0.0 {
        return 0.0;
    }

    weighted()
        .filter(|o| o.active)
        .map(|o| {
            let extra_weight = lost * (o.weight / total_active);
            extra_weight * (o.score / o.weight)
        })
        .sum()
}

/// Lookup table for one profile category
#[derive(Debug, Clone, Default)]
struct PreparedCategory {
    entries: WeightedMap,
    /// Normalization denominator, never zero
    max: f64,
}

impl PreparedCategory {
    fn new(entries: WeightedMap) -> Self {
        let max = entries.max_positive();
        Self { entries, max }
    }
}

/// TF-IDF rarity rule for one category
#[derive(Debug, Clone, Copy)]
struct Rarity {
    threshold: f64,
    rare_penalty: f64,
    unseen_penalty: f64,
}

#[derive(Debug, Clone, Copy)]
enum Aggregation {
    /// `1 - 1 / (1 + sum)`
    Diminishing,
    Average,
}

/// Positive contributions and penalties collected for one component
#[derive(Debug, Default)]
struct Tally {
    contributions: Vec<f64>,
    penalty: f64,
}

impl Tally {
    fn is_active(&self) -> bool {
        !self.contributions.is_empty() || self.penalty > 0.0
    }

    fn weighted(&self, aggregation: Aggregation, weight: f64) -> f64 {
        if !self.is_active() {
            return 0.0;
        }

        let sum: f64 = self.contributions.iter().sum();
        let ratio = match aggregation {
            Aggregation::Diminishing => 1.0 - 1.0 / (1.0 + sum),
            Aggregation::Average if self.contributions.is_empty() => 0.0,
            Aggregation::Average => sum / self.contributions.len() as f64,
        };

        (ratio - self.penalty).max(0.0) * weight
    }

    fn outcome(&self, weight: f64, score: f64) -> ComponentOutcome {
        ComponentOutcome {
            weight,
            score,
            active: self.is_active(),
        }
    }
}

/// Scores candidates against one prepared profile.
///
/// Preparation (lowercased tables, category maxima, effective weights) happens once
/// in [`SimilarityScorer::new`], so a scorer should be reused across a batch.
/// Fuzzy keyword lookups are memoized per scorer.
pub struct SimilarityScorer {
    media_type: MediaType,
    options: ScoringOptions,
    weights: EffectiveWeights,
    profile_is_empty: bool,
    genres: PreparedCategory,
    creators: PreparedCategory,
    actors: PreparedCategory,
    languages: PreparedCategory,
    keywords: PreparedCategory,
    fuzzy_cache: RefCell<HashMap<String, Option<KeywordMatch>>>,
}

impl SimilarityScorer {
    pub fn new(
        profile: &UserProfile,
        media_type: MediaType,
        weights: &WeightConfig,
        options: ScoringOptions,
    ) -> Self {
        Self {
            media_type,
            options,
            weights: redistribute_weights(weights, profile, media_type),
            profile_is_empty: profile.is_empty(),
            genres: PreparedCategory::new(profile.genres.rekeyed(normalize_genre)),
            creators: PreparedCategory::new(profile.creators(media_type).to_lowercase_keys()),
            actors: PreparedCategory::new(profile.actors.to_lowercase_keys()),
            languages: PreparedCategory::new(profile.languages.to_lowercase_keys()),
            keywords: PreparedCategory::new(profile.keywords.to_lowercase_keys()),
            fuzzy_cache: RefCell::new(HashMap::new()),
        }
    }

    pub fn media_type(&self) -> MediaType {
        self.media_type
    }

    /// Similarity of `content` to the profile, in `[0, 1]`, with its breakdown.
    ///
    /// Never fails: an internal error is logged and yields `0.0` together with
    /// whatever breakdown was built before the failure.
    pub fn score(&self, content: &ContentCandidate) -> (f64, ScoreBreakdown) {
        let mut breakdown = ScoreBreakdown::default();

        if content.is_empty() || self.profile_is_empty {
            return (0.0, breakdown);
        }

        match self.try_score(content, &mut breakdown) {
            Ok(score) => (score, breakdown),
            Err(e) => {
                tracing::warn!(
                    title = %content.display_title(),
                    error = %e,
                    "Failed to calculate similarity score"
                );
                (0.0, breakdown)
            }
        }
    }

    fn try_score(
        &self,
        content: &ContentCandidate,
        breakdown: &mut ScoreBreakdown,
    ) -> Result<f64, ScoringError> {
        let mut outcomes = Vec::with_capacity(5);

        let genres = self.tally_genres(&content.genres, &mut breakdown.details.genres)?;
        breakdown.genre_score = genres.weighted(Aggregation::Diminishing, self.weights.genre);
        outcomes.push(genres.outcome(self.weights.genre, breakdown.genre_score));

        match self.media_type {
            MediaType::Movie => {
                let directors = self.tally_names(
                    Component::Director,
                    &content.directors,
                    &self.creators,
                    &mut breakdown.details.directors,
                )?;
                breakdown.director_score =
                    directors.weighted(Aggregation::Average, self.weights.director);
                outcomes.push(directors.outcome(self.weights.director, breakdown.director_score));
            }
            MediaType::Tv => {
                let mut studio_details = Vec::new();
                let studios = self.tally_names(
                    Component::Studio,
                    &content.studios,
                    &self.creators,
                    &mut studio_details,
                )?;
                breakdown.details.studio = studio_details.pop();
                breakdown.studio_score =
                    studios.weighted(Aggregation::Average, self.weights.studio);
                outcomes.push(studios.outcome(self.weights.studio, breakdown.studio_score));
            }
        }

        let actors = self.tally_names(
            Component::Actor,
            &content.cast,
            &self.actors,
            &mut breakdown.details.actors,
        )?;
        breakdown.actor_score = actors.weighted(Aggregation::Diminishing, self.weights.actor);
        outcomes.push(actors.outcome(self.weights.actor, breakdown.actor_score));

        if let Some(language) = content.scoreable_language() {
            let count =
                self.lookup(&self.languages, Component::Language, &language.to_lowercase())?;
            if count > 0.0 {
                let normalized = self.normalized(count, self.languages.max);
                breakdown.language_score = normalized * self.weights.language;
                breakdown.details.language = Some(MatchDetail::exact(language, count, normalized));
            }
        }
        outcomes.push(ComponentOutcome {
            weight: self.weights.language,
            score: breakdown.language_score,
            active: breakdown.language_score > 0.0,
        });

        let keywords = self.tally_keywords(&content.keywords, &mut breakdown.details.keywords)?;
        breakdown.keyword_score = keywords.weighted(Aggregation::Diminishing, self.weights.keyword);
        outcomes.push(keywords.outcome(self.weights.keyword, breakdown.keyword_score));

        breakdown.redistributed_bonus = redistribute_lost_weight(&outcomes);
        let total: f64 =
            outcomes.iter().map(|o| o.score).sum::<f64>() + breakdown.redistributed_bonus;

        if !total.is_finite() {
            return Err(ScoringError::NonFiniteScore);
        }

        let mut score = total.min(1.0);

        if let Some(factor) = self.popularity_dampening(content.vote_count) {
            score *= factor;
            breakdown.popularity_dampening = Some(factor);
        }

        Ok(score)
    }

    fn tally_genres(
        &self,
        genres: &[String],
        details: &mut Vec<MatchDetail>,
    ) -> Result<Tally, ScoringError> {
        let rarity = self.rarity(&self.genres, TFIDF_GENRE_PENALTY, UNSEEN_GENRE_PENALTY);
        let mut tally = Tally::default();

        for genre in genres {
            let count = self.lookup(&self.genres, Component::Genre, &normalize_genre(genre))?;
            self.record(genre, count, None, &self.genres, rarity, &mut tally, details);
        }

        Ok(tally)
    }

    /// Exact case-insensitive matching used for directors, studios and cast
    fn tally_names(
        &self,
        category: Component,
        names: &[String],
        table: &PreparedCategory,
        details: &mut Vec<MatchDetail>,
    ) -> Result<Tally, ScoringError> {
        let mut tally = Tally::default();

        for name in names {
            let count = self.lookup(table, category, &name.to_lowercase())?;
            self.record(name, count, None, table, None, &mut tally, details);
        }

        Ok(tally)
    }

    fn tally_keywords(
        &self,
        keywords: &[String],
        details: &mut Vec<MatchDetail>,
    ) -> Result<Tally, ScoringError> {
        let rarity = self.rarity(&self.keywords, TFIDF_KEYWORD_PENALTY, UNSEEN_KEYWORD_PENALTY);
        let mut tally = Tally::default();

        for keyword in keywords {
            let lowered = keyword.to_lowercase();
            let mut count = self.lookup(&self.keywords, Component::Keyword, &lowered)?;
            let mut matched = None;

            if count == 0.0 && self.options.use_fuzzy_keywords {
                if let Some(hit) = self.fuzzy_lookup(&lowered).filter(|hit| !hit.exact) {
                    count = hit.score;
                    matched = Some(hit.matched);
                }
            }

            self.record(
                keyword,
                count,
                matched.as_deref(),
                &self.keywords,
                rarity,
                &mut tally,
                details,
            );
        }

        Ok(tally)
    }

    /// Classifies one looked-up count as a contribution, a penalty, or nothing
    #[allow(clippy::too_many_arguments)]
    fn record(
        &self,
        value: &str,
        count: f64,
        fuzzy_from: Option<&str>,
        table: &PreparedCategory,
        rarity: Option<Rarity>,
        tally: &mut Tally,
        details: &mut Vec<MatchDetail>,
    ) {
        if count > 0.0 {
            if let Some(rarity) = rarity.filter(|r| count < r.threshold) {
                let penalty = (1.0 - count / rarity.threshold) * rarity.rare_penalty;
                tally.penalty += penalty;
                details.push(MatchDetail::rare(value, count, rarity.threshold, penalty));
                return;
            }

            let normalized = self.normalized(count, table.max);
            tally.contributions.push(normalized);
            details.push(match fuzzy_from {
                Some(matched) => MatchDetail::fuzzy(value, matched, count, normalized),
                None => MatchDetail::exact(value, count, normalized),
            });
        } else if count < 0.0 {
            let penalty = count.abs() / table.max * NEGATIVE_PENALTY_SCALE;
            tally.penalty += penalty;
            details.push(MatchDetail::negative(value, count, penalty));
        } else if let Some(rarity) = rarity {
            tally.penalty += rarity.unseen_penalty;
            details.push(MatchDetail::unseen(value, rarity.unseen_penalty));
        }
    }

    fn lookup(
        &self,
        table: &PreparedCategory,
        category: Component,
        key: &str,
    ) -> Result<f64, ScoringError> {
        let count = table.entries.get_or_default(key);
        if !count.is_finite() {
            return Err(ScoringError::NonFiniteWeight {
                category,
                key: key.to_string(),
            });
        }
        Ok(count)
    }

    fn fuzzy_lookup(&self, keyword: &str) -> Option<KeywordMatch> {
        if let Some(cached) = self.fuzzy_cache.borrow().get(keyword) {
            return cached.clone();
        }

        let result = fuzzy_keyword_match(keyword, &self.keywords.entries);
        self.fuzzy_cache
            .borrow_mut()
            .insert(keyword.to_string(), result.clone());
        result
    }

    fn normalized(&self, count: f64, max: f64) -> f64 {
        if self.options.normalize {
            (count / max).sqrt()
        } else {
            (count / max).min(1.0)
        }
    }

    fn rarity(
        &self,
        table: &PreparedCategory,
        rare_penalty: f64,
        unseen_penalty: f64,
    ) -> Option<Rarity> {
        self.options.use_tfidf.then(|| Rarity {
            threshold: table.max * self.options.tfidf_penalty_threshold,
            rare_penalty,
            unseen_penalty,
        })
    }

    /// `max(0.9, 1 - 0.03 * log10(votes / threshold))` for items above the threshold
    fn popularity_dampening(&self, vote_count: Option<u64>) -> Option<f64> {
        if !self.options.use_popularity_dampening || self.options.popularity_threshold == 0 {
            return None;
        }

        let votes = vote_count.unwrap_or(0);
        if votes <= self.options.popularity_threshold {
            return None;
        }

        let excess = votes as f64 / self.options.popularity_threshold as f64;
        Some((1.0 - excess.log10() * POPULARITY_DAMPENING_FACTOR).max(POPULARITY_DAMPENING_CAP))
    }
}

/// One-off scoring without keeping a prepared scorer around
pub fn calculate_similarity(
    content: &ContentCandidate,
    profile: &UserProfile,
    media_type: MediaType,
    weights: Option<&WeightConfig>,
    options: &ScoringOptions,
) -> (f64, ScoreBreakdown) {
    let default_weights = WeightConfig::default();
    let weights = weights.unwrap_or(&default_weights);
    SimilarityScorer::new(profile, media_type, weights, options.clone()).score(content)
}

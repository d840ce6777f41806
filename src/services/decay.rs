use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Highest rating on the Plex scale
pub const MAX_RATING: usize = 10;

/// Default rating at or below which a watch counts as a dislike
pub const DEFAULT_NEGATIVE_THRESHOLD: u8 = 3;

/// Contribution multipliers for ratings 0-3 when negative signals are on
const NEGATIVE_MULTIPLIERS: [f64; 4] = [-1.0, -0.8, -0.5, -0.3];

/// Multiplier for ratings under a raised threshold that have no table entry
const FALLBACK_NEGATIVE_MULTIPLIER: f64 = -0.3;

/// Time-since-watch decay buckets
///
/// Each bucket includes its upper day count, so a watch exactly 30 days ago
/// still gets `days_0_30`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecencyDecay {
    pub enabled: bool,
    pub days_0_30: f64,
    pub days_31_90: f64,
    pub days_91_180: f64,
    pub days_181_365: f64,
    pub days_365_plus: f64,
}

impl Default for RecencyDecay {
    fn default() -> Self {
        Self {
            enabled: true,
            days_0_30: 1.0,
            days_31_90: 0.75,
            days_91_180: 0.5,
            days_181_365: 0.25,
            days_365_plus: 0.10,
        }
    }
}

impl RecencyDecay {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    /// Bucket lookup for a watch `days_ago` days in the past
    pub fn for_days(&self, days_ago: i64) -> f64 {
        if !self.enabled {
            return 1.0;
        }

        match days_ago {
            d if d <= 30 => self.days_0_30,
            d if d <= 90 => self.days_31_90,
            d if d <= 180 => self.days_91_180,
            d if d <= 365 => self.days_181_365,
            _ => self.days_365_plus,
        }
    }

    /// Multiplier for a watch at `viewed_at` (unix seconds) as seen from `now`
    ///
    /// Timestamps chrono cannot represent are treated as undecayed.
    pub fn multiplier_at(&self, viewed_at: i64, now: DateTime<Utc>) -> f64 {
        if !self.enabled {
            return 1.0;
        }

        match DateTime::<Utc>::from_timestamp(viewed_at, 0) {
            Some(viewed) => self.for_days((now - viewed).num_days()),
            None => 1.0,
        }
    }

    pub fn multiplier(&self, viewed_at: i64) -> f64 {
        self.multiplier_at(viewed_at, Utc::now())
    }
}

/// Recency multiplier for a watch at `viewed_at` unix seconds, relative to now
pub fn recency_multiplier(viewed_at: i64, config: &RecencyDecay) -> f64 {
    config.multiplier(viewed_at)
}

/// `log2(views) + 1`, so every doubling of views adds exactly one.
///
/// Zero, one, or an unknown count all mean a single watch.
pub fn rewatch_multiplier(view_count: Option<u32>) -> f64 {
    match view_count {
        Some(n) if n > 1 => f64::from(n).log2() + 1.0,
        _ => 1.0,
    }
}

/// Five-star rating multipliers as written in the engine config
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StarMultipliers {
    pub star_1: f64,
    pub star_2: f64,
    pub star_3: f64,
    pub star_4: f64,
    pub star_5: f64,
}

impl Default for StarMultipliers {
    fn default() -> Self {
        Self {
            star_1: 0.2,
            star_2: 0.4,
            star_3: 1.0,
            star_4: 1.7,
            star_5: 2.5,
        }
    }
}

/// Positive contribution multiplier for each rating on the 0-10 scale
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatingMultipliers([f64; MAX_RATING + 1]);

impl Default for RatingMultipliers {
    fn default() -> Self {
        Self([0.1, 0.2, 0.4, 0.6, 0.8, 1.0, 1.2, 1.4, 1.7, 2.0, 2.5])
    }
}

impl From<StarMultipliers> for RatingMultipliers {
    /// Spreads five star values over the ten-point scale, interpolating halfway
    /// between neighbouring stars for the even ratings.
    fn from(stars: StarMultipliers) -> Self {
        let StarMultipliers {
            star_1: s1,
            star_2: s2,
            star_3: s3,
            star_4: s4,
            star_5: s5,
        } = stars;

        Self([
            0.1,
            s1,
            s1 + (s2 - s1) * 0.5,
            s2,
            s2 + (s3 - s2) * 0.5,
            s3,
            s3 + (s4 - s3) * 0.5,
            s4,
            s4 + (s5 - s4) * 0.5,
            s5 - (s5 - s4) * 0.2,
            s5,
        ])
    }
}

impl RatingMultipliers {
    pub fn for_rating(&self, rating: usize) -> f64 {
        self.0[rating.min(MAX_RATING)]
    }
}

/// Rounds a user rating onto the integer 0-10 scale
pub fn rating_index(rating: f64) -> Option<usize> {
    if !rating.is_finite() {
        return None;
    }
    Some(rating.round().clamp(0.0, MAX_RATING as f64) as usize)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BadRatings {
    pub enabled: bool,
    /// Ratings at or below this value are dislikes
    pub threshold: u8,
    /// Fraction of a positive entry that survives a single dislike
    pub cap_penalty: f64,
}

impl Default for BadRatings {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold: DEFAULT_NEGATIVE_THRESHOLD,
            cap_penalty: crate::models::weighted_map::DEFAULT_CAP_PENALTY,
        }
    }
}

/// Controls whether low ratings subtract from a profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NegativeSignals {
    pub enabled: bool,
    pub bad_ratings: BadRatings,
}

impl Default for NegativeSignals {
    fn default() -> Self {
        Self {
            enabled: true,
            bad_ratings: BadRatings::default(),
        }
    }
}

impl NegativeSignals {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    /// True when a rating on the 0-10 scale should count as a dislike
    pub fn is_negative(&self, rating: usize) -> bool {
        self.enabled
            && self.bad_ratings.enabled
            && rating <= usize::from(self.bad_ratings.threshold)
    }

    pub fn cap_penalty(&self) -> f64 {
        self.bad_ratings.cap_penalty
    }
}

/// Negative contribution multiplier for a disliked rating
pub fn negative_multiplier(rating: usize) -> f64 {
    NEGATIVE_MULTIPLIERS
        .get(rating)
        .copied()
        .unwrap_or(FALLBACK_NEGATIVE_MULTIPLIER)
}

/// Signed multiplier for a user rating; an unrated watch counts as neutral (1.0)
pub fn rating_multiplier(
    rating: Option<f64>,
    table: &RatingMultipliers,
    negative: &NegativeSignals,
) -> f64 {
    match rating.and_then(rating_index) {
        Some(index) if negative.is_negative(index) => negative_multiplier(index),
        Some(index) => table.for_rating(index),
        None => 1.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn days_ago(now: DateTime<Utc>, days: i64) -> i64 {
        (now - Duration::days(days)).timestamp()
    }

    #[test]
    fn test_recency_buckets() {
        let now = Utc::now();
        let config = RecencyDecay::default();

        assert_eq!(config.multiplier_at(days_ago(now, 15), now), 1.0);
        assert_eq!(config.multiplier_at(days_ago(now, 60), now), 0.75);
        assert_eq!(config.multiplier_at(days_ago(now, 120), now), 0.5);
        assert_eq!(config.multiplier_at(days_ago(now, 300), now), 0.25);
        assert_eq!(config.multiplier_at(days_ago(now, 400), now), 0.10);
    }

    #[test]
    fn test_recency_against_wall_clock() {
        let now = Utc::now();
        let config = RecencyDecay::default();
        assert_eq!(recency_multiplier(days_ago(now, 15), &config), 1.0);
        assert_eq!(recency_multiplier(days_ago(now, 400), &config), 0.10);
    }

    #[test]
    fn test_bucket_upper_bounds_are_inclusive() {
        let config = RecencyDecay::default();
        assert_eq!(config.for_days(30), 1.0);
        assert_eq!(config.for_days(31), 0.75);
        assert_eq!(config.for_days(90), 0.75);
        assert_eq!(config.for_days(180), 0.5);
        assert_eq!(config.for_days(365), 0.25);
        assert_eq!(config.for_days(366), 0.10);
    }

    #[test]
    fn test_future_timestamp_counts_as_recent() {
        let now = Utc::now();
        let config = RecencyDecay::default();
        assert_eq!(config.multiplier_at(days_ago(now, -3), now), 1.0);
    }

    #[test]
    fn test_disabled_recency_is_neutral() {
        let now = Utc::now();
        assert_eq!(
            RecencyDecay::disabled().multiplier_at(days_ago(now, 1000), now),
            1.0
        );
    }

    #[test]
    fn test_buckets_are_overridable() {
        let config: RecencyDecay =
            serde_json::from_str(r#"{"days_365_plus": 0.5, "days_0_30": 0.9}"#).unwrap();
        assert!(config.enabled);
        assert_eq!(config.for_days(10), 0.9);
        assert_eq!(config.for_days(45), 0.75);
        assert_eq!(config.for_days(500), 0.5);
    }

    #[test]
    fn test_rewatch_single_view_is_neutral() {
        assert_eq!(rewatch_multiplier(None), 1.0);
        assert_eq!(rewatch_multiplier(Some(0)), 1.0);
        assert_eq!(rewatch_multiplier(Some(1)), 1.0);
    }

    #[test]
    fn test_rewatch_doubling_adds_one() {
        assert_eq!(rewatch_multiplier(Some(2)), 2.0);
        assert_eq!(rewatch_multiplier(Some(4)), 3.0);
        assert_eq!(rewatch_multiplier(Some(8)), 4.0);

        let mut n = 1u32;
        while n <= 1 << 15 {
            let gain = rewatch_multiplier(Some(2 * n)) - rewatch_multiplier(Some(n));
            assert!((gain - 1.0).abs() < 1e-12, "doubling from {n} gained {gain}");
            n *= 2;
        }
    }

    #[test]
    fn test_default_rating_table() {
        let table = RatingMultipliers::default();
        assert_eq!(table.for_rating(0), 0.1);
        assert_eq!(table.for_rating(5), 1.0);
        assert_eq!(table.for_rating(8), 1.7);
        assert_eq!(table.for_rating(10), 2.5);
        assert_eq!(table.for_rating(42), 2.5);
    }

    #[test]
    fn test_star_table_interpolates() {
        let table = RatingMultipliers::from(StarMultipliers::default());
        assert_eq!(table.for_rating(1), 0.2);
        assert!((table.for_rating(2) - 0.3).abs() < 1e-12);
        assert_eq!(table.for_rating(5), 1.0);
        assert!((table.for_rating(8) - 2.1).abs() < 1e-12);
        assert!((table.for_rating(9) - 2.34).abs() < 1e-12);
        assert_eq!(table.for_rating(10), 2.5);
    }

    #[test]
    fn test_rating_index_rounds_and_clamps() {
        assert_eq!(rating_index(7.6), Some(8));
        assert_eq!(rating_index(-2.0), Some(0));
        assert_eq!(rating_index(14.0), Some(10));
        assert_eq!(rating_index(f64::NAN), None);
    }

    #[test]
    fn test_low_rating_becomes_negative() {
        let table = RatingMultipliers::default();
        let negative = NegativeSignals::default();

        assert_eq!(rating_multiplier(Some(0.0), &table, &negative), -1.0);
        assert_eq!(rating_multiplier(Some(1.0), &table, &negative), -0.8);
        assert_eq!(rating_multiplier(Some(2.0), &table, &negative), -0.5);
        assert_eq!(rating_multiplier(Some(3.0), &table, &negative), -0.3);
        assert_eq!(rating_multiplier(Some(4.0), &table, &negative), 0.8);
        assert_eq!(rating_multiplier(None, &table, &negative), 1.0);
    }

    #[test]
    fn test_raised_threshold_uses_fallback_multiplier() {
        let mut negative = NegativeSignals::default();
        negative.bad_ratings.threshold = 5;
        assert_eq!(
            rating_multiplier(Some(5.0), &RatingMultipliers::default(), &negative),
            -0.3
        );
    }

    #[test]
    fn test_disabled_negative_signals_use_positive_table() {
        let table = RatingMultipliers::default();
        assert_eq!(
            rating_multiplier(Some(1.0), &table, &NegativeSignals::disabled()),
            0.2
        );

        let mut bad_ratings_off = NegativeSignals::default();
        bad_ratings_off.bad_ratings.enabled = false;
        assert_eq!(rating_multiplier(Some(0.0), &table, &bad_ratings_off), 0.1);
    }
}

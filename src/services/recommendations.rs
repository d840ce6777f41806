use std::collections::BTreeSet;
use std::ops::Range;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::MediaSettings;
use crate::models::{ContentCandidate, ScoreBreakdown};

use super::scoring::SimilarityScorer;

/// Share of the ranked list that forms the safe pool
const SAFE_POOL_SHARE: f64 = 0.20;
/// Ranked-list share at which the diverse pool ends
const DIVERSE_POOL_END: f64 = 0.60;

/// How a randomized selection divides its slots
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TierConfig {
    pub safe: f64,
    pub diverse: f64,
    pub wildcard: f64,
}

impl Default for TierConfig {
    fn default() -> Self {
        Self {
            safe: 0.6,
            diverse: 0.3,
            wildcard: 0.1,
        }
    }
}

/// Quality and genre gates applied before scoring
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandidateFilters {
    pub min_rating: f64,
    pub min_vote_count: u64,
    pub exclude_genres: Vec<String>,
}

impl From<&MediaSettings> for CandidateFilters {
    fn from(settings: &MediaSettings) -> Self {
        Self {
            min_rating: settings.min_rating,
            min_vote_count: settings.min_vote_count,
            exclude_genres: settings
                .exclude_genres
                .iter()
                .map(|g| g.trim().to_lowercase())
                .collect(),
        }
    }
}

impl CandidateFilters {
    fn excludes_genre(&self, content: &ContentCandidate) -> bool {
        content.genres.iter().any(|genre| {
            self.exclude_genres
                .iter()
                .any(|excluded| excluded.eq_ignore_ascii_case(genre.trim()))
        })
    }

    /// Missing rating or vote count counts as zero
    fn below_quality(&self, content: &ContentCandidate) -> bool {
        content.rating.unwrap_or(0.0) < self.min_rating
            || content.vote_count.unwrap_or(0) < self.min_vote_count
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredCandidate {
    pub content: ContentCandidate,
    pub score: f64,
    pub breakdown: ScoreBreakdown,
}

/// Scored candidates, best first, plus what the filters removed
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RankedCandidates {
    pub ranked: Vec<ScoredCandidate>,
    pub excluded_watched: usize,
    pub excluded_genre: usize,
    pub below_quality: usize,
}

/// How many ranked candidates to return and how to pick them
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Selection {
    pub limit: usize,
    pub randomize: bool,
    pub tiers: TierConfig,
}

/// Filters and scores `candidates` one after another, then sorts them by score.
///
/// Watched items (by TMDB id) are dropped first, then excluded genres, then
/// items under the quality bar. Equal scores keep their input order.
pub fn rank_candidates(
    scorer: &SimilarityScorer,
    candidates: Vec<ContentCandidate>,
    filters: &CandidateFilters,
    watched_ids: &BTreeSet<u64>,
) -> RankedCandidates {
    let total = candidates.len();
    let mut result = RankedCandidates::default();

    for (index, content) in candidates.into_iter().enumerate() {
        if content.tmdb_id.is_some_and(|id| watched_ids.contains(&id)) {
            result.excluded_watched += 1;
        } else if filters.excludes_genre(&content) {
            result.excluded_genre += 1;
        } else if filters.below_quality(&content) {
            result.below_quality += 1;
        } else {
            let (score, breakdown) = scorer.score(&content);
            result.ranked.push(ScoredCandidate {
                content,
                score,
                breakdown,
            });
        }

        if (index + 1) % 100 == 0 {
            tracing::debug!(processed = index + 1, total, "Scoring candidates");
        }
    }

    result.ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
    result
}

/// Picks up to `limit` items from a best-first list, mixing sure bets with
/// lower-ranked discoveries.
///
/// The top fifth of the list is the safe pool, the next two fifths the diverse
/// pool, and the rest the wildcard pool. Safe picks come from the top, diverse and
/// wildcard picks are sampled, and unused slots are refilled from the safe pool.
/// The result stays in score order.
pub fn select_tiered<R: Rng + ?Sized>(
    scored: Vec<ScoredCandidate>,
    limit: usize,
    tiers: &TierConfig,
    rng: &mut R,
) -> Vec<ScoredCandidate> {
    let total = scored.len();
    if limit >= total {
        return scored;
    }
    if limit == 0 {
        return Vec::new();
    }

    let slots = |share: f64| ((limit as f64 * share) as usize).max(1);
    let safe_count = slots(tiers.safe);

    let safe_end = ((total as f64 * SAFE_POOL_SHARE) as usize).max(1);
    let diverse_end = ((total as f64 * DIVERSE_POOL_END) as usize)
        .max(safe_end + 1)
        .min(total);

    let mut picked: Vec<usize> = (0..safe_count.min(safe_end)).collect();
    picked.extend(sample_range(rng, safe_end..diverse_end, slots(tiers.diverse)));
    picked.extend(sample_range(rng, diverse_end..total, slots(tiers.wildcard)));

    let remaining = limit.saturating_sub(picked.len());
    if remaining > 0 && safe_end > safe_count {
        picked.extend(safe_count..(safe_count + remaining).min(safe_end));
    }

    // indices into a best-first list, so ascending order is score order
    picked.sort_unstable();
    picked.dedup();
    picked.truncate(limit);

    let mut pool: Vec<Option<ScoredCandidate>> = scored.into_iter().map(Some).collect();
    picked
        .into_iter()
        .filter_map(|index| pool[index].take())
        .collect()
}

fn sample_range<R: Rng + ?Sized>(rng: &mut R, range: Range<usize>, amount: usize) -> Vec<usize> {
    let len = range.len();
    if amount >= len {
        return range.collect();
    }

    rand::seq::index::sample(rng, len, amount)
        .into_iter()
        .map(|offset| range.start + offset)
        .collect()
}

/// Ranks candidates and trims the list to the requested selection
pub fn recommend<R: Rng + ?Sized>(
    scorer: &SimilarityScorer,
    candidates: Vec<ContentCandidate>,
    filters: &CandidateFilters,
    watched_ids: &BTreeSet<u64>,
    selection: &Selection,
    rng: &mut R,
) -> RankedCandidates {
    let mut result = rank_candidates(scorer, candidates, filters, watched_ids);

    result.ranked = if selection.randomize {
        select_tiered(result.ranked, selection.limit, &selection.tiers, rng)
    } else {
        result.ranked.truncate(selection.limit);
        result.ranked
    };

    for pick in &result.ranked {
        tracing::debug!(
            title = %pick.content.display_title(),
            score = pick.score,
            breakdown = %pick.breakdown,
            "Recommended"
        );
    }

    tracing::info!(
        media_type = %scorer.media_type(),
        recommended = result.ranked.len(),
        excluded_watched = result.excluded_watched,
        excluded_genre = result.excluded_genre,
        below_quality = result.below_quality,
        "Ranked candidates"
    );

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MediaType, UserProfile, WeightedMap};
    use crate::services::scoring::ScoringOptions;
    use crate::services::weights::WeightConfig;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn candidate(title: &str, tmdb_id: u64, genres: &[&str]) -> ContentCandidate {
        ContentCandidate {
            title: Some(title.to_string()),
            tmdb_id: Some(tmdb_id),
            genres: genres.iter().map(|g| g.to_string()).collect(),
            rating: Some(7.0),
            vote_count: Some(1_000),
            ..Default::default()
        }
    }

    fn scorer() -> SimilarityScorer {
        let profile = UserProfile {
            genres: [("action", 5.0), ("comedy", 2.0)]
                .into_iter()
                .collect::<WeightedMap>(),
            ..Default::default()
        };
        SimilarityScorer::new(
            &profile,
            MediaType::Movie,
            &WeightConfig::default(),
            ScoringOptions::default(),
        )
    }

    fn scored_list(n: usize) -> Vec<ScoredCandidate> {
        (0..n)
            .map(|i| ScoredCandidate {
                content: candidate(&format!("Item {i}"), i as u64, &[]),
                score: 1.0 - i as f64 / n as f64,
                breakdown: ScoreBreakdown::default(),
            })
            .collect()
    }

    #[test]
    fn test_rank_sorts_by_score_descending() {
        let candidates = vec![
            candidate("Comedy Only", 1, &["Comedy"]),
            candidate("Action Comedy", 2, &["Action", "Comedy"]),
            candidate("Western", 3, &["Western"]),
        ];

        let result = rank_candidates(
            &scorer(),
            candidates,
            &CandidateFilters::default(),
            &BTreeSet::new(),
        );

        let titles: Vec<&str> = result.ranked.iter().map(|c| c.content.display_title()).collect();
        assert_eq!(titles, vec!["Action Comedy", "Comedy Only", "Western"]);
        assert_eq!(result.ranked[2].score, 0.0);
    }

    #[test]
    fn test_rank_applies_filters_in_order() {
        let mut low_votes = candidate("Obscure", 4, &["Action"]);
        low_votes.vote_count = Some(3);
        let mut unrated = candidate("Unrated", 5, &["Action"]);
        unrated.rating = None;

        let candidates = vec![
            candidate("Seen It", 1, &["Action"]),
            candidate("Scary", 2, &["HORROR"]),
            candidate("Fresh", 3, &["Action"]),
            low_votes,
            unrated,
        ];
        let filters = CandidateFilters::from(&MediaSettings {
            exclude_genres: vec!["Horror".to_string()],
            ..MediaSettings::movie_defaults()
        });
        let watched = BTreeSet::from([1, 2]);

        let result = rank_candidates(&scorer(), candidates, &filters, &watched);

        assert_eq!(result.excluded_watched, 2);
        assert_eq!(result.excluded_genre, 0);
        assert_eq!(result.below_quality, 2);
        assert_eq!(result.ranked.len(), 1);
        assert_eq!(result.ranked[0].content.display_title(), "Fresh");
    }

    #[test]
    fn test_excluded_genre_is_case_insensitive() {
        let filters = CandidateFilters {
            exclude_genres: vec!["horror".to_string()],
            ..Default::default()
        };

        let result = rank_candidates(
            &scorer(),
            vec![candidate("Scary", 9, &["Horror"]), candidate("Fun", 10, &["Comedy"])],
            &filters,
            &BTreeSet::new(),
        );

        assert_eq!(result.excluded_genre, 1);
        assert_eq!(result.ranked.len(), 1);
    }

    #[test]
    fn test_select_returns_everything_when_limit_covers_list() {
        let mut rng = StdRng::seed_from_u64(7);
        let selected = select_tiered(scored_list(5), 5, &TierConfig::default(), &mut rng);
        assert_eq!(selected.len(), 5);
    }

    #[test]
    fn test_select_mixes_tiers_and_keeps_score_order() {
        let mut rng = StdRng::seed_from_u64(42);
        let selected = select_tiered(scored_list(100), 10, &TierConfig::default(), &mut rng);

        assert_eq!(selected.len(), 10);
        assert!(selected.windows(2).all(|w| w[0].score > w[1].score));

        let ids: Vec<u64> = selected.iter().filter_map(|c| c.content.tmdb_id).collect();
        // six safe picks are always the top six
        assert_eq!(&ids[..6], &[0, 1, 2, 3, 4, 5]);
        assert_eq!(ids.iter().filter(|id| (20..60).contains(*id)).count(), 3);
        assert_eq!(ids.iter().filter(|id| **id >= 60).count(), 1);
    }

    #[test]
    fn test_select_is_reproducible_with_seed() {
        let pick = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            select_tiered(scored_list(50), 8, &TierConfig::default(), &mut rng)
                .into_iter()
                .filter_map(|c| c.content.tmdb_id)
                .collect::<Vec<_>>()
        };
        assert_eq!(pick(3), pick(3));
    }

    #[test]
    fn test_small_pools_are_topped_up_from_safe_pool() {
        let mut rng = StdRng::seed_from_u64(1);
        let tiers = TierConfig {
            safe: 0.1,
            diverse: 0.1,
            wildcard: 0.1,
        };
        let selected = select_tiered(scored_list(40), 6, &tiers, &mut rng);
        // one safe, one diverse, one wildcard, three refilled from the safe pool
        assert_eq!(selected.len(), 6);
        let ids: Vec<u64> = selected.iter().filter_map(|c| c.content.tmdb_id).collect();
        assert_eq!(&ids[..4], &[0, 1, 2, 3]);
    }

    #[test]
    fn test_recommend_without_randomization_takes_top() {
        let candidates = (0..5)
            .map(|i| candidate(&format!("Action {i}"), i, &["Action"]))
            .chain([candidate("Comedy", 99, &["Comedy"])])
            .collect();
        let selection = Selection {
            limit: 3,
            randomize: false,
            tiers: TierConfig::default(),
        };
        let mut rng = StdRng::seed_from_u64(0);

        let result = recommend(
            &scorer(),
            candidates,
            &CandidateFilters::default(),
            &BTreeSet::new(),
            &selection,
            &mut rng,
        );

        let titles: Vec<&str> = result.ranked.iter().map(|c| c.content.display_title()).collect();
        assert_eq!(titles, vec!["Action 0", "Action 1", "Action 2"]);
    }
}

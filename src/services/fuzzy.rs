use std::collections::HashSet;

use crate::models::WeightedMap;

/// Best profile keyword found for a content keyword
#[derive(Debug, Clone, PartialEq)]
pub struct KeywordMatch {
    /// Credit earned, in the same units as the profile weight
    pub score: f64,
    /// Profile key that produced the credit
    pub matched: String,
    pub exact: bool,
}

/// Finds partial credit for `keyword` among the user's weighted keywords.
///
/// An exact case-insensitive hit returns the stored weight as is. Otherwise every
/// positive profile keyword that contains, or is contained by, `keyword` is scored
/// as `weight * (0.5 + 0.5 * jaccard)` over whitespace tokens and the best one wins.
/// Ties keep the first key in map order.
pub fn fuzzy_keyword_match(keyword: &str, user_keywords: &WeightedMap) -> Option<KeywordMatch> {
    let keyword = keyword.trim().to_lowercase();
    if keyword.is_empty() || user_keywords.is_empty() {
        return None;
    }

    if let Some((key, weight)) = user_keywords
        .iter()
        .find(|(key, _)| key.to_lowercase() == keyword)
    {
        return Some(KeywordMatch {
            score: *weight,
            matched: key.clone(),
            exact: true,
        });
    }

    let keyword_tokens = tokens(&keyword);
    let mut best: Option<KeywordMatch> = None;

    for (key, weight) in user_keywords.iter() {
        if *weight <= 0.0 {
            continue;
        }

        let candidate = key.to_lowercase();
        if !(keyword.contains(&candidate) || candidate.contains(&keyword)) {
            continue;
        }

        let similarity = jaccard(&keyword_tokens, &tokens(&candidate));
        let score = weight * (0.5 + 0.5 * similarity);

        if best.as_ref().map_or(true, |b| score > b.score) {
            best = Some(KeywordMatch {
                score,
                matched: key.clone(),
                exact: false,
            });
        }
    }

    best
}

fn tokens(text: &str) -> HashSet<&str> {
    text.split_whitespace().collect()
}

fn jaccard(a: &HashSet<&str>, b: &HashSet<&str>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

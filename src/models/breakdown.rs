use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// How a content value related to the profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MatchKind {
    /// Case-insensitive exact hit on a positive profile entry
    Exact,
    /// Partial keyword hit against a different profile keyword
    Fuzzy { matched: String },
    /// Profile holds a negative weight for this value
    Negative,
    /// Positive but below the rarity threshold
    Rare { threshold: f64 },
    /// Never seen in the profile
    Unseen,
}

/// One line of audit output for a scored component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchDetail {
    pub value: String,
    #[serde(flatten)]
    pub kind: MatchKind,
    /// Raw profile weight that was looked up
    pub count: f64,
    /// Normalized contribution, for positive matches
    #[serde(skip_serializing_if = "Option::is_none")]
    pub normalized: Option<f64>,
    /// Amount subtracted from the component ratio
    #[serde(skip_serializing_if = "Option::is_none")]
    pub penalty: Option<f64>,
}

impl MatchDetail {
    pub fn exact(value: &str, count: f64, normalized: f64) -> Self {
        Self {
            value: value.to_string(),
            kind: MatchKind::Exact,
            count,
            normalized: Some(normalized),
            penalty: None,
        }
    }

    pub fn fuzzy(value: &str, matched: &str, count: f64, normalized: f64) -> Self {
        Self {
            value: value.to_string(),
            kind: MatchKind::Fuzzy {
                matched: matched.to_string(),
            },
            count,
            normalized: Some(normalized),
            penalty: None,
        }
    }

    pub fn negative(value: &str, count: f64, penalty: f64) -> Self {
        Self {
            value: value.to_string(),
            kind: MatchKind::Negative,
            count,
            normalized: None,
            penalty: Some(penalty),
        }
    }

    pub fn rare(value: &str, count: f64, threshold: f64, penalty: f64) -> Self {
        Self {
            value: value.to_string(),
            kind: MatchKind::Rare { threshold },
            count,
            normalized: None,
            penalty: Some(penalty),
        }
    }

    pub fn unseen(value: &str, penalty: f64) -> Self {
        Self {
            value: value.to_string(),
            kind: MatchKind::Unseen,
            count: 0.0,
            normalized: None,
            penalty: Some(penalty),
        }
    }
}

impl Display for MatchDetail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let norm = self.normalized.unwrap_or(0.0);
        let penalty = self.penalty.unwrap_or(0.0);
        match &self.kind {
            MatchKind::Exact => write!(
                f,
                "{} (count: {:.1}, norm: {:.2})",
                self.value, self.count, norm
            ),
            MatchKind::Fuzzy { matched } => write!(
                f,
                "{} (fuzzy: {}, count: {:.1}, norm: {:.2})",
                self.value, matched, self.count, norm
            ),
            MatchKind::Negative => write!(
                f,
                "{} (NEGATIVE: {:.1}, penalty: {:.2})",
                self.value, self.count, penalty
            ),
            MatchKind::Rare { threshold } => write!(
                f,
                "{} (rare: count {:.1} < threshold {:.1}, penalty: {:.2})",
                self.value, self.count, threshold, penalty
            ),
            MatchKind::Unseen => write!(f, "{} (unseen, penalty: {:.2})", self.value, penalty),
        }
    }
}

/// Per-component match lists
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchDetails {
    pub genres: Vec<MatchDetail>,
    pub directors: Vec<MatchDetail>,
    pub studio: Option<MatchDetail>,
    pub actors: Vec<MatchDetail>,
    pub language: Option<MatchDetail>,
    pub keywords: Vec<MatchDetail>,
}

/// Component scores and audit trail for one scoring call
///
/// Component scores are already multiplied by their effective weight, so they sum
/// (together with `redistributed_bonus`) to the unclamped total.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub genre_score: f64,
    pub director_score: f64,
    pub studio_score: f64,
    pub actor_score: f64,
    pub language_score: f64,
    pub keyword_score: f64,
    /// Extra score from weight lost by components that did not match this item
    pub redistributed_bonus: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub popularity_dampening: Option<f64>,
    pub details: MatchDetails,
}

impl Display for ScoreBreakdown {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "genre={:.3} director={:.3} studio={:.3} actor={:.3} \
             keyword={:.3} language={:.3} bonus={:.3}",
            self.genre_score,
            self.director_score,
            self.studio_score,
            self.actor_score,
            self.keyword_score,
            self.language_score,
            self.redistributed_bonus,
        )?;

        let lists = [
            ("genres", &self.details.genres),
            ("actors", &self.details.actors),
            ("keywords", &self.details.keywords),
        ];
        for (label, entries) in lists {
            if !entries.is_empty() {
                let joined: Vec<String> = entries.iter().take(5).map(|d| d.to_string()).collect();
                write!(f, " | {}: {}", label, joined.join(", "))?;
            }
        }
        Ok(())
    }
}

use serde::{Deserialize, Serialize};

use super::ContentCandidate;

/// One entry of a user's watch history, joined with the item's metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WatchEvent {
    /// Metadata of the watched item
    pub content: ContentCandidate,
    /// Times the item was played; absent means once
    #[serde(default)]
    pub view_count: Option<u32>,
    /// Unix timestamp (seconds) of the most recent view
    #[serde(default)]
    pub viewed_at: Option<i64>,
    /// The user's own rating on the 0-10 scale
    #[serde(default)]
    pub user_rating: Option<f64>,
    /// Pre-computed contribution weight; bypasses decay and rating multipliers
    #[serde(default)]
    pub weight: Option<f64>,
}

impl WatchEvent {
    pub fn new(content: ContentCandidate) -> Self {
        Self {
            content,
            ..Default::default()
        }
    }

    pub fn with_rating(mut self, rating: f64) -> Self {
        self.user_rating = Some(rating);
        self
    }

    pub fn with_views(mut self, view_count: u32) -> Self {
        self.view_count = Some(view_count);
        self
    }

    pub fn viewed_at(mut self, timestamp: i64) -> Self {
        self.viewed_at = Some(timestamp);
        self
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = Some(weight);
        self
    }
}

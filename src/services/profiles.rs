use std::sync::Arc;

use crate::db::ProfileStore;
use crate::error::AppResult;
use crate::models::{CachedProfile, ProfileKey, WatchEvent};

use super::profile_builder::{ProfileBuilder, WatchWeighting};

/// Result of [`ProfileService::refresh`]
#[derive(Debug, Clone, PartialEq)]
pub struct RefreshedProfile {
    pub snapshot: CachedProfile,
    /// False when the stored snapshot was still current and reused
    pub rebuilt: bool,
}

/// Keeps stored profiles in step with watch history
#[derive(Clone)]
pub struct ProfileService {
    store: Arc<dyn ProfileStore>,
    weighting: WatchWeighting,
}

impl ProfileService {
    pub fn new(store: Arc<dyn ProfileStore>, weighting: WatchWeighting) -> Self {
        Self { store, weighting }
    }

    /// Returns the profile for `key`, rebuilding it only when the history size
    /// differs from the stored snapshot's (or the snapshot format is outdated).
    ///
    /// `history` is the complete, authoritative watch history for the key.
    pub async fn refresh(
        &self,
        key: &ProfileKey,
        history: &[WatchEvent],
    ) -> AppResult<RefreshedProfile> {
        let watched_count = history.len();

        if let Some(cached) = self.store.load(key).await? {
            if cached.is_current(watched_count) {
                tracing::info!(
                    key = %key,
                    watched_count,
                    "Profile unchanged, reusing cached snapshot"
                );
                return Ok(RefreshedProfile {
                    snapshot: cached,
                    rebuilt: false,
                });
            }

            tracing::info!(
                key = %key,
                cached_count = cached.watched_count,
                watched_count,
                cached_version = cached.version,
                "Watch history changed, rebuilding profile"
            );
        } else {
            tracing::info!(key = %key, watched_count, "No cached profile, building");
        }

        let profile = ProfileBuilder::new(key.media_type, self.weighting.clone()).build(history);
        let snapshot = CachedProfile::new(watched_count, profile);
        self.store.save(key, &snapshot).await?;

        Ok(RefreshedProfile {
            snapshot,
            rebuilt: true,
        })
    }

    /// Reads the stored snapshot without rebuilding anything
    pub async fn get(&self, key: &ProfileKey) -> AppResult<Option<CachedProfile>> {
        self.store.load(key).await
    }
}

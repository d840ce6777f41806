use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::error::AppResult;
use crate::models::{CachedProfile, ProfileKey};

use super::ProfileStore;

/// Process-local store used when no Redis URL is configured
#[derive(Default)]
pub struct InMemoryProfileStore {
    snapshots: RwLock<HashMap<ProfileKey, CachedProfile>>,
}

impl InMemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn load(&self, key: &ProfileKey) -> AppResult<Option<CachedProfile>> {
        Ok(self.snapshots.read().await.get(key).cloned())
    }

    async fn save(&self, key: &ProfileKey, snapshot: &CachedProfile) -> AppResult<()> {
        self.snapshots
            .write()
            .await
            .insert(key.clone(), snapshot.clone());
        Ok(())
    }
}

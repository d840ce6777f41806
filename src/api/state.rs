use std::sync::Arc;

use crate::config::EngineConfig;
use crate::db::{InMemoryProfileStore, ProfileStore};
use crate::services::ProfileService;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub inner: Arc<AppStateInner>,
}

/// Engine settings and the profile service built on the configured store
pub struct AppStateInner {
    pub engine: EngineConfig,
    pub profiles: ProfileService,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(EngineConfig::default(), Arc::new(InMemoryProfileStore::new()))
    }
}

impl AppState {
    pub fn new(engine: EngineConfig, store: Arc<dyn ProfileStore>) -> Self {
        let profiles = ProfileService::new(store, engine.watch_weighting());
        Self {
            inner: Arc::new(AppStateInner { engine, profiles }),
        }
    }
}

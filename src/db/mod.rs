pub mod memory;
pub mod redis;

pub use memory::InMemoryProfileStore;
pub use self::redis::{create_redis_client, CacheKey, RedisProfileStore};

use crate::error::AppResult;
use crate::models::{CachedProfile, ProfileKey};

/// Key-value storage for profile snapshots
///
/// Implementations hold whole snapshots with no transactional guarantees; the last
/// write for a key wins.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ProfileStore: Send + Sync {
    /// Returns the snapshot for `key`, or `None` if nothing usable is stored
    async fn load(&self, key: &ProfileKey) -> AppResult<Option<CachedProfile>>;

    async fn save(&self, key: &ProfileKey, snapshot: &CachedProfile) -> AppResult<()>;
}

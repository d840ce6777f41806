use redis::AsyncCommands;
use redis::Client;
use std::fmt::Display;

use crate::error::AppResult;
use crate::models::{CachedProfile, ProfileKey};

use crate::db::ProfileStore;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Profile(ProfileKey),
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheKey::Profile(key) => write!(f, "profile:{}:{}", key.media_type, key.users),
        }
    }
}

/// Creates a Redis client for the profile cache
pub fn create_redis_client(redis_url: &str) -> anyhow::Result<Client> {
    let client = Client::open(redis_url)?;
    Ok(client)
}

/// Profile snapshots stored as JSON strings in Redis
#[derive(Clone)]
pub struct RedisProfileStore {
    redis_client: Client,
    /// Expiry in seconds; `0` keeps snapshots forever
    ttl: u64,
}

impl RedisProfileStore {
    pub fn new(redis_client: Client, ttl: u64) -> Self {
        Self { redis_client, ttl }
    }
}

#[async_trait::async_trait]
impl ProfileStore for RedisProfileStore {
    /// A snapshot that no longer deserializes is reported as missing so that it
    /// gets rebuilt and overwritten.
    async fn load(&self, key: &ProfileKey) -> AppResult<Option<CachedProfile>> {
        let cache_key = CacheKey::Profile(key.clone());
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let cached: Option<String> = conn.get(cache_key.to_string()).await?;

        let Some(json) = cached else {
            return Ok(None);
        };

        match serde_json::from_str(&json) {
            Ok(snapshot) => Ok(Some(snapshot)),
            Err(e) => {
                tracing::warn!(
                    key = %cache_key,
                    error = %e,
                    "Discarding unreadable profile snapshot"
                );
                Ok(None)
            }
        }
    }

    async fn save(&self, key: &ProfileKey, snapshot: &CachedProfile) -> AppResult<()> {
        let cache_key = CacheKey::Profile(key.clone()).to_string();
        let json = serde_json::to_string(snapshot)?;
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;

        if self.ttl == 0 {
            let _: () = conn.set(cache_key, json).await?;
        } else {
            let _: () = conn.set_ex(cache_key, json, self.ttl).await?;
        }
        Ok(())
    }
}

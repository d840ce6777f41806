use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use reelmatch::api::{create_router, AppState};
use reelmatch::config::Config;
use reelmatch::db::{create_redis_client, InMemoryProfileStore, ProfileStore, RedisProfileStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("reelmatch=info,tower_http=info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let engine = config.engine()?;

    let store: Arc<dyn ProfileStore> = match &config.redis_url {
        Some(url) => {
            tracing::info!("Storing profiles in Redis");
            Arc::new(RedisProfileStore::new(
                create_redis_client(url)?,
                config.profile_cache_ttl,
            ))
        }
        None => {
            tracing::warn!("REDIS_URL not set, profiles are kept in memory only");
            Arc::new(InMemoryProfileStore::new())
        }
    };

    let app = create_router(AppState::new(engine, store));

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");
    axum::serve(listener, app).await?;

    Ok(())
}

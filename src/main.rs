use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use recommendation_service::api::{create_router, AppState};
use recommendation_service::config::Config;
use recommendation_service::db::cache::create_redis_client;
use recommendation_service::db::{
    create_pool, seed_if_empty, wait_for_database, CacheBackend, MemoryBackend, PgRepository,
    RecommendationCache, RedisBackend,
};
use recommendation_service::services::HeuristicScorer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().context("Failed to load configuration")?;

    let pool = create_pool(&config.database_url, config.db_pool_size).await?;
    wait_for_database(&pool).await?;

    let migrator = sqlx::migrate!();
    if std::env::args().nth(1).as_deref() == Some("migrate-down") {
        migrator
            .undo(&pool, 0)
            .await
            .context("Failed to revert database migrations")?;
        tracing::info!("Migrations reverted");
        return Ok(());
    }

    migrator
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;

    if config.seed_database {
        seed_if_empty(&pool).await.context("Failed to seed database")?;
    }

    let backend = cache_backend(&config.redis_url).await?;
    let cache = RecommendationCache::new(backend, config.cache_ttl());
    tracing::info!(
        backend = cache.backend_name(),
        ttl_secs = cache.ttl().as_secs(),
        "Recommendation cache ready"
    );
    if !cache.is_available().await {
        tracing::warn!(
            backend = cache.backend_name(),
            "Cache unreachable at startup, continuing without it"
        );
    }

    let state = AppState::new(
        Arc::new(PgRepository::new(pool)),
        cache,
        Arc::new(HeuristicScorer::new(config.scorer_config())),
        config.batch_concurrency,
        config.request_timeout(),
    );
    let app = create_router(state);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!(%addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Redis when configured and reachable, otherwise the in-process cache
async fn cache_backend(redis_url: &str) -> anyhow::Result<Arc<dyn CacheBackend>> {
    if redis_url.is_empty() {
        tracing::warn!("REDIS_URL is empty, using in-process cache");
        return Ok(Arc::new(MemoryBackend::new()));
    }

    match RedisBackend::connect(create_redis_client(redis_url)?).await {
        Ok(backend) => Ok(Arc::new(backend)),
        Err(e) => {
            tracing::warn!(error = %e, "Redis unreachable, falling back to in-process cache");
            Ok(Arc::new(MemoryBackend::new()))
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

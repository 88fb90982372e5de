use std::time::Duration;

use sqlx::{postgres::PgPoolOptions, PgPool};

const CONNECT_ATTEMPTS: u32 = 30;
const CONNECT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Creates a PostgreSQL connection pool
///
/// `max_connections` is the shared budget that batch concurrency is sized
/// against.
pub async fn create_pool(database_url: &str, max_connections: u32) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect_lazy(database_url)?;

    Ok(pool)
}

/// Blocks until the database answers a trivial query
pub async fn wait_for_database(pool: &PgPool) -> anyhow::Result<()> {
    for attempt in 1..=CONNECT_ATTEMPTS {
        match sqlx::query("SELECT 1").execute(pool).await {
            Ok(_) => return Ok(()),
            Err(e) => {
                tracing::info!(
                    attempt,
                    max_attempts = CONNECT_ATTEMPTS,
                    error = %e,
                    "Waiting for database"
                );
                tokio::time::sleep(CONNECT_RETRY_DELAY).await;
            }
        }
    }

    anyhow::bail!(
        "database not reachable after {} attempts",
        CONNECT_ATTEMPTS
    )
}

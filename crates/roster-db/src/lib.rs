//! # Roster DB
//!
//! Database pool and utilities for the Roster API.
//!
//! This crate provides PostgreSQL pool initialization, a connectivity check
//! used by the readiness probe, and the embedded schema migrations.
//!
//! # Example
//!
//! ```ignore
//! use roster_config::DatabaseConfig;
//! use roster_db::{init_db_pool, run_migrations};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = DatabaseConfig::from_env().expect("DATABASE_URL must be set");
//!     let pool = init_db_pool(&config).await?;
//!     run_migrations(&pool).await?;
//!     Ok(())
//! }
//! ```

use std::time::Duration;

use anyhow::{Context, anyhow};
use roster_config::DatabaseConfig;
use sqlx::postgres::PgPoolOptions;
use tokio::time::{Instant, sleep};
use tracing::{debug, info};

pub use sqlx::PgPool;

/// Deadline applied by [`conn_check`] when the caller has none.
pub const DEFAULT_CHECK_DEADLINE: Duration = Duration::from_secs(10);

/// Initializes a PostgreSQL connection pool.
///
/// # Errors
///
/// Returns an error if the first connection cannot be established within
/// the configured acquire timeout.
pub async fn init_db_pool(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(config.acquire_timeout)
        .connect(&config.url)
        .await?;

    info!(
        max_connections = config.max_connections,
        "database pool initialized"
    );

    Ok(pool)
}

/// Creates a pool that connects on first use.
///
/// Used where the process has to start before the database is reachable.
pub fn init_lazy_pool(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout)
        .connect_lazy(&config.url)
}

/// Waits for the database to accept connections, then checks the engine
/// answers queries.
///
/// Retries with a linear backoff of `attempt * 100ms` until `deadline` elapses.
pub async fn conn_check(pool: &PgPool, deadline: Option<Duration>) -> anyhow::Result<()> {
    let deadline = Instant::now() + deadline.unwrap_or(DEFAULT_CHECK_DEADLINE);

    let mut attempt: u32 = 1;
    loop {
        let ping = match tokio::time::timeout_at(deadline, pool.acquire()).await {
            Ok(result) => result.map(|_| ()),
            Err(_) => return Err(anyhow!("deadline exceeded waiting for database")),
        };

        match ping {
            Ok(()) => break,
            Err(err) => {
                debug!(attempt, error = %err, "database not ready");
                sleep(Duration::from_millis(100) * attempt).await;

                if Instant::now() >= deadline {
                    return Err(anyhow!(err).context("deadline exceeded"));
                }
            }
        }

        attempt += 1;
    }

    let ok: bool = sqlx::query_scalar("SELECT TRUE")
        .fetch_one(pool)
        .await
        .context("check sql engine")?;

    if !ok {
        return Err(anyhow!("sql engine returned false"));
    }

    Ok(())
}

/// Applies the embedded migrations from `migrations/`.
pub async fn run_migrations(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("../../migrations")
        .run(pool)
        .await
        .context("run migrations")?;

    info!("database migrations applied");
    Ok(())
}

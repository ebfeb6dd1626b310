//! Database bootstrap for TripVault
//!
//! Builds the PostgreSQL pool from [`Config`], applies pending migrations
//! and pings the database once before the server starts taking traffic.

use std::time::Duration;

use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::config::Config;

/// Database bootstrap error
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("Could not connect to database: {0}")]
    Connect(String),

    #[error("Could not apply migrations: {0}")]
    Migrate(String),

    #[error("Database ping failed: {0}")]
    Ping(String),
}

/// Build the pool, run migrations and verify connectivity
///
/// Everything the server needs before binding its listener; a failure here
/// should abort startup.
pub async fn init(config: &Config) -> Result<PgPool, DbError> {
    tracing::info!(
        url = %config.database_url_masked(),
        max_connections = config.db_max_connections,
        "Connecting to database"
    );

    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(config.db_acquire_timeout_seconds))
        .idle_timeout(Duration::from_secs(config.db_idle_timeout_seconds))
        .connect(&config.database_url)
        .await
        .map_err(|e| DbError::Connect(e.to_string()))?;

    tracing::info!("Applying database migrations");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| DbError::Migrate(e.to_string()))?;

    check_health(&pool).await?;
    tracing::info!("Database ready");

    Ok(pool)
}

/// Ping the database; also backs the `/health` endpoint
pub async fn check_health(pool: &PgPool) -> Result<(), DbError> {
    sqlx::query("SELECT 1")
        .fetch_one(pool)
        .await
        .map_err(|e| DbError::Ping(e.to_string()))?;

    Ok(())
}

//! `aphrc-db` -- PostgreSQL access for the `aphrc_works` table.
//!
//! Pool construction, health and readiness checks, row models, and the
//! [`repositories::WorkRepo`] query layer.

use std::time::Duration;

use aphrc_core::readiness::{poll_until_ready, NotReady, ReadinessConfig};
use sqlx::postgres::PgPoolOptions;

pub mod models;
pub mod repositories;

pub type DbPool = sqlx::PgPool;

/// Errors from the database layer.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error(transparent)]
    NotReady(#[from] NotReady),
}

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url)
        .await
}

/// Run a trivial query to prove the pool can reach the server.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Connect to `database_url`, retrying with backoff until the server
/// answers a trivial query or `config.timeout` elapses.
pub async fn wait_until_ready(
    database_url: &str,
    config: &ReadinessConfig,
) -> Result<DbPool, DbError> {
    poll_until_ready("database", config, || async {
        let pool = create_pool(database_url).await?;
        let checked = health_check(&pool).await;
        pool.close().await;
        checked
    })
    .await?;

    Ok(create_pool(database_url).await?)
}

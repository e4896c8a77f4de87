//! Database connection and pool management for RunaMitra
//!
//! This module handles the SQLite file that backs the record store. The
//! store keeps its collections as JSON documents under fixed keys, so the
//! schema is a single key/value table bootstrapped at startup.

use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use std::time::Duration;

use crate::config::Config;

/// Database connection error
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("Failed to connect to database: {0}")]
    ConnectionError(String),

    #[error("Failed to initialize schema: {0}")]
    SchemaError(String),

    #[error("Database health check failed: {0}")]
    HealthCheckError(String),
}

/// Open a connection pool for the given SQLite URL
///
/// The pool is capped at a single connection so read-modify-write cycles
/// on the collections serialize. The connection is never reaped, which
/// also keeps in-memory databases alive for the life of the pool.
pub async fn connect(database_url: &str) -> Result<SqlitePool, DbError> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .acquire_timeout(Duration::from_secs(5))
        .idle_timeout(None)
        .connect(database_url)
        .await
        .map_err(|e| DbError::ConnectionError(e.to_string()))?;

    Ok(pool)
}

/// Create the database connection pool from configuration
pub async fn create_pool(config: &Config) -> Result<SqlitePool, DbError> {
    tracing::info!("Opening record store database at {}", config.database_url);

    let pool = connect(&config.database_url).await?;

    tracing::info!("Database connection pool created successfully");

    Ok(pool)
}

/// Bootstrap the key/value schema backing the record collections
pub async fn init_schema(pool: &SqlitePool) -> Result<(), DbError> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS collections (
            key   TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(|e| DbError::SchemaError(e.to_string()))?;

    tracing::info!("Database schema ready");

    Ok(())
}

/// Check database connectivity (for health checks)
pub async fn check_health(pool: &SqlitePool) -> Result<(), DbError> {
    sqlx::query("SELECT 1")
        .fetch_one(pool)
        .await
        .map_err(|e| DbError::HealthCheckError(e.to_string()))?;

    Ok(())
}

//! Database access layer
//!
//! Connection pool management plus one repository module per entity. All
//! repository functions take an explicit executor (pool or open transaction)
//! and exchange plain data structs; nothing is lazily loaded.

use crate::config::DatabaseConfig;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use thiserror::Error;

pub mod accessions;
pub mod file_uploads;
pub mod presence;
pub mod programs;
pub mod sequences;
pub mod versions;

/// Database operation errors with contextual information
#[derive(Error, Debug)]
pub enum DbError {
    /// SQL query or connection error
    #[error("Database query failed: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// Database configuration is invalid or missing
    #[error("Database configuration error: {0}. Check DATABASE_URL and connection settings.")]
    Config(String),

    /// Requested record does not exist
    #[error("{0}")]
    NotFound(String),

    /// Record already exists (unique constraint violation)
    #[error("{0}")]
    Duplicate(String),
}

impl DbError {
    /// Create a not found error with resource context
    pub fn not_found(resource_type: &str, identifier: &str) -> Self {
        Self::NotFound(format!("{} '{}' not found in database", resource_type, identifier))
    }

    /// Create a duplicate error with resource context
    pub fn duplicate(resource_type: &str, identifier: &str) -> Self {
        Self::Duplicate(format!("{} '{}' already exists", resource_type, identifier))
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

pub type DbResult<T> = Result<T, DbError>;

/// Build the connection pool from the server's [`DatabaseConfig`].
pub async fn create_pool(config: &DatabaseConfig) -> DbResult<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
        .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
        .connect(&config.url)
        .await?;

    tracing::info!(
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        "Database connection pool created"
    );

    Ok(pool)
}

pub async fn health_check(pool: &PgPool) -> DbResult<()> {
    sqlx::query("SELECT 1")
        .execute(pool)
        .await
        .map(|_| ())
        .map_err(DbError::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_constructors() {
        let err = DbError::not_found("Program", "P1");
        assert_eq!(err.to_string(), "Program 'P1' not found in database");

        let err = DbError::duplicate("Accession", "ACC-001");
        assert_eq!(err.to_string(), "Accession 'ACC-001' already exists");
    }

    #[tokio::test]
    #[ignore = "requires a PostgreSQL database"]
    async fn test_create_pool_from_server_config() {
        let mut config = crate::config::Config::default().database;
        if let Ok(url) = std::env::var("DATABASE_URL") {
            config.url = url;
        }

        let pool = create_pool(&config).await.expect("pool connects");
        health_check(&pool).await.expect("health check passes");
    }
}

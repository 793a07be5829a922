//! Database operations for species-scoped database versions.
//!
//! Version numbers are monotonic integers per species, starting at 1. Each
//! MADC upload allocates `max(version) + 1` for its species; PAV and
//! supplemental uploads attach to the latest existing version instead.
//!
//! # Key Operations
//!
//! - `next_version()` - Allocate the next version number for a species
//! - `create_version()` - Insert the version row for an upload
//! - `latest_version()` - Current version row for a species, if any
//! - `version_exists()` - Existence check used by foreign-key revalidation
//!
//! # Examples
//!
//! ```rust,ignore
//! use haplodb_server::db::versions;
//!
//! let mut tx = pool.begin().await?;
//! let next = versions::next_version(&mut tx, "alfalfa").await?;
//! let version = versions::create_version(
//!     &mut tx,
//!     next,
//!     "alfalfa",
//!     program_id,
//!     Some("September genotyping run"),
//!     None,
//! ).await?;
//! tx.commit().await?;
//! ```

use chrono::{DateTime, Utc};
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use super::{DbError, DbResult};

// ============================================================================
// Types
// ============================================================================

/// One row of `database_versions`: a (version, species) snapshot marker.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DatabaseVersion {
    pub id: Uuid,
    pub version: i32,
    pub species: String,
    pub program_id: Option<Uuid>,
    pub description: Option<String>,
    pub uploaded_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Operations
// ============================================================================

/// Allocate the next version number for a species.
///
/// Takes a transaction-scoped advisory lock on the species before reading
/// `max(version)`, so concurrent uploads for the same species serialize here
/// and cannot both observe the same maximum. The lock is released when the
/// surrounding transaction commits or rolls back, which also covers the
/// version-row insert that must pair with this allocation.
pub async fn next_version(tx: &mut Transaction<'_, Postgres>, species: &str) -> DbResult<i32> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
        .bind(species)
        .execute(&mut **tx)
        .await?;

    let max_version: Option<i32> =
        sqlx::query_scalar("SELECT MAX(version) FROM database_versions WHERE species = $1")
            .bind(species)
            .fetch_one(&mut **tx)
            .await?;

    Ok(max_version.unwrap_or(0) + 1)
}

/// Insert a new version row for a species.
pub async fn create_version(
    tx: &mut Transaction<'_, Postgres>,
    version: i32,
    species: &str,
    program_id: Uuid,
    description: Option<&str>,
    uploaded_by: Option<&str>,
) -> DbResult<DatabaseVersion> {
    let row = sqlx::query_as::<_, DatabaseVersion>(
        r#"
        INSERT INTO database_versions (id, version, species, program_id, description, uploaded_by)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id, version, species, program_id, description, uploaded_by, created_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(version)
    .bind(species)
    .bind(program_id)
    .bind(description)
    .bind(uploaded_by)
    .fetch_one(&mut **tx)
    .await
    .map_err(|e| {
        if let sqlx::Error::Database(ref db_err) = e {
            if db_err.is_unique_violation() {
                return DbError::duplicate(
                    "DatabaseVersion",
                    &format!("{}/{}", species, version),
                );
            }
        }
        DbError::from(e)
    })?;

    Ok(row)
}

/// Fetch the latest version row for a species, if one exists.
pub async fn latest_version(
    tx: &mut Transaction<'_, Postgres>,
    species: &str,
) -> DbResult<Option<DatabaseVersion>> {
    let row = sqlx::query_as::<_, DatabaseVersion>(
        r#"
        SELECT id, version, species, program_id, description, uploaded_by, created_at
        FROM database_versions
        WHERE species = $1
        ORDER BY version DESC
        LIMIT 1
        "#,
    )
    .bind(species)
    .fetch_optional(&mut **tx)
    .await?;

    Ok(row)
}

/// Check that a (version, species) pair exists.
pub async fn version_exists(
    tx: &mut Transaction<'_, Postgres>,
    species: &str,
    version: i32,
) -> DbResult<bool> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM database_versions WHERE species = $1 AND version = $2)",
    )
    .bind(species)
    .bind(version)
    .fetch_one(&mut **tx)
    .await?;

    Ok(exists)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::programs;
    use sqlx::PgPool;

    #[sqlx::test(migrations = "../../migrations")]
    #[ignore = "requires a PostgreSQL database"]
    async fn test_next_version_starts_at_one(pool: PgPool) {
        let mut tx = pool.begin().await.unwrap();
        let next = next_version(&mut tx, "alfalfa").await.unwrap();
        assert_eq!(next, 1);
    }

    #[sqlx::test(migrations = "../../migrations")]
    #[ignore = "requires a PostgreSQL database"]
    async fn test_next_version_increments_per_species(pool: PgPool) {
        let mut tx = pool.begin().await.unwrap();
        let program = programs::get_or_create_program(&mut tx, "Test Program")
            .await
            .unwrap();

        let v1 = next_version(&mut tx, "alfalfa").await.unwrap();
        create_version(&mut tx, v1, "alfalfa", program.id, None, None)
            .await
            .unwrap();
        let v2 = next_version(&mut tx, "alfalfa").await.unwrap();
        assert_eq!((v1, v2), (1, 2));

        // Other species are unaffected
        let other = next_version(&mut tx, "blueberry").await.unwrap();
        assert_eq!(other, 1);
    }

    #[sqlx::test(migrations = "../../migrations")]
    #[ignore = "requires a PostgreSQL database"]
    async fn test_duplicate_version_is_rejected(pool: PgPool) {
        let mut tx = pool.begin().await.unwrap();
        let program = programs::get_or_create_program(&mut tx, "Test Program")
            .await
            .unwrap();

        create_version(&mut tx, 1, "pecan", program.id, None, None)
            .await
            .unwrap();
        let result = create_version(&mut tx, 1, "pecan", program.id, None, None).await;
        assert!(matches!(result, Err(DbError::Duplicate(_))));
    }

    #[sqlx::test(migrations = "../../migrations")]
    #[ignore = "requires a PostgreSQL database"]
    async fn test_latest_version(pool: PgPool) {
        let mut tx = pool.begin().await.unwrap();
        assert!(latest_version(&mut tx, "cranberry").await.unwrap().is_none());

        let program = programs::get_or_create_program(&mut tx, "Test Program")
            .await
            .unwrap();
        create_version(&mut tx, 1, "cranberry", program.id, None, None)
            .await
            .unwrap();
        create_version(&mut tx, 2, "cranberry", program.id, Some("second pass"), None)
            .await
            .unwrap();

        let latest = latest_version(&mut tx, "cranberry").await.unwrap().unwrap();
        assert_eq!(latest.version, 2);
        assert_eq!(latest.description.as_deref(), Some("second pass"));
        assert!(version_exists(&mut tx, "cranberry", 1).await.unwrap());
        assert!(!version_exists(&mut tx, "cranberry", 3).await.unwrap());
    }
}

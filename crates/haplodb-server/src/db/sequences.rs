//! Database operations for allele sequences.
//!
//! A sequence row is keyed by `(species, allele_id)`. Rows are created by the
//! MADC pipeline, never deleted, and mutated only by the supplemental
//! annotation updater.
//!
//! # Key Operations
//!
//! - `fetch_existing_allele_ids()` - Which of these alleles already exist
//! - `insert_batch()` - Conflict-skip bulk insert of new sequences
//! - `update_annotations()` - Overwrite the two free-text annotation fields
//! - `count_existing()` - Existence count used by foreign-key revalidation

use chrono::{DateTime, Utc};
use sqlx::{Postgres, QueryBuilder, Transaction};
use std::collections::HashSet;
use uuid::Uuid;

use super::DbResult;

// ============================================================================
// Types
// ============================================================================

/// One row of `sequences`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Sequence {
    pub id: Uuid,
    pub allele_id: String,
    pub species: String,
    pub allele_sequence: String,
    pub info: Option<String>,
    pub associated_trait: Option<String>,
    pub version_added: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for a bulk sequence insert. The generated id makes it five bind
/// parameters per row.
#[derive(Debug, Clone)]
pub struct NewSequence {
    pub allele_id: String,
    pub species: String,
    pub allele_sequence: String,
    pub version_added: i32,
}

/// Bind parameters consumed per row by [`insert_batch`].
pub const SEQUENCE_INSERT_PARAMS: usize = 5;

// ============================================================================
// Operations
// ============================================================================

/// Return the subset of `allele_ids` that already exist for this species.
pub async fn fetch_existing_allele_ids(
    tx: &mut Transaction<'_, Postgres>,
    species: &str,
    allele_ids: &[String],
) -> DbResult<HashSet<String>> {
    if allele_ids.is_empty() {
        return Ok(HashSet::new());
    }

    let rows: Vec<String> = sqlx::query_scalar(
        "SELECT allele_id FROM sequences WHERE species = $1 AND allele_id = ANY($2)",
    )
    .bind(species)
    .bind(allele_ids)
    .fetch_all(&mut **tx)
    .await?;

    Ok(rows.into_iter().collect())
}

/// Bulk-insert new sequences, skipping rows that collide on
/// `(species, allele_id)`. Returns the number of rows actually inserted;
/// conflict-skipped rows are not counted.
///
/// Callers are responsible for sizing `rows` under the bind-parameter
/// ceiling (see `ingest::chunker`).
pub async fn insert_batch(
    tx: &mut Transaction<'_, Postgres>,
    rows: &[NewSequence],
) -> DbResult<u64> {
    if rows.is_empty() {
        return Ok(0);
    }

    let mut query_builder: QueryBuilder<Postgres> = QueryBuilder::new(
        r#"
        INSERT INTO sequences (
            id,
            allele_id,
            species,
            allele_sequence,
            version_added
        )
        "#,
    );

    query_builder.push_values(rows, |mut b, row| {
        b.push_bind(Uuid::new_v4())
            .push_bind(&row.allele_id)
            .push_bind(&row.species)
            .push_bind(&row.allele_sequence)
            .push_bind(row.version_added);
    });

    query_builder.push(" ON CONFLICT (species, allele_id) DO NOTHING");

    let result = query_builder.build().execute(&mut **tx).await?;

    Ok(result.rows_affected())
}

/// Overwrite the annotation fields of one sequence. Returns `false` when no
/// row matches `(species, allele_id)`.
pub async fn update_annotations(
    tx: &mut Transaction<'_, Postgres>,
    species: &str,
    allele_id: &str,
    info: Option<&str>,
    associated_trait: Option<&str>,
) -> DbResult<bool> {
    let result = sqlx::query(
        r#"
        UPDATE sequences
        SET info = $3, associated_trait = $4, updated_at = NOW()
        WHERE species = $1 AND allele_id = $2
        "#,
    )
    .bind(species)
    .bind(allele_id)
    .bind(info)
    .bind(associated_trait)
    .execute(&mut **tx)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Count how many of `allele_ids` exist for this species. Used to re-validate
/// foreign keys immediately before a presence insert.
pub async fn count_existing(
    tx: &mut Transaction<'_, Postgres>,
    species: &str,
    allele_ids: &[String],
) -> DbResult<i64> {
    if allele_ids.is_empty() {
        return Ok(0);
    }

    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM sequences WHERE species = $1 AND allele_id = ANY($2)",
    )
    .bind(species)
    .bind(allele_ids)
    .fetch_one(&mut **tx)
    .await?;

    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{programs, versions};
    use sqlx::PgPool;

    async fn seed_version(tx: &mut Transaction<'_, Postgres>, species: &str) -> i32 {
        let program = programs::get_or_create_program(tx, "Test Program")
            .await
            .unwrap();
        let version = versions::next_version(tx, species).await.unwrap();
        versions::create_version(tx, version, species, program.id, None, None)
            .await
            .unwrap();
        version
    }

    fn new_sequence(allele_id: &str, species: &str, version: i32) -> NewSequence {
        NewSequence {
            allele_id: allele_id.to_string(),
            species: species.to_string(),
            allele_sequence: "ACGTACGT".to_string(),
            version_added: version,
        }
    }

    #[sqlx::test(migrations = "../../migrations")]
    #[ignore = "requires a PostgreSQL database"]
    async fn test_insert_batch_skips_conflicts(pool: PgPool) {
        let mut tx = pool.begin().await.unwrap();
        let version = seed_version(&mut tx, "alfalfa").await;

        let rows = vec![
            new_sequence("A1", "alfalfa", version),
            new_sequence("A2", "alfalfa", version),
        ];
        let inserted = insert_batch(&mut tx, &rows).await.unwrap();
        assert_eq!(inserted, 2);

        // Re-inserting the same alleles is a no-op, not an error
        let inserted = insert_batch(&mut tx, &rows).await.unwrap();
        assert_eq!(inserted, 0);

        let existing = fetch_existing_allele_ids(
            &mut tx,
            "alfalfa",
            &["A1".to_string(), "A2".to_string(), "A3".to_string()],
        )
        .await
        .unwrap();
        assert_eq!(existing.len(), 2);
        assert!(existing.contains("A1"));
        assert!(!existing.contains("A3"));
    }

    #[sqlx::test(migrations = "../../migrations")]
    #[ignore = "requires a PostgreSQL database"]
    async fn test_update_annotations(pool: PgPool) {
        let mut tx = pool.begin().await.unwrap();
        let version = seed_version(&mut tx, "potato").await;

        insert_batch(&mut tx, &[new_sequence("P1", "potato", version)])
            .await
            .unwrap();

        let updated = update_annotations(
            &mut tx,
            "potato",
            "P1",
            Some("late blight marker"),
            Some("disease resistance"),
        )
        .await
        .unwrap();
        assert!(updated);

        let missed = update_annotations(&mut tx, "potato", "P999", Some("x"), None)
            .await
            .unwrap();
        assert!(!missed);

        assert_eq!(count_existing(&mut tx, "potato", &["P1".to_string()]).await.unwrap(), 1);
    }
}

//! Database operations for the two derived presence tables.
//!
//! `sequence_presence` records which breeding program has observed which
//! allele (keyed by `(program_id, species, allele_id)`). `allele_presence`
//! records which accession carries which allele (keyed by
//! `(species, allele_id, accession_id)`). Both tables are append-only:
//! duplicate observations are skipped, never overwritten.

use sqlx::{Postgres, QueryBuilder, Transaction};
use std::collections::HashSet;
use uuid::Uuid;

use super::DbResult;

// ============================================================================
// Types
// ============================================================================

/// Input for a bulk `sequence_presence` insert. Five bind parameters per row
/// including the generated id.
#[derive(Debug, Clone)]
pub struct NewSequencePresence {
    pub program_id: Uuid,
    pub allele_id: String,
    pub species: String,
    pub version_added: i32,
}

/// Input for a bulk `allele_presence` insert. Five bind parameters per row.
#[derive(Debug, Clone)]
pub struct NewAllelePresence {
    pub allele_id: String,
    pub species: String,
    pub accession_id: Uuid,
    pub version_added: i32,
}

/// Bind parameters consumed per row by [`insert_sequence_presence_batch`].
pub const SEQUENCE_PRESENCE_INSERT_PARAMS: usize = 5;

/// Bind parameters consumed per row by [`insert_allele_presence_batch`].
pub const ALLELE_PRESENCE_INSERT_PARAMS: usize = 5;

// ============================================================================
// Program presence (sequence_presence)
// ============================================================================

/// Return the subset of `allele_ids` already linked to this program for this
/// species.
pub async fn fetch_linked_allele_ids(
    tx: &mut Transaction<'_, Postgres>,
    program_id: Uuid,
    species: &str,
    allele_ids: &[String],
) -> DbResult<HashSet<String>> {
    if allele_ids.is_empty() {
        return Ok(HashSet::new());
    }

    let rows: Vec<String> = sqlx::query_scalar(
        r#"
        SELECT allele_id FROM sequence_presence
        WHERE program_id = $1 AND species = $2 AND allele_id = ANY($3)
        "#,
    )
    .bind(program_id)
    .bind(species)
    .bind(allele_ids)
    .fetch_all(&mut **tx)
    .await?;

    Ok(rows.into_iter().collect())
}

/// Bulk-insert program-presence links, skipping rows that collide on
/// `(program_id, species, allele_id)`. Returns the number of rows actually
/// inserted.
pub async fn insert_sequence_presence_batch(
    tx: &mut Transaction<'_, Postgres>,
    rows: &[NewSequencePresence],
) -> DbResult<u64> {
    if rows.is_empty() {
        return Ok(0);
    }

    let mut query_builder: QueryBuilder<Postgres> = QueryBuilder::new(
        r#"
        INSERT INTO sequence_presence (
            id,
            program_id,
            allele_id,
            species,
            version_added
        )
        "#,
    );

    query_builder.push_values(rows, |mut b, row| {
        b.push_bind(Uuid::new_v4())
            .push_bind(row.program_id)
            .push_bind(&row.allele_id)
            .push_bind(&row.species)
            .push_bind(row.version_added);
    });

    query_builder.push(" ON CONFLICT (program_id, species, allele_id) DO NOTHING");

    let result = query_builder.build().execute(&mut **tx).await?;

    Ok(result.rows_affected())
}

// ============================================================================
// Accession presence (allele_presence)
// ============================================================================

/// Return the `(allele_id, accession_id)` pairs already recorded for this
/// species among the given alleles.
pub async fn fetch_existing_pairs(
    tx: &mut Transaction<'_, Postgres>,
    species: &str,
    allele_ids: &[String],
) -> DbResult<HashSet<(String, Uuid)>> {
    if allele_ids.is_empty() {
        return Ok(HashSet::new());
    }

    let rows: Vec<(String, Uuid)> = sqlx::query_as(
        r#"
        SELECT allele_id, accession_id FROM allele_presence
        WHERE species = $1 AND allele_id = ANY($2)
        "#,
    )
    .bind(species)
    .bind(allele_ids)
    .fetch_all(&mut **tx)
    .await?;

    Ok(rows.into_iter().collect())
}

/// Bulk-insert accession-presence links, skipping rows that collide on
/// `(species, allele_id, accession_id)`. Returns the number of rows actually
/// inserted.
pub async fn insert_allele_presence_batch(
    tx: &mut Transaction<'_, Postgres>,
    rows: &[NewAllelePresence],
) -> DbResult<u64> {
    if rows.is_empty() {
        return Ok(0);
    }

    let mut query_builder: QueryBuilder<Postgres> = QueryBuilder::new(
        r#"
        INSERT INTO allele_presence (
            id,
            allele_id,
            species,
            accession_id,
            version_added
        )
        "#,
    );

    query_builder.push_values(rows, |mut b, row| {
        b.push_bind(Uuid::new_v4())
            .push_bind(&row.allele_id)
            .push_bind(&row.species)
            .push_bind(row.accession_id)
            .push_bind(row.version_added);
    });

    query_builder.push(" ON CONFLICT (species, allele_id, accession_id) DO NOTHING");

    let result = query_builder.build().execute(&mut **tx).await?;

    Ok(result.rows_affected())
}

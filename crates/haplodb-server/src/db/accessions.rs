//! Database operations for accessions (plant material identifiers).
//!
//! Accession names arrive as PAV column headers and are shared across
//! species, so the whole header row is resolved in one get-or-create batch.

use chrono::{DateTime, Utc};
use sqlx::{Postgres, QueryBuilder, Transaction};
use std::collections::HashMap;
use uuid::Uuid;

use super::DbResult;

/// One row of `accessions`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Accession {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Bind parameters consumed per row by the insert half of
/// [`get_or_create_batch`].
pub const ACCESSION_INSERT_PARAMS: usize = 2;

/// Resolve accession names to ids, creating any that do not exist yet.
///
/// Returns a name-to-id map covering every input name. Callers are
/// responsible for sizing `names` under the bind-parameter ceiling.
pub async fn get_or_create_batch(
    tx: &mut Transaction<'_, Postgres>,
    names: &[String],
) -> DbResult<HashMap<String, Uuid>> {
    if names.is_empty() {
        return Ok(HashMap::new());
    }

    let mut query_builder: QueryBuilder<Postgres> =
        QueryBuilder::new("INSERT INTO accessions (id, name) ");

    query_builder.push_values(names, |mut b, name| {
        b.push_bind(Uuid::new_v4()).push_bind(name);
    });

    query_builder.push(" ON CONFLICT (name) DO NOTHING");

    query_builder.build().execute(&mut **tx).await?;

    let rows: Vec<(Uuid, String)> =
        sqlx::query_as("SELECT id, name FROM accessions WHERE name = ANY($1)")
            .bind(names)
            .fetch_all(&mut **tx)
            .await?;

    Ok(rows.into_iter().map(|(id, name)| (name, id)).collect())
}

/// Count how many of `ids` exist. Used to re-validate foreign keys
/// immediately before a presence insert.
pub async fn count_existing(
    tx: &mut Transaction<'_, Postgres>,
    ids: &[Uuid],
) -> DbResult<i64> {
    if ids.is_empty() {
        return Ok(0);
    }

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM accessions WHERE id = ANY($1)")
        .bind(ids)
        .fetch_one(&mut **tx)
        .await?;

    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::PgPool;

    #[sqlx::test(migrations = "../../migrations")]
    #[ignore = "requires a PostgreSQL database"]
    async fn test_get_or_create_batch_reuses_existing(pool: PgPool) {
        let mut tx = pool.begin().await.unwrap();

        let first = get_or_create_batch(
            &mut tx,
            &["Beauregard".to_string(), "Covington".to_string()],
        )
        .await
        .unwrap();
        assert_eq!(first.len(), 2);

        // A second batch with one overlap keeps the existing id
        let second = get_or_create_batch(
            &mut tx,
            &["Covington".to_string(), "Murasaki".to_string()],
        )
        .await
        .unwrap();
        assert_eq!(second.len(), 2);
        assert_eq!(first["Covington"], second["Covington"]);

        let ids: Vec<Uuid> = second.values().copied().collect();
        assert_eq!(count_existing(&mut tx, &ids).await.unwrap(), 2);
    }

    #[sqlx::test(migrations = "../../migrations")]
    #[ignore = "requires a PostgreSQL database"]
    async fn test_empty_batch_is_noop(pool: PgPool) {
        let mut tx = pool.begin().await.unwrap();

        let resolved = get_or_create_batch(&mut tx, &[]).await.unwrap();
        assert!(resolved.is_empty());
        assert_eq!(count_existing(&mut tx, &[]).await.unwrap(), 0);
    }
}

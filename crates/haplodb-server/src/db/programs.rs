//! Database operations for breeding programs and projects.
//!
//! Programs and projects are lightweight name-keyed entities. Uploads
//! reference them by name, so the common access pattern is get-or-create:
//! insert with `ON CONFLICT DO NOTHING`, then read the row back.

use chrono::{DateTime, Utc};
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use super::DbResult;

/// One row of `programs`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Program {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One row of `projects`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Fetch the program with this name, creating it if absent.
///
/// The insert-then-select sequence is safe under concurrent callers: if
/// another transaction creates the program first, the insert is skipped and
/// the select returns the winner's row.
pub async fn get_or_create_program(
    tx: &mut Transaction<'_, Postgres>,
    name: &str,
) -> DbResult<Program> {
    sqlx::query("INSERT INTO programs (id, name) VALUES ($1, $2) ON CONFLICT (name) DO NOTHING")
        .bind(Uuid::new_v4())
        .bind(name)
        .execute(&mut **tx)
        .await?;

    let program = sqlx::query_as::<_, Program>(
        "SELECT id, name, description, created_at FROM programs WHERE name = $1",
    )
    .bind(name)
    .fetch_one(&mut **tx)
    .await?;

    Ok(program)
}

/// Look up a program by name without creating it.
pub async fn find_program_by_name(
    tx: &mut Transaction<'_, Postgres>,
    name: &str,
) -> DbResult<Option<Program>> {
    let program = sqlx::query_as::<_, Program>(
        "SELECT id, name, description, created_at FROM programs WHERE name = $1",
    )
    .bind(name)
    .fetch_optional(&mut **tx)
    .await?;

    Ok(program)
}

/// Fetch the project with this name, creating it if absent.
pub async fn get_or_create_project(
    tx: &mut Transaction<'_, Postgres>,
    name: &str,
) -> DbResult<Project> {
    sqlx::query("INSERT INTO projects (id, name) VALUES ($1, $2) ON CONFLICT (name) DO NOTHING")
        .bind(Uuid::new_v4())
        .bind(name)
        .execute(&mut **tx)
        .await?;

    let project = sqlx::query_as::<_, Project>(
        "SELECT id, name, description, created_at FROM projects WHERE name = $1",
    )
    .bind(name)
    .fetch_one(&mut **tx)
    .await?;

    Ok(project)
}

/// Associate a program with a project. Re-linking an existing pair is a
/// no-op.
pub async fn link_program_project(
    tx: &mut Transaction<'_, Postgres>,
    program_id: Uuid,
    project_id: Uuid,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO program_projects (program_id, project_id)
        VALUES ($1, $2)
        ON CONFLICT (program_id, project_id) DO NOTHING
        "#,
    )
    .bind(program_id)
    .bind(project_id)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::PgPool;

    #[sqlx::test(migrations = "../../migrations")]
    #[ignore = "requires a PostgreSQL database"]
    async fn test_get_or_create_program_is_idempotent(pool: PgPool) {
        let mut tx = pool.begin().await.unwrap();

        let first = get_or_create_program(&mut tx, "NDSU Potato").await.unwrap();
        let second = get_or_create_program(&mut tx, "NDSU Potato").await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(second.name, "NDSU Potato");

        let other = get_or_create_program(&mut tx, "UW Cranberry").await.unwrap();
        assert_ne!(first.id, other.id);
    }

    #[sqlx::test(migrations = "../../migrations")]
    #[ignore = "requires a PostgreSQL database"]
    async fn test_find_program_without_creating(pool: PgPool) {
        let mut tx = pool.begin().await.unwrap();

        assert!(find_program_by_name(&mut tx, "Nonexistent")
            .await
            .unwrap()
            .is_none());

        let created = get_or_create_program(&mut tx, "Alfalfa Consortium")
            .await
            .unwrap();
        let found = find_program_by_name(&mut tx, "Alfalfa Consortium")
            .await
            .unwrap();
        assert_eq!(found.map(|p| p.id), Some(created.id));
    }

    #[sqlx::test(migrations = "../../migrations")]
    #[ignore = "requires a PostgreSQL database"]
    async fn test_link_program_project(pool: PgPool) {
        let mut tx = pool.begin().await.unwrap();

        let program = get_or_create_program(&mut tx, "Sweetpotato Lab").await.unwrap();
        let project = get_or_create_project(&mut tx, "2025 Trials").await.unwrap();

        link_program_project(&mut tx, program.id, project.id)
            .await
            .unwrap();
        // Second link is a no-op rather than a unique violation
        link_program_project(&mut tx, program.id, project.id)
            .await
            .unwrap();
    }
}

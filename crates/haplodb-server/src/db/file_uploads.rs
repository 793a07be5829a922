//! Database operations for upload provenance records.
//!
//! Every successful upload writes one `file_uploads` row inside the same
//! transaction as its data changes, tying the file name and job id to the
//! species version it touched.

use chrono::{DateTime, Utc};
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use super::DbResult;

/// One row of `file_uploads`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FileUpload {
    pub id: Uuid,
    pub file_name: String,
    pub upload_type: String,
    pub file_size: i64,
    pub version: i32,
    pub species: String,
    pub program_id: Option<Uuid>,
    pub job_id: Uuid,
    pub uploaded_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Input for [`create_file_upload`].
#[derive(Debug, Clone)]
pub struct NewFileUpload<'a> {
    pub file_name: &'a str,
    pub upload_type: &'a str,
    pub file_size: i64,
    pub version: i32,
    pub species: &'a str,
    pub program_id: Option<Uuid>,
    pub job_id: Uuid,
    pub uploaded_by: Option<&'a str>,
}

/// Record one upload's provenance. Called exactly once per successful
/// upload, after the version it references exists.
pub async fn create_file_upload(
    tx: &mut Transaction<'_, Postgres>,
    upload: NewFileUpload<'_>,
) -> DbResult<FileUpload> {
    let row = sqlx::query_as::<_, FileUpload>(
        r#"
        INSERT INTO file_uploads (
            id, file_name, upload_type, file_size, version,
            species, program_id, job_id, uploaded_by
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING id, file_name, upload_type, file_size, version,
                  species, program_id, job_id, uploaded_by, created_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(upload.file_name)
    .bind(upload.upload_type)
    .bind(upload.file_size)
    .bind(upload.version)
    .bind(upload.species)
    .bind(upload.program_id)
    .bind(upload.job_id)
    .bind(upload.uploaded_by)
    .fetch_one(&mut **tx)
    .await?;

    Ok(row)
}

use crate::ingest::{JobKind, JobRegistry, PavPipeline, PavUpload};
use serde::Serialize;
use sqlx::PgPool;

use super::UploadAccepted;

#[derive(Debug, Clone)]
pub struct UploadPavCommand {
    pub file_name: String,
    pub species: String,
    pub program_name: String,
    /// Content type of the uploaded file part, if the client sent one
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

#[derive(Debug, thiserror::Error, Serialize)]
pub enum UploadPavError {
    #[error("A CSV file is required and cannot be empty")]
    FileRequired,
    #[error("PAV uploads must be text/csv, got '{0}'")]
    ContentType(String),
    #[error("Species is required and cannot be empty")]
    SpeciesRequired,
    #[error("Program name is required and cannot be empty")]
    ProgramRequired,
}

impl UploadPavCommand {
    pub fn validate(&self) -> Result<(), UploadPavError> {
        if self.data.is_empty() {
            return Err(UploadPavError::FileRequired);
        }
        match self.content_type.as_deref() {
            Some("text/csv") | None => {}
            Some(other) => return Err(UploadPavError::ContentType(other.to_string())),
        }
        if self.species.trim().is_empty() {
            return Err(UploadPavError::SpeciesRequired);
        }
        if self.program_name.trim().is_empty() {
            return Err(UploadPavError::ProgramRequired);
        }
        Ok(())
    }
}

/// Accept a PAV upload: validate the form synchronously (including the
/// content-type check), register the job and spawn the pipeline. Whether the
/// program and a current version actually exist is checked inside the job.
#[tracing::instrument(skip(db, registry, command), fields(species = %command.species))]
pub async fn handle(
    db: PgPool,
    registry: JobRegistry,
    command: UploadPavCommand,
) -> Result<UploadAccepted, UploadPavError> {
    command.validate()?;

    let job_id = registry.create(JobKind::Pav, &command.file_name);
    let upload = PavUpload {
        file_name: command.file_name,
        species: command.species,
        program_name: command.program_name,
        data: command.data,
    };

    let pipeline = PavPipeline::new(db, registry);
    tokio::spawn(async move {
        pipeline.run(job_id, upload).await;
    });

    Ok(UploadAccepted {
        job_id,
        message: "PAV upload accepted; poll /pav_jobStatus for progress".to_string(),
    })
}

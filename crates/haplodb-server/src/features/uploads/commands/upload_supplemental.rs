use crate::ingest::{JobKind, JobRegistry, SupplementalPipeline, SupplementalUpload};
use serde::Serialize;
use sqlx::PgPool;

use super::UploadAccepted;

#[derive(Debug, Clone)]
pub struct UploadSupplementalCommand {
    pub file_name: String,
    pub species: String,
    pub data: Vec<u8>,
}

#[derive(Debug, thiserror::Error, Serialize)]
pub enum UploadSupplementalError {
    #[error("A CSV file is required and cannot be empty")]
    FileRequired,
    #[error("Species is required and cannot be empty")]
    SpeciesRequired,
}

impl UploadSupplementalCommand {
    pub fn validate(&self) -> Result<(), UploadSupplementalError> {
        if self.data.is_empty() {
            return Err(UploadSupplementalError::FileRequired);
        }
        if self.species.trim().is_empty() {
            return Err(UploadSupplementalError::SpeciesRequired);
        }
        Ok(())
    }
}

/// Accept a supplemental annotation upload: validate the form synchronously,
/// register the job and spawn the pipeline.
#[tracing::instrument(skip(db, registry, command), fields(species = %command.species))]
pub async fn handle(
    db: PgPool,
    registry: JobRegistry,
    command: UploadSupplementalCommand,
) -> Result<UploadAccepted, UploadSupplementalError> {
    command.validate()?;

    let job_id = registry.create(JobKind::Supplemental, &command.file_name);
    let upload = SupplementalUpload {
        file_name: command.file_name,
        species: command.species,
        data: command.data,
    };

    let pipeline = SupplementalPipeline::new(db, registry);
    tokio::spawn(async move {
        pipeline.run(job_id, upload).await;
    });

    Ok(UploadAccepted {
        job_id,
        message: "Supplemental upload accepted; poll /supplemental_jobStatus for progress"
            .to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command() -> UploadSupplementalCommand {
        UploadSupplementalCommand {
            file_name: "annotations.csv".to_string(),
            species: "alfalfa".to_string(),
            data: b"AlleleID,INFO,Associated Trait\nA1,marker,drought\n".to_vec(),
        }
    }

    #[test]
    fn test_validation_success() {
        assert!(command().validate().is_ok());
    }

    #[test]
    fn test_validation_empty_file() {
        let mut cmd = command();
        cmd.data.clear();
        assert!(matches!(
            cmd.validate(),
            Err(UploadSupplementalError::FileRequired)
        ));
    }

    #[test]
    fn test_validation_empty_species() {
        let mut cmd = command();
        cmd.species = "\t".to_string();
        assert!(matches!(
            cmd.validate(),
            Err(UploadSupplementalError::SpeciesRequired)
        ));
    }
}

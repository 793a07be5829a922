use crate::ingest::{JobKind, JobRegistry, MadcPipeline, MadcUpload};
use serde::Serialize;
use sqlx::PgPool;

use super::UploadAccepted;

#[derive(Debug, Clone)]
pub struct UploadMadcCommand {
    pub file_name: String,
    pub species: String,
    pub program_name: String,
    pub project_name: String,
    pub description: Option<String>,
    pub data: Vec<u8>,
}

#[derive(Debug, thiserror::Error, Serialize)]
pub enum UploadMadcError {
    #[error("A CSV file is required and cannot be empty")]
    FileRequired,
    #[error("Species is required and cannot be empty")]
    SpeciesRequired,
    #[error("Program name is required and cannot be empty")]
    ProgramRequired,
    #[error("Project name is required and cannot be empty")]
    ProjectRequired,
}

impl UploadMadcCommand {
    pub fn validate(&self) -> Result<(), UploadMadcError> {
        if self.data.is_empty() {
            return Err(UploadMadcError::FileRequired);
        }
        if self.species.trim().is_empty() {
            return Err(UploadMadcError::SpeciesRequired);
        }
        if self.program_name.trim().is_empty() {
            return Err(UploadMadcError::ProgramRequired);
        }
        if self.project_name.trim().is_empty() {
            return Err(UploadMadcError::ProjectRequired);
        }
        Ok(())
    }
}

/// Accept an MADC upload: validate the form synchronously, register the job
/// and hand the heavy work to a spawned pipeline task.
#[tracing::instrument(skip(db, registry, command), fields(species = %command.species))]
pub async fn handle(
    db: PgPool,
    registry: JobRegistry,
    command: UploadMadcCommand,
) -> Result<UploadAccepted, UploadMadcError> {
    command.validate()?;

    let job_id = registry.create(JobKind::Madc, &command.file_name);
    let upload = MadcUpload {
        file_name: command.file_name,
        species: command.species,
        program_name: command.program_name,
        project_name: command.project_name,
        description: command.description,
        data: command.data,
    };

    let pipeline = MadcPipeline::new(db, registry);
    tokio::spawn(async move {
        pipeline.run(job_id, upload).await;
    });

    Ok(UploadAccepted {
        job_id,
        message: "MADC upload accepted; poll /jobStatus for progress".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command() -> UploadMadcCommand {
        UploadMadcCommand {
            file_name: "alfalfa_madc.csv".to_string(),
            species: "alfalfa".to_string(),
            program_name: "Alfalfa Consortium".to_string(),
            project_name: "2025 Trials".to_string(),
            description: Some("spring panel".to_string()),
            data: b"AlleleID,CloneID,AlleleSequence\nA1,c1,ACGT\n".to_vec(),
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
        assert!(matches!(cmd.validate(), Err(UploadMadcError::FileRequired)));
    }

    #[test]
    fn test_validation_empty_species() {
        let mut cmd = command();
        cmd.species = "  ".to_string();
        assert!(matches!(
            cmd.validate(),
            Err(UploadMadcError::SpeciesRequired)
        ));
    }

    #[test]
    fn test_validation_empty_program() {
        let mut cmd = command();
        cmd.program_name = String::new();
        assert!(matches!(
            cmd.validate(),
            Err(UploadMadcError::ProgramRequired)
        ));
    }

    #[test]
    fn test_validation_empty_project() {
        let mut cmd = command();
        cmd.project_name = String::new();
        assert!(matches!(
            cmd.validate(),
            Err(UploadMadcError::ProjectRequired)
        ));
    }
}

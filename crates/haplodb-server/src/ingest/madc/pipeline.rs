// MADC Pipeline Orchestration
//
// Drives one MADC upload end to end on a spawned task: parse the CSV, run
// the transactional store, build the processed-CSV echo, and mirror the
// outcome into the job registry. The HTTP handler only sees the job id.

use crate::ingest::madc::parser::{parse_madc, MadcRow};
use crate::ingest::madc::storage::MadcStorage;
use crate::ingest::{JobRegistry, Result, UploadError};
use sqlx::PgPool;
use std::collections::HashSet;
use tracing::{error, info};
use uuid::Uuid;

/// Everything the handler collected from the multipart form.
#[derive(Debug, Clone)]
pub struct MadcUpload {
    pub file_name: String,
    pub species: String,
    pub program_name: String,
    pub project_name: String,
    pub description: Option<String>,
    pub data: Vec<u8>,
}

/// MADC upload pipeline.
pub struct MadcPipeline {
    storage: MadcStorage,
    registry: JobRegistry,
}

impl MadcPipeline {
    pub fn new(db: PgPool, registry: JobRegistry) -> Self {
        Self {
            storage: MadcStorage::new(db),
            registry,
        }
    }

    /// Process one upload and record the outcome under `job_id`. Never
    /// returns an error: failures land in the registry.
    #[tracing::instrument(skip(self, upload), fields(job_id = %job_id, species = %upload.species))]
    pub async fn run(&self, job_id: Uuid, upload: MadcUpload) {
        match self.process(job_id, &upload).await {
            Ok((stats, echo)) => {
                info!(
                    total_rows = stats.total_rows,
                    new_sequences = stats.new_sequences,
                    existing_sequences = stats.existing_sequences,
                    presence_added = stats.presence_added,
                    "MADC upload completed"
                );
                self.registry.mark_completed(job_id, stats, Some(echo), None);
            }
            Err(e) => {
                error!(error = %e, "MADC upload failed");
                self.registry.mark_failed(job_id, e.to_string());
            }
        }
    }

    async fn process(
        &self,
        job_id: Uuid,
        upload: &MadcUpload,
    ) -> Result<(crate::ingest::UploadStats, String)> {
        info!("Step 1/3: Parsing MADC file {}", upload.file_name);
        let rows = parse_madc(&upload.data)?;
        info!("Parsed {} unique alleles", rows.len());

        info!("Step 2/3: Storing upload for species {}", upload.species);
        let outcome = self.storage.store(job_id, upload, &rows).await?;

        info!("Step 3/3: Building processed CSV");
        let echo = build_echo(&rows, &outcome.existing)?;

        Ok((outcome.stats, echo))
    }
}

/// Per-row new/existing classification, served by the download endpoint.
fn build_echo(rows: &[MadcRow], existing: &HashSet<String>) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["AlleleID", "AlleleSequence", "Status"])?;
    for row in rows {
        let status = if existing.contains(&row.allele_id) {
            "existing"
        } else {
            "new"
        };
        writer.write_record([row.allele_id.as_str(), row.allele_sequence.as_str(), status])?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| UploadError::Validation(format!("Failed to build processed CSV: {e}")))?;
    String::from_utf8(bytes)
        .map_err(|e| UploadError::Validation(format!("Processed CSV is not valid UTF-8: {e}")))
}

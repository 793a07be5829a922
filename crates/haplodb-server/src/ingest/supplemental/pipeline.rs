// Supplemental Pipeline Orchestration
//
// Drives one supplemental upload on a spawned task: parse, apply annotation
// updates, echo the per-row outcome, and mirror the result into the job
// registry.

use crate::ingest::supplemental::parser::parse_supplemental;
use crate::ingest::supplemental::storage::SupplementalStorage;
use crate::ingest::{JobRegistry, Result, UploadError};
use sqlx::PgPool;
use tracing::{error, info};
use uuid::Uuid;

/// Everything the handler collected from the multipart form.
#[derive(Debug, Clone)]
pub struct SupplementalUpload {
    pub file_name: String,
    pub species: String,
    pub data: Vec<u8>,
}

/// Supplemental upload pipeline.
pub struct SupplementalPipeline {
    storage: SupplementalStorage,
    registry: JobRegistry,
}

impl SupplementalPipeline {
    pub fn new(db: PgPool, registry: JobRegistry) -> Self {
        Self {
            storage: SupplementalStorage::new(db),
            registry,
        }
    }

    /// Process one upload and record the outcome under `job_id`. Never
    /// returns an error: failures land in the registry.
    #[tracing::instrument(skip(self, upload), fields(job_id = %job_id, species = %upload.species))]
    pub async fn run(&self, job_id: Uuid, upload: SupplementalUpload) {
        match self.process(job_id, &upload).await {
            Ok((stats, echo, missing)) => {
                info!(
                    total_rows = stats.total_rows,
                    annotations_updated = stats.annotations_updated,
                    rows_skipped_missing = stats.rows_skipped_missing,
                    "Supplemental upload completed"
                );
                self.registry
                    .mark_completed(job_id, stats, Some(echo), Some(missing));
            }
            Err(e) => {
                error!(error = %e, "Supplemental upload failed");
                self.registry.mark_failed(job_id, e.to_string());
            }
        }
    }

    async fn process(
        &self,
        job_id: Uuid,
        upload: &SupplementalUpload,
    ) -> Result<(crate::ingest::UploadStats, String, Vec<String>)> {
        info!("Step 1/3: Parsing supplemental file {}", upload.file_name);
        let rows = parse_supplemental(&upload.data)?;
        info!("Parsed {} annotation rows", rows.len());

        info!("Step 2/3: Applying updates for species {}", upload.species);
        let outcome = self.storage.store(job_id, upload, &rows).await?;

        info!("Step 3/3: Building processed CSV");
        let echo = build_echo(&outcome.row_results)?;

        Ok((outcome.stats, echo, outcome.missing_allele_ids))
    }
}

/// Per-row updated/missed report, served by the download endpoint.
fn build_echo(row_results: &[(String, bool)]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["AlleleID", "Updated"])?;
    for (allele_id, updated) in row_results {
        writer.write_record([allele_id.as_str(), if *updated { "true" } else { "false" }])?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| UploadError::Validation(format!("Failed to build processed CSV: {e}")))?;
    String::from_utf8(bytes)
        .map_err(|e| UploadError::Validation(format!("Processed CSV is not valid UTF-8: {e}")))
}

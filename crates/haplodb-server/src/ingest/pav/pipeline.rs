// PAV Pipeline Orchestration
//
// Drives one PAV upload on a spawned task: parse the matrix, run the
// transactional store, echo the inserted pairs, and mirror the outcome into
// the job registry.

use crate::ingest::pav::parser::parse_pav;
use crate::ingest::pav::storage::PavStorage;
use crate::ingest::{JobRegistry, Result, UploadError};
use sqlx::PgPool;
use tracing::{error, info};
use uuid::Uuid;

/// Everything the handler collected from the multipart form.
#[derive(Debug, Clone)]
pub struct PavUpload {
    pub file_name: String,
    pub species: String,
    pub program_name: String,
    pub data: Vec<u8>,
}

/// PAV upload pipeline.
pub struct PavPipeline {
    storage: PavStorage,
    registry: JobRegistry,
}

impl PavPipeline {
    pub fn new(db: PgPool, registry: JobRegistry) -> Self {
        Self {
            storage: PavStorage::new(db),
            registry,
        }
    }

    /// Process one upload and record the outcome under `job_id`. Never
    /// returns an error: failures land in the registry.
    #[tracing::instrument(skip(self, upload), fields(job_id = %job_id, species = %upload.species))]
    pub async fn run(&self, job_id: Uuid, upload: PavUpload) {
        match self.process(job_id, &upload).await {
            Ok((stats, echo, missing)) => {
                info!(
                    total_rows = stats.total_rows,
                    presence_added = stats.presence_added,
                    presence_skipped = stats.presence_skipped,
                    rows_skipped_missing = stats.rows_skipped_missing,
                    "PAV upload completed"
                );
                self.registry
                    .mark_completed(job_id, stats, Some(echo), Some(missing));
            }
            Err(e) => {
                error!(error = %e, "PAV upload failed");
                self.registry.mark_failed(job_id, e.to_string());
            }
        }
    }

    async fn process(
        &self,
        job_id: Uuid,
        upload: &PavUpload,
    ) -> Result<(crate::ingest::UploadStats, String, Vec<String>)> {
        info!("Step 1/3: Parsing PAV file {}", upload.file_name);
        let matrix = parse_pav(&upload.data)?;
        info!(
            "Parsed {} allele rows across {} accessions",
            matrix.rows.len(),
            matrix.accessions.len()
        );

        info!("Step 2/3: Storing upload for species {}", upload.species);
        let outcome = self.storage.store(job_id, upload, &matrix).await?;

        info!("Step 3/3: Building processed CSV");
        let echo = build_echo(&outcome.inserted_pairs)?;

        Ok((outcome.stats, echo, outcome.missing_allele_ids))
    }
}

/// The pairs this upload actually inserted, served by the download endpoint.
fn build_echo(pairs: &[(String, String)]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["AlleleID", "Accession"])?;
    for (allele_id, accession) in pairs {
        writer.write_record([allele_id.as_str(), accession.as_str()])?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| UploadError::Validation(format!("Failed to build processed CSV: {e}")))?;
    String::from_utf8(bytes)
        .map_err(|e| UploadError::Validation(format!("Processed CSV is not valid UTF-8: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_echo_lists_inserted_pairs() {
        let pairs = vec![
            ("A1".to_string(), "Beauregard".to_string()),
            ("A1".to_string(), "Covington".to_string()),
        ];
        let echo = build_echo(&pairs).unwrap();
        let mut lines = echo.lines();
        assert_eq!(lines.next(), Some("AlleleID,Accession"));
        assert_eq!(lines.next(), Some("A1,Beauregard"));
        assert_eq!(lines.next(), Some("A1,Covington"));
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn test_accession_with_comma_is_quoted() {
        let pairs = vec![("A1".to_string(), "Selection 14, early".to_string())];
        let echo = build_echo(&pairs).unwrap();
        assert!(echo.contains("\"Selection 14, early\""));
    }
}

// MADC Storage
//
// Runs every database write for one MADC upload inside a single transaction:
// program/project resolution, version allocation, provenance, the sequence
// upsert and the program-presence reconciliation. Nothing is visible until
// the final commit, so a failure at any step leaves the store untouched.

use crate::db::{file_uploads, presence, programs, sequences, versions, DbError};
use crate::ingest::chunker;
use crate::ingest::jobs::UploadStats;
use crate::ingest::madc::parser::MadcRow;
use crate::ingest::madc::pipeline::MadcUpload;
use crate::ingest::Result;
use sqlx::PgPool;
use std::collections::HashSet;
use tracing::info;
use uuid::Uuid;

/// What one stored MADC upload produced. `existing` feeds the processed-CSV
/// echo (per-row new/existing status).
#[derive(Debug)]
pub struct MadcOutcome {
    pub version: i32,
    pub stats: UploadStats,
    pub existing: HashSet<String>,
}

/// Transactional writer for MADC uploads.
pub struct MadcStorage {
    db: PgPool,
}

impl MadcStorage {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Store one parsed upload. Commits on success; any error rolls the
    /// whole transaction back.
    pub async fn store(
        &self,
        job_id: Uuid,
        upload: &MadcUpload,
        rows: &[MadcRow],
    ) -> Result<MadcOutcome> {
        let mut tx = self.db.begin().await.map_err(DbError::from)?;

        let program = programs::get_or_create_program(&mut tx, &upload.program_name).await?;
        let project = programs::get_or_create_project(&mut tx, &upload.project_name).await?;
        programs::link_program_project(&mut tx, program.id, project.id).await?;

        let allele_ids: Vec<String> = rows.iter().map(|r| r.allele_id.clone()).collect();
        let existing =
            sequences::fetch_existing_allele_ids(&mut tx, &upload.species, &allele_ids).await?;

        let version = versions::next_version(&mut tx, &upload.species).await?;
        versions::create_version(
            &mut tx,
            version,
            &upload.species,
            program.id,
            upload.description.as_deref(),
            None,
        )
        .await?;
        info!(species = %upload.species, version, "Allocated database version");

        file_uploads::create_file_upload(
            &mut tx,
            file_uploads::NewFileUpload {
                file_name: &upload.file_name,
                upload_type: "madc",
                file_size: upload.data.len() as i64,
                version,
                species: &upload.species,
                program_id: Some(program.id),
                job_id,
                uploaded_by: None,
            },
        )
        .await?;

        // Sequence upsert: only alleles unseen for this species
        let new_rows: Vec<sequences::NewSequence> = rows
            .iter()
            .filter(|r| !existing.contains(&r.allele_id))
            .map(|r| sequences::NewSequence {
                allele_id: r.allele_id.clone(),
                species: upload.species.clone(),
                allele_sequence: r.allele_sequence.clone(),
                version_added: version,
            })
            .collect();

        let mut new_sequences = 0u64;
        let total_chunks = chunker::chunk_count(new_rows.len(), sequences::SEQUENCE_INSERT_PARAMS);
        for (i, chunk) in chunker::chunks(&new_rows, sequences::SEQUENCE_INSERT_PARAMS).enumerate()
        {
            info!(
                "Storing sequences chunk {} / {} ({} rows)",
                i + 1,
                total_chunks,
                chunk.len()
            );
            new_sequences += sequences::insert_batch(&mut tx, chunk).await?;
        }

        // Program presence: link every allele in the file that is not linked yet
        let linked =
            presence::fetch_linked_allele_ids(&mut tx, program.id, &upload.species, &allele_ids)
                .await?;
        let presence_rows: Vec<presence::NewSequencePresence> = rows
            .iter()
            .filter(|r| !linked.contains(&r.allele_id))
            .map(|r| presence::NewSequencePresence {
                program_id: program.id,
                allele_id: r.allele_id.clone(),
                species: upload.species.clone(),
                version_added: version,
            })
            .collect();

        let mut presence_added = 0u64;
        let total_chunks =
            chunker::chunk_count(presence_rows.len(), presence::SEQUENCE_PRESENCE_INSERT_PARAMS);
        for (i, chunk) in
            chunker::chunks(&presence_rows, presence::SEQUENCE_PRESENCE_INSERT_PARAMS).enumerate()
        {
            info!(
                "Storing program presence chunk {} / {} ({} rows)",
                i + 1,
                total_chunks,
                chunk.len()
            );
            presence_added += presence::insert_sequence_presence_batch(&mut tx, chunk).await?;
        }

        tx.commit().await.map_err(DbError::from)?;

        let total_rows = rows.len() as u64;
        let stats = UploadStats {
            total_rows,
            new_sequences,
            existing_sequences: total_rows - new_sequences,
            presence_added,
            ..Default::default()
        };

        Ok(MadcOutcome {
            version,
            stats,
            existing,
        })
    }
}

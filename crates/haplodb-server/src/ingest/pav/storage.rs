// PAV Storage
//
// Runs every database write for one PAV upload inside a single transaction.
// The program must already exist, the species must already have a database
// version, and every allele referenced by an inserted pair must already be a
// sequence row. Accessions are the only entities created here.

use crate::db::{accessions, file_uploads, presence, programs, sequences, versions, DbError};
use crate::ingest::chunker;
use crate::ingest::jobs::UploadStats;
use crate::ingest::pav::parser::PavMatrix;
use crate::ingest::pav::pipeline::PavUpload;
use crate::ingest::{Result, UploadError};
use sqlx::PgPool;
use std::collections::{HashMap, HashSet};
use tracing::info;
use uuid::Uuid;

/// What one stored PAV upload produced. `inserted_pairs` feeds the
/// processed-CSV echo in file order.
#[derive(Debug)]
pub struct PavOutcome {
    pub version: i32,
    pub stats: UploadStats,
    pub missing_allele_ids: Vec<String>,
    pub inserted_pairs: Vec<(String, String)>,
}

struct CandidatePair {
    allele_id: String,
    accession_name: String,
    accession_id: Uuid,
}

/// Transactional writer for PAV uploads.
pub struct PavStorage {
    db: PgPool,
}

impl PavStorage {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Store one parsed matrix. Commits on success; any error rolls the
    /// whole transaction back.
    pub async fn store(
        &self,
        job_id: Uuid,
        upload: &PavUpload,
        matrix: &PavMatrix,
    ) -> Result<PavOutcome> {
        let mut tx = self.db.begin().await.map_err(DbError::from)?;

        let program = programs::find_program_by_name(&mut tx, &upload.program_name)
            .await?
            .ok_or_else(|| UploadError::UnknownProgram(upload.program_name.clone()))?;

        // Attach to the current version; PAV never allocates one
        let current = versions::latest_version(&mut tx, &upload.species)
            .await?
            .ok_or_else(|| UploadError::NoVersionForSpecies(upload.species.clone()))?;
        info!(
            species = %upload.species,
            version = current.version,
            "Attaching PAV upload to current version"
        );

        let accession_ids = self.resolve_accessions(&mut tx, &matrix.accessions).await?;

        let allele_ids: Vec<String> = matrix.rows.iter().map(|r| r.allele_id.clone()).collect();
        let known =
            sequences::fetch_existing_allele_ids(&mut tx, &upload.species, &allele_ids).await?;

        // Build candidate pairs from the true cells of known alleles,
        // de-duplicated in file order
        let mut missing_allele_ids = Vec::new();
        let mut rows_skipped_missing = 0u64;
        let mut candidates: Vec<CandidatePair> = Vec::new();
        let mut seen: HashSet<(String, Uuid)> = HashSet::new();
        for row in &matrix.rows {
            if !known.contains(&row.allele_id) {
                rows_skipped_missing += 1;
                missing_allele_ids.push(row.allele_id.clone());
                continue;
            }
            for (i, present) in row.presence.iter().enumerate() {
                if !present {
                    continue;
                }
                let name = &matrix.accessions[i];
                let accession_id = *accession_ids.get(name).ok_or_else(|| {
                    UploadError::MissingReference(format!("accession '{name}' was not resolved"))
                })?;
                if seen.insert((row.allele_id.clone(), accession_id)) {
                    candidates.push(CandidatePair {
                        allele_id: row.allele_id.clone(),
                        accession_name: name.clone(),
                        accession_id,
                    });
                }
            }
        }

        // Drop pairs already recorded for the species
        let recorded = presence::fetch_existing_pairs(&mut tx, &upload.species, &allele_ids).await?;
        let mut presence_skipped = 0u64;
        let mut to_insert: Vec<CandidatePair> = Vec::new();
        for pair in candidates {
            if recorded.contains(&(pair.allele_id.clone(), pair.accession_id)) {
                presence_skipped += 1;
            } else {
                to_insert.push(pair);
            }
        }

        self.revalidate_references(&mut tx, upload, current.version, &to_insert)
            .await?;

        let rows: Vec<presence::NewAllelePresence> = to_insert
            .iter()
            .map(|pair| presence::NewAllelePresence {
                allele_id: pair.allele_id.clone(),
                species: upload.species.clone(),
                accession_id: pair.accession_id,
                version_added: current.version,
            })
            .collect();

        let mut presence_added = 0u64;
        let total_chunks = chunker::chunk_count(rows.len(), presence::ALLELE_PRESENCE_INSERT_PARAMS);
        for (i, chunk) in
            chunker::chunks(&rows, presence::ALLELE_PRESENCE_INSERT_PARAMS).enumerate()
        {
            info!(
                "Storing accession presence chunk {} / {} ({} rows)",
                i + 1,
                total_chunks,
                chunk.len()
            );
            presence_added += presence::insert_allele_presence_batch(&mut tx, chunk).await?;
        }

        file_uploads::create_file_upload(
            &mut tx,
            file_uploads::NewFileUpload {
                file_name: &upload.file_name,
                upload_type: "pav",
                file_size: upload.data.len() as i64,
                version: current.version,
                species: &upload.species,
                program_id: Some(program.id),
                job_id,
                uploaded_by: None,
            },
        )
        .await?;

        tx.commit().await.map_err(DbError::from)?;

        let stats = UploadStats {
            total_rows: matrix.rows.len() as u64,
            presence_added,
            presence_skipped,
            rows_skipped_missing,
            ..Default::default()
        };

        Ok(PavOutcome {
            version: current.version,
            stats,
            missing_allele_ids,
            inserted_pairs: to_insert
                .into_iter()
                .map(|pair| (pair.allele_id, pair.accession_name))
                .collect(),
        })
    }

    /// Get-or-create the whole accession header, chunked so the insert half
    /// stays under the parameter ceiling.
    async fn resolve_accessions(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        names: &[String],
    ) -> Result<HashMap<String, Uuid>> {
        let mut resolved = HashMap::with_capacity(names.len());
        for chunk in chunker::chunks(names, accessions::ACCESSION_INSERT_PARAMS) {
            resolved.extend(accessions::get_or_create_batch(tx, chunk).await?);
        }
        Ok(resolved)
    }

    /// Confirm every key the batch is about to reference actually exists:
    /// the version row, all accessions, all sequences. Failing here aborts
    /// the job before anything is inserted.
    async fn revalidate_references(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        upload: &PavUpload,
        version: i32,
        to_insert: &[CandidatePair],
    ) -> Result<()> {
        if !versions::version_exists(tx, &upload.species, version).await? {
            return Err(UploadError::MissingReference(format!(
                "version {version} for species '{}' disappeared",
                upload.species
            )));
        }

        let accession_ids: Vec<Uuid> = to_insert
            .iter()
            .map(|p| p.accession_id)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let found = accessions::count_existing(tx, &accession_ids).await?;
        if found != accession_ids.len() as i64 {
            return Err(UploadError::MissingReference(format!(
                "{} of {} accessions missing from the store",
                accession_ids.len() as i64 - found,
                accession_ids.len()
            )));
        }

        let allele_ids: Vec<String> = to_insert
            .iter()
            .map(|p| p.allele_id.clone())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let found = sequences::count_existing(tx, &upload.species, &allele_ids).await?;
        if found != allele_ids.len() as i64 {
            return Err(UploadError::MissingReference(format!(
                "{} of {} alleles missing from the store",
                allele_ids.len() as i64 - found,
                allele_ids.len()
            )));
        }

        Ok(())
    }
}

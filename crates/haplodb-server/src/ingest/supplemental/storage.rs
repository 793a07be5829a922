// Supplemental Storage
//
// Applies annotation updates row by row inside one transaction. Unknown
// alleles are a per-row miss, not a failure; the only referential
// requirement is a current database version for the provenance record.

use crate::db::{file_uploads, sequences, versions, DbError};
use crate::ingest::jobs::UploadStats;
use crate::ingest::supplemental::parser::SupplementalRow;
use crate::ingest::supplemental::pipeline::SupplementalUpload;
use crate::ingest::{Result, UploadError};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

/// What one stored supplemental upload produced. `row_results` pairs each
/// file row with whether its sequence was found and updated.
#[derive(Debug)]
pub struct SupplementalOutcome {
    pub version: i32,
    pub stats: UploadStats,
    pub row_results: Vec<(String, bool)>,
    pub missing_allele_ids: Vec<String>,
}

/// Transactional writer for supplemental uploads.
pub struct SupplementalStorage {
    db: PgPool,
}

impl SupplementalStorage {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Store one parsed upload. Commits on success; any error rolls the
    /// whole transaction back.
    pub async fn store(
        &self,
        job_id: Uuid,
        upload: &SupplementalUpload,
        rows: &[SupplementalRow],
    ) -> Result<SupplementalOutcome> {
        let mut tx = self.db.begin().await.map_err(DbError::from)?;

        // Provenance needs a version to attach to
        let current = versions::latest_version(&mut tx, &upload.species)
            .await?
            .ok_or_else(|| UploadError::NoVersionForSpecies(upload.species.clone()))?;

        let mut row_results = Vec::with_capacity(rows.len());
        let mut missing_allele_ids = Vec::new();
        let mut annotations_updated = 0u64;
        for row in rows {
            let updated = sequences::update_annotations(
                &mut tx,
                &upload.species,
                &row.allele_id,
                row.info.as_deref(),
                row.associated_trait.as_deref(),
            )
            .await?;
            if updated {
                annotations_updated += 1;
            } else {
                missing_allele_ids.push(row.allele_id.clone());
            }
            row_results.push((row.allele_id.clone(), updated));
        }
        info!(
            species = %upload.species,
            updated = annotations_updated,
            missing = missing_allele_ids.len(),
            "Applied annotation updates"
        );

        file_uploads::create_file_upload(
            &mut tx,
            file_uploads::NewFileUpload {
                file_name: &upload.file_name,
                upload_type: "supplemental",
                file_size: upload.data.len() as i64,
                version: current.version,
                species: &upload.species,
                program_id: None,
                job_id,
                uploaded_by: None,
            },
        )
        .await?;

        tx.commit().await.map_err(DbError::from)?;

        let stats = UploadStats {
            total_rows: rows.len() as u64,
            annotations_updated,
            rows_skipped_missing: missing_allele_ids.len() as u64,
            ..Default::default()
        };

        Ok(SupplementalOutcome {
            version: current.version,
            stats,
            row_results,
            missing_allele_ids,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::madc::{MadcRow, MadcStorage, MadcUpload};

    fn supplemental_upload(species: &str) -> SupplementalUpload {
        SupplementalUpload {
            file_name: "annotations.csv".to_string(),
            species: species.to_string(),
            data: Vec::new(),
        }
    }

    fn row(id: &str, info: Option<&str>, associated_trait: Option<&str>) -> SupplementalRow {
        SupplementalRow {
            allele_id: id.to_string(),
            info: info.map(str::to_string),
            associated_trait: associated_trait.map(str::to_string),
        }
    }

    async fn seed_madc(pool: &PgPool, species: &str, ids: &[&str]) {
        let rows: Vec<MadcRow> = ids
            .iter()
            .map(|id| MadcRow {
                allele_id: id.to_string(),
                allele_sequence: "ACGT".to_string(),
            })
            .collect();
        MadcStorage::new(pool.clone())
            .store(
                Uuid::new_v4(),
                &MadcUpload {
                    file_name: "seed.csv".to_string(),
                    species: species.to_string(),
                    program_name: "Seed Program".to_string(),
                    project_name: "Seed".to_string(),
                    description: None,
                    data: Vec::new(),
                },
                &rows,
            )
            .await
            .unwrap();
    }

    #[sqlx::test(migrations = "../../migrations")]
    #[ignore = "requires a PostgreSQL database"]
    async fn test_misses_are_collected_not_fatal(pool: PgPool) {
        seed_madc(&pool, "alfalfa", &["A1", "A2"]).await;

        let rows = vec![
            row("A1", Some("drought marker"), Some("drought tolerance")),
            row("A9", Some("x"), None),
            row("A2", None, Some("yield")),
        ];
        let outcome = SupplementalStorage::new(pool)
            .store(Uuid::new_v4(), &supplemental_upload("alfalfa"), &rows)
            .await
            .unwrap();

        assert_eq!(outcome.stats.total_rows, 3);
        assert_eq!(outcome.stats.annotations_updated, 2);
        assert_eq!(outcome.stats.rows_skipped_missing, 1);
        assert_eq!(outcome.missing_allele_ids, vec!["A9".to_string()]);
        assert_eq!(
            outcome.row_results,
            vec![
                ("A1".to_string(), true),
                ("A9".to_string(), false),
                ("A2".to_string(), true),
            ]
        );
    }

    #[sqlx::test(migrations = "../../migrations")]
    #[ignore = "requires a PostgreSQL database"]
    async fn test_no_version_fails_the_upload(pool: PgPool) {
        let rows = vec![row("A1", Some("x"), None)];
        let err = SupplementalStorage::new(pool)
            .store(Uuid::new_v4(), &supplemental_upload("cranberry"), &rows)
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::NoVersionForSpecies(_)));
    }
}

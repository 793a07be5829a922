//! Upload ingestion pipelines
//!
//! Everything between an accepted multipart upload and its committed
//! database rows lives here.
//!
//! # Architecture
//!
//! - **chunker**: Sub-batch sizing under the bind-parameter ceiling
//! - **jobs**: In-memory job registry (JobRegistry, JobState, UploadStats)
//! - **madc**: MADC allele-definition uploads (allocates a new version)
//! - **pav**: Presence/absence matrix uploads (attaches to the current version)
//! - **supplemental**: Annotation updates for existing sequences
//!
//! Each format follows the same shape: a parser turning CSV bytes into typed
//! rows, a storage layer running every write inside one transaction, and a
//! pipeline orchestrating parse/store and mirroring progress into the job
//! registry. Pipelines run on spawned tasks; the HTTP layer only creates the
//! registry entry and returns the job id.

pub mod chunker;
pub mod jobs;
pub mod madc;
pub mod pav;
pub mod supplemental;

pub use jobs::{spawn_sweeper, JobKind, JobRegistry, JobState, JobStatus, UploadStats};
pub use madc::{MadcPipeline, MadcUpload};
pub use pav::{PavPipeline, PavUpload};
pub use supplemental::{SupplementalPipeline, SupplementalUpload};

use crate::db::DbError;
use thiserror::Error;

/// Result type for ingestion operations
pub type Result<T> = std::result::Result<T, UploadError>;

/// Error types shared by the three upload pipelines.
///
/// Everything here marks the job Failed; per-row misses (unknown alleles in
/// PAV or supplemental files) are counted in [`UploadStats`] instead of
/// raised.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Invalid CSV format at line {line}: {message}")]
    InvalidFormat { line: usize, message: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unknown program: {0}")]
    UnknownProgram(String),

    #[error("No database version exists for species: {0}")]
    NoVersionForSpecies(String),

    #[error("Missing referenced keys: {0}")]
    MissingReference(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Database error: {0}")]
    Database(#[from] DbError),
}

impl UploadError {
    pub(crate) fn invalid_format(line: usize, message: impl Into<String>) -> Self {
        UploadError::InvalidFormat {
            line,
            message: message.into(),
        }
    }
}

//! Feature modules implementing the HaploDB API
//!
//! Each feature is a vertical slice with its own commands and routes:
//!
//! - **uploads**: the three multipart upload endpoints (MADC, PAV,
//!   supplemental) that accept a file, register a job, and spawn a pipeline
//! - **jobs**: read-only polling endpoints for job status plus the
//!   processed-CSV download
//!
//! Handlers share [`FeatureState`]: the database pool the pipelines write
//! through and the in-memory job registry they report into.

pub mod jobs;
pub mod uploads;

use crate::ingest::JobRegistry;
use axum::Router;

/// Shared state for all feature routes
#[derive(Clone)]
pub struct FeatureState {
    /// PostgreSQL connection pool
    pub db: sqlx::PgPool,
    /// In-memory upload job registry
    pub jobs: JobRegistry,
}

/// All feature routes, mounted at the root to match the polling frontend:
/// `/upload`, `/pav_upload`, `/supplemental_upload`, the three
/// `*jobStatus` endpoints, and `/download/:job_id`.
pub fn router(state: FeatureState) -> Router<()> {
    Router::new()
        .merge(uploads::upload_routes())
        .merge(jobs::job_routes())
        .with_state(state)
}

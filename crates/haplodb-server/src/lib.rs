//! HaploDB Server Library
//!
//! HTTP backend for the HaploDB allele/haplotype database.
//!
//! # Overview
//!
//! The server ingests tabular allele data for multiple plant species and
//! maintains a per-species versioned database of sequences and presence
//! links:
//!
//! - **Upload pipelines**: MADC allele definitions, PAV presence/absence
//!   matrices, and supplemental annotation files, each processed on a
//!   background task with job-registry polling
//! - **Database layer**: PostgreSQL via SQLx, one repository module per
//!   entity, all writes transactional per upload
//! - **Configuration**: environment-based with validated defaults
//! - **Middleware**: CORS, request tracing, response compression
//!
//! # Architecture
//!
//! Features are vertical slices (`features/uploads`, `features/jobs`) over a
//! plain repository layer (`db/`); the heavy lifting lives in `ingest/`,
//! where each upload format has a parser, a transactional storage layer, and
//! a pipeline orchestrator. Upload handlers accept the file, register a job,
//! spawn the pipeline, and return the job id immediately; everything after
//! acceptance is observable only through the polling endpoints.
//!
//! # Example
//!
//! ```no_run
//! use haplodb_server::{api, config::Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     api::serve(config).await?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod db;
pub mod features;
pub mod ingest;
pub mod middleware;

// Re-export commonly used types
pub use api::response::ErrorResponse;

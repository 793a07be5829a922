//! Jobs feature: read-only polling over the in-memory job registry.
//!
//! One status endpoint per upload kind plus the processed-CSV download.
//! Nothing here mutates a job; entries appear when an upload is accepted and
//! disappear when the sweeper retires them.

pub mod routes;

pub use routes::job_routes;

//! Upload feature: the three multipart ingestion endpoints.
//!
//! Route handlers read the multipart form, build a command, and hand it to
//! the matching command handler, which validates synchronously, registers a
//! job, and spawns the pipeline. Clients get the job id back immediately and
//! poll the jobs feature for the outcome.

pub mod commands;
pub mod routes;

pub use routes::upload_routes;

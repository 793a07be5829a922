//! Upload commands, one module per upload kind.
//!
//! Each module follows the same template: a command struct carrying the form
//! fields and file bytes, a `validate()` that rejects bad input before any
//! job exists, and a `handle()` that registers the job and spawns the
//! pipeline task.

pub mod upload_madc;
pub mod upload_pav;
pub mod upload_supplemental;

pub use upload_madc::{UploadMadcCommand, UploadMadcError};
pub use upload_pav::{UploadPavCommand, UploadPavError};
pub use upload_supplemental::{UploadSupplementalCommand, UploadSupplementalError};

use serde::Serialize;
use uuid::Uuid;

/// Accepted-upload response: the job id to poll plus a human message.
#[derive(Debug, Clone, Serialize)]
pub struct UploadAccepted {
    pub job_id: Uuid,
    pub message: String,
}

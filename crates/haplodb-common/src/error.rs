//! Error types shared across HaploDB components

use thiserror::Error;

/// Result type alias for HaploDB operations
pub type Result<T> = std::result::Result<T, HaploError>;

/// Main error type for HaploDB shared infrastructure. Domain errors live
/// with the code that raises them (the server's `UploadError`, `DbError`).
#[derive(Error, Debug)]
pub enum HaploError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

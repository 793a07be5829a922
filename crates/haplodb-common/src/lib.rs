//! HaploDB Common Library
//!
//! Shared types, utilities, and error handling for the HaploDB project.
//!
//! # Overview
//!
//! This crate provides common functionality used across all HaploDB workspace members:
//!
//! - **Error Handling**: Custom error types and result types
//! - **Logging**: Centralized tracing configuration with console/file output
//!
//! # Example
//!
//! ```no_run
//! use haplodb_common::logging::{LogConfig, init_logging};
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = LogConfig::from_env()?;
//!     init_logging(&config)?;
//!     Ok(())
//! }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod error;
pub mod logging;

// Re-export commonly used types
pub use error::{HaploError, Result};

// Supplemental Upload Module
//
// Handles supplemental annotation files: per-allele free-text `info` and
// `associated_trait` values layered onto sequences that already exist. Rows
// naming unknown alleles are collected into a missing-ids report rather than
// failing the job; the upload completes either way. No version is allocated,
// but the species must already have one for the provenance record.
//
// Architecture:
// - Parse: exact three-column header, empty cells become NULL
// - Store: one transaction of per-row annotation updates plus provenance
// - Pipeline: orchestration plus job registry bookkeeping

pub mod parser;
pub mod pipeline;
pub mod storage;

pub use parser::{parse_supplemental, SupplementalRow};
pub use pipeline::{SupplementalPipeline, SupplementalUpload};
pub use storage::{SupplementalOutcome, SupplementalStorage};

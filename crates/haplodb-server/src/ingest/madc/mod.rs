// MADC Upload Module
//
// Handles MADC (multi-allelic data conversion) uploads: the allele-definition
// format produced by the marker panels. Column 0 carries the allele id and
// column 2 the allele sequence; everything else in the file is panel metadata
// and is ignored.
//
// This is the only pipeline that advances a species' database version. Every
// upload allocates max(version)+1 for its species, even when the file adds
// nothing new, so the version history records every submission.
//
// Architecture:
// - Parse: header check, row extraction, in-file dedup (first wins)
// - Store: one transaction covering program/project, version, provenance,
//   sequence upsert and program presence
// - Pipeline: orchestration plus job registry bookkeeping

pub mod parser;
pub mod pipeline;
pub mod storage;

pub use parser::{parse_madc, MadcRow};
pub use pipeline::{MadcPipeline, MadcUpload};
pub use storage::{MadcOutcome, MadcStorage};

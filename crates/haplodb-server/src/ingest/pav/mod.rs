// PAV Upload Module
//
// Handles presence/absence variation matrices: rows are alleles, columns are
// germplasm accessions, cells are 0/1 flags (empty reads as 0). A PAV upload
// never advances the database version; it attaches to the species' current
// version and fails outright if none exists. Alleles must already be in the
// database from a MADC upload; rows referencing unknown alleles are counted
// and skipped. Accessions, by contrast, are created on first sight from the
// column headers.
//
// Architecture:
// - Parse: strict header and cell validation into a typed matrix
// - Store: one transaction covering accession resolution, foreign-key
//   revalidation, the presence insert and provenance
// - Pipeline: orchestration plus job registry bookkeeping

pub mod parser;
pub mod pipeline;
pub mod storage;

pub use parser::{parse_pav, PavMatrix, PavRow};
pub use pipeline::{PavPipeline, PavUpload};
pub use storage::{PavOutcome, PavStorage};

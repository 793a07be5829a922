// MADC Parser
//
// File format: CSV with a header row. Column 0 = AlleleID, column 2 =
// AlleleSequence; at least three columns are required and any further
// columns are ignored.
//
// Example:
//   AlleleID,CloneID,AlleleSequence,SNP,Q,p-value
//   chr1.1_0001|RefMatch,chr1.1_0001,ACGTACGT,T>C,45,0.001
//   chr1.1_0002|AltMatch,chr1.1_0002,TTGACCAA,,12,0.05

use crate::ingest::{Result, UploadError};
use csv::ReaderBuilder;
use std::collections::HashSet;
use tracing::debug;

/// One parsed MADC data row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MadcRow {
    pub allele_id: String,
    pub allele_sequence: String,
}

/// Parse MADC CSV bytes into rows, de-duplicated by allele id with the first
/// occurrence winning.
///
/// Structural problems (missing header, fewer than three columns, an empty
/// allele id) fail the whole parse; there is no row-level recovery for this
/// format.
pub fn parse_madc(data: &[u8]) -> Result<Vec<MadcRow>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(data);

    let mut rows = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut header_seen = false;
    let mut line = 0usize;

    for record in reader.records() {
        let record = record?;
        line += 1;

        if !header_seen {
            if record.len() < 3 {
                return Err(UploadError::invalid_format(
                    line,
                    format!(
                        "header must have at least 3 columns (AlleleID, ..., AlleleSequence), got {}",
                        record.len()
                    ),
                ));
            }
            header_seen = true;
            continue;
        }

        // Tolerate trailing blank-ish lines
        if record.iter().all(|field| field.trim().is_empty()) {
            continue;
        }

        if record.len() < 3 {
            return Err(UploadError::invalid_format(
                line,
                format!("expected at least 3 columns, got {}", record.len()),
            ));
        }

        let allele_id = record[0].trim();
        if allele_id.is_empty() {
            return Err(UploadError::invalid_format(line, "empty AlleleID"));
        }

        if !seen.insert(allele_id.to_string()) {
            continue;
        }

        rows.push(MadcRow {
            allele_id: allele_id.to_string(),
            allele_sequence: record[2].trim().to_string(),
        });
    }

    if !header_seen {
        return Err(UploadError::invalid_format(1, "missing header row"));
    }

    debug!("Parsed {} unique MADC rows from {} lines", rows.len(), line);

    Ok(rows)
}

// PAV Parser
//
// File format: CSV with a header row whose first column is literally
// `AlleleID`; every further header cell names an accession. Data cells are
// presence flags: `1` present, `0` or empty absent. Anything else is a
// structural error.
//
// Example:
//   AlleleID,Beauregard,Covington,Murasaki
//   chr1.1_0001|RefMatch,1,0,1
//   chr1.1_0002|AltMatch,0,,1

use crate::ingest::{Result, UploadError};
use csv::ReaderBuilder;
use tracing::debug;

/// One parsed PAV data row; `presence[i]` pairs with
/// [`PavMatrix::accessions`]`[i]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PavRow {
    pub allele_id: String,
    pub presence: Vec<bool>,
}

/// A parsed presence/absence matrix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PavMatrix {
    pub accessions: Vec<String>,
    pub rows: Vec<PavRow>,
}

/// Parse PAV CSV bytes into a matrix. Fails on any structural problem:
/// wrong first header cell, empty accession name, a row wider than the
/// header, an unparseable presence cell.
pub fn parse_pav(data: &[u8]) -> Result<PavMatrix> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(data);

    let mut accessions: Vec<String> = Vec::new();
    let mut rows: Vec<PavRow> = Vec::new();
    let mut header_seen = false;
    let mut line = 0usize;

    for record in reader.records() {
        let record = record?;
        line += 1;

        if !header_seen {
            if record.get(0).map(str::trim) != Some("AlleleID") {
                return Err(UploadError::invalid_format(
                    line,
                    "first header column must be 'AlleleID'",
                ));
            }
            for cell in record.iter().skip(1) {
                let name = cell.trim();
                if name.is_empty() {
                    return Err(UploadError::invalid_format(line, "empty accession name"));
                }
                accessions.push(name.to_string());
            }
            if accessions.is_empty() {
                return Err(UploadError::invalid_format(
                    line,
                    "at least one accession column is required",
                ));
            }
            header_seen = true;
            continue;
        }

        if record.iter().all(|field| field.trim().is_empty()) {
            continue;
        }

        if record.len() > accessions.len() + 1 {
            return Err(UploadError::invalid_format(
                line,
                format!(
                    "row has {} columns but the header has {}",
                    record.len(),
                    accessions.len() + 1
                ),
            ));
        }

        let allele_id = record[0].trim();
        if allele_id.is_empty() {
            return Err(UploadError::invalid_format(line, "empty AlleleID"));
        }

        // Missing trailing cells read as absent
        let mut presence = vec![false; accessions.len()];
        for (i, cell) in record.iter().skip(1).enumerate() {
            presence[i] = match cell.trim() {
                "1" => true,
                "0" | "" => false,
                other => {
                    return Err(UploadError::invalid_format(
                        line,
                        format!("presence cell must be 0, 1 or empty, got '{other}'"),
                    ));
                }
            };
        }

        rows.push(PavRow {
            allele_id: allele_id.to_string(),
            presence,
        });
    }

    if !header_seen {
        return Err(UploadError::invalid_format(1, "missing header row"));
    }

    debug!(
        "Parsed PAV matrix: {} alleles x {} accessions",
        rows.len(),
        accessions.len()
    );

    Ok(PavMatrix { accessions, rows })
}

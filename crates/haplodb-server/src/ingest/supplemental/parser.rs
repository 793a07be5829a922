// Supplemental Parser
//
// File format: CSV whose header is exactly `AlleleID, INFO, Associated
// Trait`. Empty annotation cells mean "clear the field" and parse to None.
//
// Example:
//   AlleleID,INFO,Associated Trait
//   chr1.1_0001|RefMatch,late blight marker,disease resistance
//   chr1.1_0002|AltMatch,,

use crate::ingest::{Result, UploadError};
use csv::ReaderBuilder;
use tracing::debug;

const EXPECTED_HEADER: [&str; 3] = ["AlleleID", "INFO", "Associated Trait"];

/// One parsed supplemental data row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupplementalRow {
    pub allele_id: String,
    pub info: Option<String>,
    pub associated_trait: Option<String>,
}

/// Parse supplemental CSV bytes into rows. The header must match
/// [`EXPECTED_HEADER`] exactly; data rows may omit trailing cells.
pub fn parse_supplemental(data: &[u8]) -> Result<Vec<SupplementalRow>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(data);

    let mut rows = Vec::new();
    let mut header_seen = false;
    let mut line = 0usize;

    for record in reader.records() {
        let record = record?;
        line += 1;

        if !header_seen {
            let header: Vec<&str> = record.iter().map(str::trim).collect();
            if header != EXPECTED_HEADER {
                return Err(UploadError::invalid_format(
                    line,
                    format!(
                        "header must be exactly '{}', got '{}'",
                        EXPECTED_HEADER.join(","),
                        header.join(",")
                    ),
                ));
            }
            header_seen = true;
            continue;
        }

        if record.iter().all(|field| field.trim().is_empty()) {
            continue;
        }

        if record.len() > EXPECTED_HEADER.len() {
            return Err(UploadError::invalid_format(
                line,
                format!("expected at most 3 columns, got {}", record.len()),
            ));
        }

        let allele_id = record[0].trim();
        if allele_id.is_empty() {
            return Err(UploadError::invalid_format(line, "empty AlleleID"));
        }

        rows.push(SupplementalRow {
            allele_id: allele_id.to_string(),
            info: optional_cell(record.get(1)),
            associated_trait: optional_cell(record.get(2)),
        });
    }

    if !header_seen {
        return Err(UploadError::invalid_format(1, "missing header row"));
    }

    debug!("Parsed {} supplemental rows", rows.len());

    Ok(rows)
}

fn optional_cell(cell: Option<&str>) -> Option<String> {
    let trimmed = cell?.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic_file() {
        let data = "\
AlleleID,INFO,Associated Trait
A1,late blight marker,disease resistance
A2,,yield
A3,,
";
        let rows = parse_supplemental(data.as_bytes()).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].info.as_deref(), Some("late blight marker"));
        assert_eq!(rows[0].associated_trait.as_deref(), Some("disease resistance"));
        assert!(rows[1].info.is_none());
        assert_eq!(rows[1].associated_trait.as_deref(), Some("yield"));
        assert!(rows[2].info.is_none());
        assert!(rows[2].associated_trait.is_none());
    }

    #[test]
    fn test_short_rows_fill_with_none() {
        let data = "\
AlleleID,INFO,Associated Trait
A1,some info
A2
";
        let rows = parse_supplemental(data.as_bytes()).unwrap();
        assert_eq!(rows[0].info.as_deref(), Some("some info"));
        assert!(rows[0].associated_trait.is_none());
        assert!(rows[1].info.is_none());
    }

    #[test]
    fn test_wrong_header_is_rejected() {
        let data = "AlleleID,Info,Trait\nA1,x,y\n";
        match parse_supplemental(data.as_bytes()).unwrap_err() {
            UploadError::InvalidFormat { line, message } => {
                assert_eq!(line, 1);
                assert!(message.contains("AlleleID,INFO,Associated Trait"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_reordered_header_is_rejected() {
        let data = "INFO,AlleleID,Associated Trait\nx,A1,y\n";
        assert!(parse_supplemental(data.as_bytes()).is_err());
    }

    #[test]
    fn test_too_wide_row_is_rejected() {
        let data = "\
AlleleID,INFO,Associated Trait
A1,x,y,z
";
        assert!(matches!(
            parse_supplemental(data.as_bytes()),
            Err(UploadError::InvalidFormat { line: 2, .. })
        ));
    }

    #[test]
    fn test_header_cells_are_trimmed() {
        let data = "AlleleID, INFO , Associated Trait\nA1,x,y\n";
        let rows = parse_supplemental(data.as_bytes()).unwrap();
        assert_eq!(rows.len(), 1);
    }
}

//! Edge case tests for the three upload CSV parsers, exercised through the
//! public crate API the pipelines use.

use haplodb_server::ingest::madc::parse_madc;
use haplodb_server::ingest::pav::parse_pav;
use haplodb_server::ingest::supplemental::parse_supplemental;

// ============================================================================
// MADC
// ============================================================================

#[test]
fn test_madc_ignores_extra_metadata_columns() {
    let data = "\
AlleleID,CloneID,AlleleSequence,SNP,CallRate,OneRatioRef,OneRatioSnp
chr1.1_0001|RefMatch,chr1.1_0001,ACGTACGTACGT,T>C,0.99,0.5,0.5
chr1.1_0001|AltMatch,chr1.1_0001,ACGTACATACGT,T>C,0.99,0.5,0.5
";
    let rows = parse_madc(data.as_bytes()).expect("valid MADC file");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].allele_id, "chr1.1_0001|RefMatch");
    assert_eq!(rows[0].allele_sequence, "ACGTACGTACGT");
    assert_eq!(rows[1].allele_id, "chr1.1_0001|AltMatch");
}

#[test]
fn test_madc_quoted_fields_with_commas() {
    let data = "\
AlleleID,CloneID,AlleleSequence
\"A1,variant\",c1,ACGT
";
    let rows = parse_madc(data.as_bytes()).expect("quoted fields parse");
    assert_eq!(rows[0].allele_id, "A1,variant");
}

#[test]
fn test_madc_crlf_line_endings() {
    let data = "AlleleID,CloneID,AlleleSequence\r\nA1,c1,ACGT\r\nA2,c2,TTTT\r\n";
    let rows = parse_madc(data.as_bytes()).expect("CRLF file parses");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1].allele_sequence, "TTTT");
}

#[test]
fn test_madc_trailing_blank_lines_are_ignored() {
    let data = "AlleleID,CloneID,AlleleSequence\nA1,c1,ACGT\n\n  ,,\n";
    let rows = parse_madc(data.as_bytes()).expect("blank tail tolerated");
    assert_eq!(rows.len(), 1);
}

#[test]
fn test_madc_large_file_dedup() {
    // 10,000 rows cycling through 1,000 allele ids
    let mut data = String::from("AlleleID,CloneID,AlleleSequence\n");
    for i in 0..10_000 {
        data.push_str(&format!("A{},c{},ACGT\n", i % 1_000, i));
    }
    let rows = parse_madc(data.as_bytes()).expect("large file parses");
    assert_eq!(rows.len(), 1_000);
}

// ============================================================================
// PAV
// ============================================================================

#[test]
fn test_pav_wide_matrix() {
    let accessions: Vec<String> = (0..500).map(|i| format!("ACC{i:03}")).collect();
    let mut data = format!("AlleleID,{}\n", accessions.join(","));
    data.push_str(&format!(
        "A1,{}\n",
        (0..500)
            .map(|i| if i % 2 == 0 { "1" } else { "0" })
            .collect::<Vec<_>>()
            .join(",")
    ));

    let matrix = parse_pav(data.as_bytes()).expect("wide matrix parses");
    assert_eq!(matrix.accessions.len(), 500);
    assert_eq!(matrix.rows[0].presence.iter().filter(|p| **p).count(), 250);
}

#[test]
fn test_pav_header_must_lead_with_allele_id() {
    let data = "Sample,Beauregard\nA1,1\n";
    let err = parse_pav(data.as_bytes()).unwrap_err();
    assert!(err.to_string().contains("AlleleID"));
}

#[test]
fn test_pav_rejects_free_text_cells() {
    let data = "AlleleID,Beauregard\nA1,present\n";
    let err = parse_pav(data.as_bytes()).unwrap_err();
    assert!(err.to_string().contains("line 2"));
}

#[test]
fn test_pav_duplicate_accession_headers_are_kept_positionally() {
    // Two columns with the same name stay two columns; de-duplication of the
    // resulting (allele, accession) pairs happens in storage, not parsing
    let data = "AlleleID,Beauregard,Beauregard\nA1,1,0\n";
    let matrix = parse_pav(data.as_bytes()).expect("duplicate headers parse");
    assert_eq!(matrix.accessions.len(), 2);
    assert_eq!(matrix.rows[0].presence, vec![true, false]);
}

// ============================================================================
// Supplemental
// ============================================================================

#[test]
fn test_supplemental_header_is_case_sensitive() {
    let data = "alleleid,info,associated trait\nA1,x,y\n";
    assert!(parse_supplemental(data.as_bytes()).is_err());
}

#[test]
fn test_supplemental_unicode_annotations() {
    let data = "\
AlleleID,INFO,Associated Trait
A1,résistance au mildiou,tolérance à la sécheresse
";
    let rows = parse_supplemental(data.as_bytes()).expect("unicode parses");
    assert_eq!(rows[0].info.as_deref(), Some("résistance au mildiou"));
}

#[test]
fn test_supplemental_empty_file_fails_with_line_one() {
    let err = parse_supplemental(b"").unwrap_err();
    assert!(err.to_string().contains("line 1"));
}

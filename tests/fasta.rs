use assert_matches::assert_matches;

use kira_msa_builder::config::DEFAULT_HEADER_SPLICE_OFFSET;
use kira_msa_builder::domain::UniparcId;
use kira_msa_builder::error::KiraError;
use kira_msa_builder::fasta::{annotate_record, scan_records};

fn id(value: &str) -> UniparcId {
    value.parse().unwrap()
}

#[test]
fn gene_is_spliced_after_the_uniparc_accession() {
    let body = ">UPI000002ED67 status=active\nMEEPQSDPSV\nEPPLSQETFS\n";
    let record = annotate_record(body, "TP53", &id("UPI000002ED67"), DEFAULT_HEADER_SPLICE_OFFSET)
        .unwrap();
    assert_eq!(record, ">UPI000002ED67|TP53\nMEEPQSDPSV\nEPPLSQETFS\n");
}

#[test]
fn inactive_status_is_removed_too() {
    let body = ">UPI0000126AC8 status=inactive\nMDLSALRVEE";
    let record = annotate_record(body, "BRCA1", &id("UPI0000126AC8"), DEFAULT_HEADER_SPLICE_OFFSET)
        .unwrap();
    assert!(!record.contains("status=active"));
    assert!(!record.contains("status=inactive"));
    assert_eq!(record, ">UPI0000126AC8|BRCA1\nMDLSALRVEE\n");
}

#[test]
fn offset_past_a_short_header_appends_the_gene() {
    let body = ">ABC12345\nMK\n";
    let record = annotate_record(body, "TP53", &id("ABC12345"), DEFAULT_HEADER_SPLICE_OFFSET)
        .unwrap();
    assert_eq!(record, ">ABC12345|TP53\nMK\n");
}

#[test]
fn offset_is_configurable() {
    let body = ">sp|P04637 tumour suppressor\nMEEP\n";
    let record = annotate_record(body, "TP53", &id("P04637"), 10).unwrap();
    assert_eq!(record, ">sp|P04637|TP53 tumour suppressor\nMEEP\n");
}

#[test]
fn body_without_header_is_malformed() {
    let err = annotate_record("<html>busy</html>", "TP53", &id("UPI000002ED67"), 14).unwrap_err();
    assert_matches!(err, KiraError::MalformedRecord { .. });
}

#[test]
fn body_with_two_records_is_malformed() {
    let body = ">UPI000002ED67\nMK\n>UPI0000126AC8\nMD\n";
    let err = annotate_record(body, "TP53", &id("UPI000002ED67"), 14).unwrap_err();
    assert_matches!(err, KiraError::MalformedRecord { ref reason, .. } if reason.contains('2'));
}

#[test]
fn scan_reports_preamble_and_spans() {
    let data = b"junk\n>UPI000002ED67|TP53\nMK\n";
    let scan = scan_records(data);
    assert!(scan.has_preamble);
    assert_eq!(scan.records.len(), 1);
    assert_eq!(scan.records[0].start, 5);
    assert_eq!(scan.records[0].end, data.len() as u64);
    assert!(scan.records[0].belongs_to("TP53", "UPI000002ED67", DEFAULT_HEADER_SPLICE_OFFSET));
    assert!(!scan.records[0].belongs_to("BRCA1", "UPI000002ED67", DEFAULT_HEADER_SPLICE_OFFSET));
}

#[test]
fn annotated_record_is_recognised_at_its_own_offset() {
    let record = annotate_record(">UPI0000000001 status=active\nMK\n", "TP53", &id("UPI0000000001"), 5)
        .unwrap();
    assert_eq!(record, ">UPI0|TP53000000001\nMK\n");
    let scan = scan_records(record.as_bytes());
    assert!(scan.records[0].belongs_to("TP53", "UPI0000000001", 5));
    assert!(!scan.records[0].belongs_to("TP53", "UPI0000000001", DEFAULT_HEADER_SPLICE_OFFSET));
}

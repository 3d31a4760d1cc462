use assert_matches::assert_matches;
use camino::Utf8Path;

use kira_msa_builder::dataset::DatasetReader;
use kira_msa_builder::error::KiraError;

#[test]
fn reads_fixture_into_grouped_plan() {
    let plan = DatasetReader::read(Utf8Path::new("tests/fixtures/genes.tsv")).unwrap();

    let items: Vec<String> = plan.items().iter().map(|item| item.to_string()).collect();
    assert_eq!(
        items,
        vec![
            "TP53:UPI000002ED67",
            "TP53:UPI000002ED67",
            "BRCA1:UPI0000126AC8",
            "EGFR:<missing>",
            "KRAS:<missing>",
        ]
    );
    assert_eq!(plan.fetchable_count(), 3);
    assert_eq!(plan.skipped_count(), 2);
    // duplicate rows stay separate work items
    assert_eq!(plan.positions_of("TP53", "UPI000002ED67"), &[0, 1]);
}

#[test]
fn missing_symbol_column_is_reported() {
    let err = DatasetReader::read(Utf8Path::new("tests/fixtures/no_symbol.tsv")).unwrap_err();
    assert_matches!(err, KiraError::MissingColumn(ref name) if name == "SYMBOL");
}

#[test]
fn identifier_column_is_checked_first() {
    let table = "GENE\tID\nTP53\tUPI000002ED67\n";
    let err = DatasetReader::from_reader(table.as_bytes(), Utf8Path::new("mem.tsv")).unwrap_err();
    assert_matches!(err, KiraError::MissingColumn(ref name) if name == "UNIPARC");
}

#[test]
fn empty_gene_symbol_names_the_row() {
    let table = "SYMBOL\tUNIPARC\nTP53\tUPI000002ED67\n\tUPI0000126AC8\n";
    let err = DatasetReader::from_reader(table.as_bytes(), Utf8Path::new("mem.tsv")).unwrap_err();
    assert_matches!(err, KiraError::TableRow { row: 3, .. });
}

#[test]
fn unreadable_table_is_a_read_error() {
    let err = DatasetReader::read(Utf8Path::new("tests/fixtures/absent.tsv")).unwrap_err();
    assert_matches!(err, KiraError::TableRead { .. });
}

#[test]
fn gene_symbols_that_would_break_a_header_are_rejected() {
    for cell in ["\"TP\n53\"", "\"TP\t53\"", "TP|53"] {
        let table = format!("SYMBOL\tUNIPARC\nBRCA1\tUPI0000126AC8\n{cell}\tUPI000002ED67\n");
        let err =
            DatasetReader::from_reader(table.as_bytes(), Utf8Path::new("mem.tsv")).unwrap_err();
        assert_matches!(err, KiraError::TableRow { row: 3, .. });
    }
}

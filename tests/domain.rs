use assert_matches::assert_matches;

use kira_msa_builder::domain::{GeneMap, UniparcId, WorkItem, WorkPlan};
use kira_msa_builder::error::KiraError;

#[test]
fn missing_tokens_parse_to_none() {
    for cell in ["", "  ", "nan", "NaN", "NA", "N/A", "null", "None", "#N/A"] {
        assert_eq!(UniparcId::parse_cell(cell).unwrap(), None, "cell {cell:?}");
    }
    let parsed = UniparcId::parse_cell(" UPI000002ED67 ").unwrap().unwrap();
    assert_eq!(parsed.as_str(), "UPI000002ED67");
}

#[test]
fn identifiers_with_path_characters_are_rejected() {
    assert_matches!(
        "UPI0000/../x".parse::<UniparcId>(),
        Err(KiraError::InvalidIdentifier(_))
    );
    assert_matches!(
        "UPI 0001".parse::<UniparcId>(),
        Err(KiraError::InvalidIdentifier(_))
    );
}

#[test]
fn gene_map_keeps_first_seen_order() {
    let id = |v: &str| Some(v.parse::<UniparcId>().unwrap());
    let map = GeneMap::from_rows(vec![
        ("KRAS", id("UPI0000000005")),
        ("TP53", id("UPI0000000001")),
        ("KRAS", None),
        ("TP53", id("UPI0000000002")),
    ]);
    assert_eq!(map.genes().collect::<Vec<_>>(), vec!["KRAS", "TP53"]);
    assert_eq!(map.identifiers("KRAS").unwrap().len(), 2);

    let plan = WorkPlan::from(map);
    assert_eq!(
        plan.items(),
        &[
            WorkItem::new("KRAS", id("UPI0000000005")),
            WorkItem::new("KRAS", None),
            WorkItem::new("TP53", id("UPI0000000001")),
            WorkItem::new("TP53", id("UPI0000000002")),
        ]
    );
    assert_eq!(plan.completed_through(1), 1);
    assert_eq!(plan.completed_through(3), 3);
    assert_eq!(plan.positions_of("TP53", "UPI0000000002"), &[3]);
    assert!(plan.positions_of("TP53", "UPI0000000005").is_empty());
}

#[test]
fn empty_plan_has_nothing_to_fetch() {
    let plan = WorkPlan::from(GeneMap::new());
    assert!(plan.is_empty());
    assert_eq!(plan.fetchable_count(), 0);
    assert_eq!(plan.nth_fetchable(1), None);
}

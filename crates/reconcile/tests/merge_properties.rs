use reconcile::{reconcile, MergeStrategy, PreviewSnapshot};
use serde_json::json;

#[test]
fn traverse_and_replace_swaps_matching_node() {
    let static_data = json!({"page": {"ref": {"id": "x", "v": 1}}});
    let snapshot = PreviewSnapshot::from_nodes("id", vec![json!({"id": "x", "v": 2})]);

    let out = reconcile(&static_data, &snapshot, &MergeStrategy::TraverseAndReplace);
    assert_eq!(out.data, json!({"page": {"ref": {"id": "x", "v": 2}}}));
    assert!(out.is_preview);
}

#[test]
fn traverse_and_replace_with_empty_snapshot_is_identity() {
    let static_data = json!({"page": {"ref": {"id": "x", "v": 1}}, "list": [1, "two", null]});
    let snapshot = PreviewSnapshot::new("id");

    let out = reconcile(&static_data, &snapshot, &MergeStrategy::TraverseAndReplace);
    assert_eq!(out.data, static_data);
    assert!(!out.is_preview);
}

#[test]
fn traverse_and_replace_without_matches_is_not_preview() {
    let static_data = json!({"page": {"id": "y"}});
    let snapshot = PreviewSnapshot::from_nodes("id", vec![json!({"id": "x"})]);

    let out = reconcile(&static_data, &snapshot, &MergeStrategy::TraverseAndReplace);
    assert_eq!(out.data, static_data);
    assert!(!out.is_preview);
}

#[test]
fn root_replace_or_insert_adds_page_key() {
    let snapshot = PreviewSnapshot::from_nodes(
        "id",
        vec![json!({"id": "n1", "__typename": "Page", "title": "Draft"})],
    );
    let strategy = MergeStrategy::RootReplaceOrInsert { key: "n1".into() };

    let out = reconcile(&json!({}), &snapshot, &strategy);
    assert!(out.is_preview);
    assert_eq!(out.data["page"]["title"], "Draft");
}

#[test]
fn merging_is_repeatable() {
    let static_data = json!({"a": [{"id": "x", "v": 1}, {"id": "x", "v": 1}]});
    let snapshot = PreviewSnapshot::from_nodes("id", vec![json!({"id": "x", "v": 2})]);

    let first = reconcile(&static_data, &snapshot, &MergeStrategy::TraverseAndReplace);
    let second = reconcile(&static_data, &snapshot, &MergeStrategy::TraverseAndReplace);
    assert_eq!(first, second);
    assert_eq!(first.data, json!({"a": [{"id": "x", "v": 2}, {"id": "x", "v": 2}]}));
}

use livepreview::{
    content_digest, Capabilities, CustomTypeModel, LinkTarget, NodeIdentity, NormalizeConfig,
    NormalizedDocument, Normalizer, RawDocument, SharedSliceModel, TypePathRegistry,
};
use serde_json::{json, Value};

fn registry() -> TypePathRegistry {
    let page: CustomTypeModel = serde_json::from_value(json!({
        "id": "page",
        "json": {"Main": {
            "title": {"type": "StructuredText"},
            "related": {"type": "Link"},
            "body": {"type": "Slices", "config": {"choices": {"quote": {"type": "SharedSlice"}}}}
        }}
    }))
    .unwrap();
    let quote: SharedSliceModel = serde_json::from_value(json!({
        "id": "quote",
        "variations": [{"id": "default", "primary": {"author": {"type": "Text"}}}]
    }))
    .unwrap();
    TypePathRegistry::build(&[page], &[quote]).unwrap()
}

fn route(target: &LinkTarget) -> Option<String> {
    Some(format!("/{}", target.id))
}

fn normalize(repository: &str, raw: &str) -> NormalizedDocument {
    let registry = registry();
    let identity = NodeIdentity::for_repository(repository, None).unwrap();
    let config = NormalizeConfig::default();
    let caps = Capabilities::new(route);
    let raw: RawDocument = serde_json::from_str(raw).unwrap();
    Normalizer::new(&registry, &identity, &config, &caps)
        .normalize_document(&raw)
        .unwrap()
}

const PAGE: &str = r#"{
    "id": "P1", "type": "page", "lang": "en-us",
    "data": {
        "title": [{"type": "heading1", "text": "Hello", "spans": []}],
        "related": {"link_type": "Document", "id": "P2", "type": "page"},
        "body": [{"slice_type": "quote", "variation": "default", "primary": {"author": "Ada"}, "items": []}]
    }
}"#;

const PAGE_REORDERED: &str = r#"{
    "data": {
        "body": [{"items": [], "primary": {"author": "Ada"}, "variation": "default", "slice_type": "quote"}],
        "related": {"type": "page", "id": "P2", "link_type": "Document"},
        "title": [{"spans": [], "text": "Hello", "type": "heading1"}]
    },
    "lang": "en-us", "type": "page", "id": "P1"
}"#;

fn slice_id(doc: &NormalizedDocument) -> String {
    doc.field("body").unwrap().as_slices().unwrap()[0]
        .as_slice()
        .unwrap()
        .id
        .clone()
}

#[test]
fn normalizing_twice_gives_identical_nodes() {
    assert_eq!(normalize("blog", PAGE), normalize("blog", PAGE));
}

#[test]
fn key_order_does_not_change_ids_or_digests() {
    let a = normalize("blog", PAGE);
    let b = normalize("blog", PAGE_REORDERED);
    assert_eq!(a.id, b.id);
    assert_eq!(a.content_digest, b.content_digest);
    assert_eq!(slice_id(&a), slice_id(&b));
}

#[test]
fn node_ids_are_scoped_by_repository() {
    let blog = normalize("blog", PAGE);
    let docs = normalize("docs", PAGE);
    assert_eq!(blog.prismic_id, docs.prismic_id);
    assert_ne!(blog.id, docs.id);
    assert_ne!(slice_id(&blog), slice_id(&docs));

    let reference = |doc: &NormalizedDocument| {
        doc.field("related")
            .and_then(|field| field.as_link())
            .and_then(|link| link.document.clone())
            .unwrap()
    };
    let blog_ids = NodeIdentity::for_repository("blog", None).unwrap();
    assert_eq!(reference(&blog).node_id, blog_ids.document_id("P2").unwrap());
    assert_ne!(reference(&blog).node_id, reference(&docs).node_id);
}

#[test]
fn digest_ignores_object_key_order() {
    let a: Value = json!({"a": 1, "b": {"c": [1, 2], "d": null}});
    let b: Value = serde_json::from_str(r#"{"b": {"d": null, "c": [1, 2]}, "a": 1}"#).unwrap();
    assert_eq!(content_digest(&a), content_digest(&b));
    assert_ne!(
        content_digest(&json!({"c": [1, 2]})),
        content_digest(&json!({"c": [2, 1]}))
    );
}

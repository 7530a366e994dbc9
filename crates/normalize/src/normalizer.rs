//! The field normalizer.
//!
//! Dispatch is on `registry.resolve(path)` only. The runtime shape of a value
//! is inspected just far enough to decode it as the type the path says it
//! is; when that fails the value is passed through unchanged and a warning
//! is logged.
use std::time::Instant;

use identity::{content_digest, NodeIdentity};
use indexmap::IndexMap;
use model::{
    DocumentReference, FieldMap, FieldPath, FieldType, ImageField, LinkField, LinkType,
    NormalizedAlternateLanguage, NormalizedDocument, NormalizedField, RawDocument, RawImage,
    RawLink, RawSlice, SliceNode, StructuredTextField,
};
use serde_json::{Map, Value};
use tracing::{debug, warn};
use typepath::TypePathRegistry;

use crate::capabilities::Capabilities;
use crate::config::NormalizeConfig;
use crate::error::NormalizeError;
use crate::images::ImageBuilder;
use crate::richtext::{as_text, parse_blocks, RichTextRenderer};
use crate::type_names::{document_type_name, legacy_slice_type_name, shared_slice_type_name};

/// One normalizer, parameterized by registry, identity namespace, config and
/// capabilities. Cheap to construct; holds only borrows.
#[derive(Clone, Copy)]
pub struct Normalizer<'a> {
    registry: &'a TypePathRegistry,
    identity: &'a NodeIdentity,
    config: &'a NormalizeConfig,
    capabilities: &'a Capabilities,
}

impl<'a> Normalizer<'a> {
    pub fn new(
        registry: &'a TypePathRegistry,
        identity: &'a NodeIdentity,
        config: &'a NormalizeConfig,
        capabilities: &'a Capabilities,
    ) -> Self {
        Self {
            registry,
            identity,
            config,
            capabilities,
        }
    }

    pub fn registry(&self) -> &'a TypePathRegistry {
        self.registry
    }

    pub fn identity(&self) -> &'a NodeIdentity {
        self.identity
    }

    /// Normalize a whole document. Fails only when the document id itself
    /// can't produce a node id.
    pub fn normalize_document(
        &self,
        raw: &RawDocument,
    ) -> Result<NormalizedDocument, NormalizeError> {
        let start = Instant::now();
        match self.normalize_document_inner(raw) {
            Ok(doc) => {
                debug!(
                    prismic_id = %doc.prismic_id,
                    node_id = %doc.id,
                    type_name = %doc.type_name,
                    fields = doc.data.len(),
                    elapsed_micros = start.elapsed().as_micros(),
                    "normalize_success"
                );
                Ok(doc)
            }
            Err(err) => {
                warn!(
                    prismic_id = %raw.id,
                    error = %err,
                    elapsed_micros = start.elapsed().as_micros(),
                    "normalize_failure"
                );
                Err(err)
            }
        }
    }

    fn normalize_document_inner(
        &self,
        raw: &RawDocument,
    ) -> Result<NormalizedDocument, NormalizeError> {
        let id = self.identity.document_id(&raw.id)?;
        let root = FieldPath::root(raw.doc_type.as_str());
        if self.registry.resolve(&root) != Some(FieldType::Document) {
            warn!(
                prismic_id = %raw.id,
                doc_type = %raw.doc_type,
                "custom type missing from type paths; fields pass through"
            );
        }

        let data = self.normalize_map(&root.child("data"), &raw.data);
        let alternate_languages = raw
            .alternate_languages
            .iter()
            .filter_map(|alt| match self.identity.document_id(&alt.id) {
                Ok(node_id) => Some(NormalizedAlternateLanguage {
                    id: alt.id.clone(),
                    uid: alt.uid.clone(),
                    doc_type: alt.doc_type.clone(),
                    lang: alt.lang.clone(),
                    url: self.capabilities.resolve_link(&alt.link_target()),
                    document: DocumentReference::new(node_id, alt.id.as_str()),
                }),
                Err(err) => {
                    warn!(prismic_id = %raw.id, error = %err, "skipping alternate language");
                    None
                }
            })
            .collect();

        Ok(NormalizedDocument {
            id,
            prismic_id: raw.id.clone(),
            repository: self.identity.repository().to_owned(),
            type_name: document_type_name(self.config.prefix(), &raw.doc_type),
            doc_type: raw.doc_type.clone(),
            uid: raw.uid.clone(),
            lang: raw.lang.clone(),
            tags: raw.tags.clone(),
            href: raw.href.clone(),
            url: self.capabilities.resolve_link(&raw.link_target()),
            first_publication_date: raw.first_publication_date.clone(),
            last_publication_date: raw.last_publication_date.clone(),
            alternate_languages,
            data,
            data_raw: raw.data.clone(),
            content_digest: content_digest(&raw.to_value()),
        })
    }

    /// Normalize every entry of a field map; each field is looked up at
    /// `parent.child(name)`.
    pub fn normalize_map(&self, parent: &FieldPath, fields: &Map<String, Value>) -> FieldMap {
        fields
            .iter()
            .map(|(name, value)| {
                let normalized = self.normalize_field(&parent.child(name.as_str()), value);
                (name.clone(), normalized)
            })
            .collect()
    }

    /// Normalize a single value found at `path`.
    pub fn normalize_field(&self, path: &FieldPath, value: &Value) -> NormalizedField {
        let Some(field_type) = self.registry.resolve(path) else {
            warn!(path = %path, "no type path; passing value through");
            return NormalizedField::Raw(value.clone());
        };
        match field_type {
            FieldType::StructuredText => self.structured_text(path, value),
            FieldType::Image | FieldType::ImageThumbnail => self.image(path, value),
            FieldType::Link => self.link(path, value),
            FieldType::Group => self.group(path, value),
            FieldType::Slices => self.slices(path, value),
            t if t.is_primitive() => NormalizedField::Primitive(value.clone()),
            FieldType::Unknown => {
                warn!(path = %path, "unknown field type; passing value through");
                NormalizedField::Raw(value.clone())
            }
            other => {
                warn!(path = %path, field_type = ?other, "container type in field position");
                NormalizedField::Raw(value.clone())
            }
        }
    }

    fn structured_text(&self, path: &FieldPath, value: &Value) -> NormalizedField {
        if value.is_null() {
            return NormalizedField::Primitive(Value::Null);
        }
        let Some(blocks) = parse_blocks(value) else {
            warn!(path = %path, "malformed structured text; passing value through");
            return NormalizedField::Raw(value.clone());
        };
        let renderer = RichTextRenderer {
            links: self.capabilities.link_resolver.as_ref(),
            serializer: self.capabilities.html_serializer.as_deref(),
        };
        NormalizedField::StructuredText(StructuredTextField {
            html: renderer.as_html(&blocks),
            text: as_text(&blocks, &self.config.text_separator),
            raw: value.clone(),
        })
    }

    fn image(&self, path: &FieldPath, value: &Value) -> NormalizedField {
        let Some(raw) = RawImage::from_value(value) else {
            if !is_empty_object(value) {
                warn!(path = %path, "image without url or dimensions; passing value through");
            }
            return NormalizedField::Raw(value.clone());
        };
        let builder = ImageBuilder {
            urls: self.capabilities.image_builder.as_ref(),
            config: self.config,
        };

        let mut thumbnails: IndexMap<String, ImageField> = IndexMap::new();
        let thumbnails_path = path.child("thumbnails");
        for name in self.registry.children(&thumbnails_path) {
            let Some(thumb_value) = value.get(name) else {
                continue;
            };
            match RawImage::from_value(thumb_value) {
                Some(thumb) => {
                    thumbnails.insert(name.to_owned(), builder.image(&thumb, IndexMap::new()));
                }
                None => debug!(path = %thumbnails_path.child(name), "empty thumbnail skipped"),
            }
        }
        NormalizedField::Image(Box::new(builder.image(&raw, thumbnails)))
    }

    fn link(&self, path: &FieldPath, value: &Value) -> NormalizedField {
        let Some(link) = RawLink::from_value(value) else {
            warn!(path = %path, "malformed link; passing value through");
            return NormalizedField::Raw(value.clone());
        };
        let mut raw = value.as_object().cloned().unwrap_or_default();
        raw.remove("url");
        raw.remove("link_type");

        let (url, document) = match link.link_type {
            LinkType::Document => {
                let url = link
                    .link_target()
                    .and_then(|target| self.capabilities.resolve_link(&target));
                let document = link.document_id().filter(|id| !id.is_empty()).and_then(|id| {
                    match self.identity.document_id(id) {
                        Ok(node_id) => Some(DocumentReference::new(node_id, id)),
                        Err(err) => {
                            warn!(path = %path, error = %err, "link target has no node id");
                            None
                        }
                    }
                });
                (url, document)
            }
            LinkType::Web | LinkType::Media => (link.url.clone(), None),
            LinkType::Any => (None, None),
        };

        NormalizedField::Link(Box::new(LinkField {
            link_type: link.link_type,
            url,
            document,
            raw,
        }))
    }

    fn group(&self, path: &FieldPath, value: &Value) -> NormalizedField {
        let items = match value {
            Value::Null => return NormalizedField::Group(Vec::new()),
            Value::Array(items) => items,
            _ => {
                warn!(path = %path, "group is not a list; passing value through");
                return NormalizedField::Raw(value.clone());
            }
        };
        let mut normalized = Vec::with_capacity(items.len());
        for item in items {
            let Some(fields) = item.as_object() else {
                warn!(path = %path, "group element is not a field map; passing value through");
                return NormalizedField::Raw(value.clone());
            };
            normalized.push(self.normalize_map(path, fields));
        }
        NormalizedField::Group(normalized)
    }

    fn slices(&self, zone: &FieldPath, value: &Value) -> NormalizedField {
        let slices = match value {
            Value::Null => return NormalizedField::Slices(Vec::new()),
            Value::Array(slices) => slices,
            _ => {
                warn!(path = %zone, "slice zone is not a list; passing value through");
                return NormalizedField::Raw(value.clone());
            }
        };
        NormalizedField::Slices(slices.iter().map(|slice| self.slice(zone, slice)).collect())
    }

    fn slice(&self, zone: &FieldPath, value: &Value) -> NormalizedField {
        let Some(raw) = RawSlice::from_value(value) else {
            warn!(path = %zone, "malformed slice; passing value through");
            return NormalizedField::Raw(value.clone());
        };
        let slice_path = zone.child(raw.slice_type.as_str());
        let prefix = self.config.prefix();

        let (fields_root, type_name) = match self.registry.resolve(&slice_path) {
            Some(FieldType::Slice) => (
                slice_path.clone(),
                legacy_slice_type_name(prefix, &slice_path),
            ),
            Some(FieldType::SharedSlice) => {
                let variation = raw.variation.as_deref().unwrap_or("default");
                let variation_path = slice_path.child(variation);
                if self.registry.resolve(&variation_path) != Some(FieldType::SharedSliceVariation) {
                    warn!(
                        path = %variation_path,
                        "shared slice variation not found; passing slice through"
                    );
                    return NormalizedField::Raw(value.clone());
                }
                (
                    variation_path,
                    shared_slice_type_name(prefix, &raw.slice_type, variation),
                )
            }
            _ => {
                warn!(path = %slice_path, "slice schema not found; passing slice through");
                return NormalizedField::Raw(value.clone());
            }
        };

        let digest = content_digest(value);
        let id = match self.identity.slice_id(&type_name, &digest) {
            Ok(id) => id,
            Err(err) => {
                warn!(path = %slice_path, error = %err, "slice id unavailable; passing slice through");
                return NormalizedField::Raw(value.clone());
            }
        };
        let items_path = fields_root.child("items");
        NormalizedField::Slice(Box::new(SliceNode {
            id,
            type_name,
            slice_type: raw.slice_type.clone(),
            slice_label: raw.slice_label.clone(),
            variation: raw.variation.clone(),
            version: raw.version.clone(),
            primary: self.normalize_map(&fields_root.child("primary"), &raw.primary),
            items: raw
                .items
                .iter()
                .map(|item| self.normalize_map(&items_path, item))
                .collect(),
            content_digest: digest,
        }))
    }
}

fn is_empty_object(value: &Value) -> bool {
    value.is_null() || value.as_object().is_some_and(Map::is_empty)
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::{CustomTypeModel, LinkTarget, SharedSliceModel};
    use serde_json::json;

    struct Fixture {
        registry: TypePathRegistry,
        identity: NodeIdentity,
        config: NormalizeConfig,
        capabilities: Capabilities,
    }

    impl Fixture {
        fn new() -> Self {
            let page: CustomTypeModel = serde_json::from_value(json!({
                "id": "page",
                "json": {"Main": {
                    "uid": {"type": "UID"},
                    "title": {"type": "StructuredText"},
                    "count": {"type": "Number"},
                    "hero": {"type": "Image", "config": {"thumbnails": [{"name": "mobile"}]}},
                    "related": {"type": "Link"},
                    "links": {"type": "Group", "config": {"fields": {"link": {"type": "Link"}}}},
                    "body": {"type": "Slices", "config": {"choices": {
                        "text": {"type": "Slice", "non-repeat": {"content": {"type": "StructuredText"}}},
                        "quote": {"type": "SharedSlice"}
                    }}}
                }}
            }))
            .unwrap();
            let quote: SharedSliceModel = serde_json::from_value(json!({
                "id": "quote",
                "variations": [{"id": "default", "primary": {"author": {"type": "Text"}}}]
            }))
            .unwrap();
            fn route(target: &LinkTarget) -> Option<String> {
                target.uid.as_ref().map(|uid| format!("/{uid}"))
            }
            Self {
                registry: TypePathRegistry::build(&[page], &[quote]).unwrap(),
                identity: NodeIdentity::for_repository("blog", None).unwrap(),
                config: NormalizeConfig::default(),
                capabilities: Capabilities::new(route),
            }
        }

        fn normalizer(&self) -> Normalizer<'_> {
            Normalizer::new(&self.registry, &self.identity, &self.config, &self.capabilities)
        }
    }

    fn data_path(field: &str) -> FieldPath {
        FieldPath::from_segments(["page", "data", field])
    }

    #[test]
    fn empty_group_and_empty_slice_zone_dispatch_by_path() {
        let fx = Fixture::new();
        let n = fx.normalizer();
        assert_eq!(n.normalize_field(&data_path("links"), &json!([])), NormalizedField::Group(vec![]));
        assert_eq!(n.normalize_field(&data_path("body"), &json!([])), NormalizedField::Slices(vec![]));
    }

    #[test]
    fn unknown_path_passes_through() {
        let fx = Fixture::new();
        let value = json!({"anything": [1, 2, 3]});
        assert_eq!(
            fx.normalizer().normalize_field(&data_path("mystery"), &value),
            NormalizedField::Raw(value)
        );
    }

    #[test]
    fn image_without_dimensions_passes_through() {
        let fx = Fixture::new();
        let value = json!({"url": "https://images.example/a.png"});
        assert_eq!(
            fx.normalizer().normalize_field(&data_path("hero"), &value),
            NormalizedField::Raw(value)
        );
    }

    #[test]
    fn image_thumbnails_are_keyed_by_configured_name() {
        let fx = Fixture::new();
        let value = json!({
            "url": "https://images.example/a.png",
            "dimensions": {"width": 1200, "height": 600},
            "mobile": {"url": "https://images.example/m.png", "dimensions": {"width": 400, "height": 400}},
            "stray": {"url": "https://images.example/s.png", "dimensions": {"width": 1, "height": 1}}
        });
        let field = fx.normalizer().normalize_field(&data_path("hero"), &value);
        let image = field.as_image().expect("image");
        assert_eq!(image.thumbnails.keys().collect::<Vec<_>>(), vec!["mobile"]);
        assert_eq!(image.thumbnails["mobile"].dimensions.width, 400);
    }

    #[test]
    fn document_link_gets_reference_and_url_broken_link_does_not() {
        let fx = Fixture::new();
        let n = fx.normalizer();
        let live = n.normalize_field(
            &data_path("related"),
            &json!({"link_type": "Document", "id": "B", "uid": "bee", "type": "page"}),
        );
        let live = live.as_link().expect("link");
        assert_eq!(live.url.as_deref(), Some("/bee"));
        let reference = live.document.as_ref().expect("reference");
        assert_eq!(reference.prismic_id, "B");
        assert_eq!(reference.node_id, fx.identity.document_id("B").unwrap());

        let broken = n.normalize_field(
            &data_path("related"),
            &json!({"link_type": "Document", "id": "C", "isBroken": true}),
        );
        assert!(broken.as_link().expect("link").document.is_none());
    }

    #[test]
    fn group_elements_use_the_group_path() {
        let fx = Fixture::new();
        let field = fx.normalizer().normalize_field(
            &data_path("links"),
            &json!([{"link": {"link_type": "Web", "url": "https://example.com"}}]),
        );
        let items = field.as_group().expect("group");
        let link = items[0]["link"].as_link().expect("link");
        assert_eq!(link.url.as_deref(), Some("https://example.com"));
        assert!(!link.raw.contains_key("url"));
    }

    #[test]
    fn legacy_and_shared_slices_resolve_their_own_schemas() {
        let fx = Fixture::new();
        let field = fx.normalizer().normalize_field(
            &data_path("body"),
            &json!([
                {"slice_type": "text", "primary": {"content": [{"type": "paragraph", "text": "hi", "spans": []}]}, "items": []},
                {"slice_type": "quote", "variation": "default", "primary": {"author": "Ada"}, "items": []},
                {"slice_type": "gallery", "primary": {}, "items": []}
            ]),
        );
        let slices = field.as_slices().expect("slices");
        let text = slices[0].as_slice().expect("legacy slice");
        assert_eq!(text.type_name, "PrismicPageDataBodyText");
        assert_eq!(text.primary["content"].as_structured_text().unwrap().html, "<p>hi</p>");

        let quote = slices[1].as_slice().expect("shared slice");
        assert_eq!(quote.type_name, "PrismicQuoteDefault");
        assert_eq!(quote.primary["author"], NormalizedField::Primitive(json!("Ada")));

        assert!(slices[2].is_raw());
    }

    #[test]
    fn slice_ids_are_content_derived() {
        let fx = Fixture::new();
        let n = fx.normalizer();
        let a: Value = serde_json::from_str(
            r#"[{"slice_type":"quote","variation":"default","primary":{"author":"Ada"},"items":[]}]"#,
        )
        .unwrap();
        let b: Value = serde_json::from_str(
            r#"[{"items":[],"primary":{"author":"Ada"},"variation":"default","slice_type":"quote"}]"#,
        )
        .unwrap();
        let id = |v: &Value| {
            n.normalize_field(&data_path("body"), v).as_slices().unwrap()[0]
                .as_slice()
                .unwrap()
                .id
                .clone()
        };
        assert_eq!(id(&a), id(&b));

        let twice: Value = serde_json::from_str(
            r#"[{"slice_type":"quote","variation":"default","primary":{"author":"Ada"},"items":[]},
                {"slice_type":"quote","variation":"default","primary":{"author":"Ada"},"items":[]},
                {"slice_type":"quote","variation":"default","primary":{"author":"Bo"},"items":[]}]"#,
        )
        .unwrap();
        let field = n.normalize_field(&data_path("body"), &twice);
        let ids: Vec<&str> = field
            .as_slices()
            .unwrap()
            .iter()
            .map(|slice| slice.as_slice().unwrap().id.as_str())
            .collect();
        assert_eq!(ids[0], ids[1]);
        assert_ne!(ids[0], ids[2]);
        assert_eq!(ids[0], id(&a));
    }
}

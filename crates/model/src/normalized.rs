//! Normalized preview nodes.
//!
//! The output of the normalizer, shaped like the nodes the static build
//! produced. Every node carries a derived `id` and a `content_digest`;
//! documents additionally keep their CMS id as `prismic_id`.
//!
//! Cross-document links are never inlined. A link field holds a
//! [`DocumentReference`], and callers look the target up through a
//! [`DocumentLookup`] (the document store) at the moment they need it. A
//! reference created before its target was fetched starts resolving as soon
//! as the target lands in the store, and a later preview update is visible
//! through every existing reference without re-normalizing anything.
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::raw::{ImageDimensions, LinkType};

/// Ordered field-name → normalized value map.
pub type FieldMap = IndexMap<String, NormalizedField>;

/// Read access to normalized documents by derived node id.
pub trait DocumentLookup {
    fn lookup(&self, node_id: &str) -> Option<Arc<NormalizedDocument>>;
}

impl<T: DocumentLookup + ?Sized> DocumentLookup for Arc<T> {
    fn lookup(&self, node_id: &str) -> Option<Arc<NormalizedDocument>> {
        (**self).lookup(node_id)
    }
}

/// Unresolved pointer to another document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentReference {
    /// Derived node id of the target.
    #[serde(rename = "id")]
    pub node_id: String,
    /// CMS id of the target.
    #[serde(rename = "prismicId")]
    pub prismic_id: String,
}

impl DocumentReference {
    pub fn new(node_id: impl Into<String>, prismic_id: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            prismic_id: prismic_id.into(),
        }
    }

    /// Current contents of the target, or `None` if it isn't available (yet).
    pub fn resolve<L>(&self, lookup: &L) -> Option<Arc<NormalizedDocument>>
    where
        L: DocumentLookup + ?Sized,
    {
        lookup.lookup(&self.node_id)
    }
}

/// A normalized field value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum NormalizedField {
    /// Text, numbers, dates, selects, colors, geo points, embeds.
    Primitive(Value),
    StructuredText(StructuredTextField),
    Image(Box<ImageField>),
    Link(Box<LinkField>),
    /// Each element normalized against the group's field paths.
    Group(Vec<FieldMap>),
    /// Elements are [`NormalizedField::Slice`], or [`NormalizedField::Raw`]
    /// for slices whose schema could not be found.
    Slices(Vec<NormalizedField>),
    Slice(Box<SliceNode>),
    /// Value passed through unchanged (unknown path or malformed value).
    Raw(Value),
}

impl NormalizedField {
    pub fn as_link(&self) -> Option<&LinkField> {
        match self {
            NormalizedField::Link(link) => Some(link),
            _ => None,
        }
    }

    pub fn as_image(&self) -> Option<&ImageField> {
        match self {
            NormalizedField::Image(image) => Some(image),
            _ => None,
        }
    }

    pub fn as_structured_text(&self) -> Option<&StructuredTextField> {
        match self {
            NormalizedField::StructuredText(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_group(&self) -> Option<&[FieldMap]> {
        match self {
            NormalizedField::Group(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_slices(&self) -> Option<&[NormalizedField]> {
        match self {
            NormalizedField::Slices(slices) => Some(slices),
            _ => None,
        }
    }

    pub fn as_slice(&self) -> Option<&SliceNode> {
        match self {
            NormalizedField::Slice(slice) => Some(slice),
            _ => None,
        }
    }

    /// The stored value of a primitive or pass-through field.
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            NormalizedField::Primitive(value) | NormalizedField::Raw(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_raw(&self) -> bool {
        matches!(self, NormalizedField::Raw(_))
    }

    /// Appends every document reference reachable inside this value.
    pub fn collect_references<'a>(&'a self, out: &mut Vec<&'a DocumentReference>) {
        match self {
            NormalizedField::Link(link) => out.extend(link.document.as_ref()),
            NormalizedField::Group(items) => {
                for item in items {
                    collect_map_references(item, out);
                }
            }
            NormalizedField::Slices(slices) => {
                for slice in slices {
                    slice.collect_references(out);
                }
            }
            NormalizedField::Slice(slice) => {
                collect_map_references(&slice.primary, out);
                for item in &slice.items {
                    collect_map_references(item, out);
                }
            }
            NormalizedField::Primitive(_)
            | NormalizedField::StructuredText(_)
            | NormalizedField::Image(_)
            | NormalizedField::Raw(_) => {}
        }
    }
}

fn collect_map_references<'a>(fields: &'a FieldMap, out: &mut Vec<&'a DocumentReference>) {
    for field in fields.values() {
        field.collect_references(out);
    }
}

/// Rich text with its rendered forms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredTextField {
    pub html: String,
    pub text: String,
    pub raw: Value,
}

/// Fixed-size responsive image descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixedImage {
    pub width: u32,
    pub height: u32,
    pub src: String,
    #[serde(rename = "srcSet")]
    pub src_set: String,
    #[serde(rename = "srcWebp")]
    pub src_webp: String,
    #[serde(rename = "srcSetWebp")]
    pub src_set_webp: String,
}

/// Fluid responsive image descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FluidImage {
    #[serde(rename = "aspectRatio")]
    pub aspect_ratio: f64,
    pub src: String,
    #[serde(rename = "srcSet")]
    pub src_set: String,
    #[serde(rename = "srcWebp")]
    pub src_webp: String,
    #[serde(rename = "srcSetWebp")]
    pub src_set_webp: String,
    pub sizes: String,
}

/// Normalized image. Thumbnails share the shape, minus their own thumbnails.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageField {
    pub url: String,
    pub alt: Option<String>,
    pub copyright: Option<String>,
    pub dimensions: ImageDimensions,
    pub fixed: FixedImage,
    pub fluid: FluidImage,
    #[serde(rename = "placeholderUrl")]
    pub placeholder_url: String,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub thumbnails: IndexMap<String, ImageField>,
}

/// Normalized link: the raw link keys plus a resolved `url` and, for live
/// document links, an unresolved `document` reference.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinkField {
    pub link_type: LinkType,
    pub url: Option<String>,
    pub document: Option<DocumentReference>,
    /// Remaining raw keys (`id`, `uid`, `type`, `target`, `isBroken`, ...).
    #[serde(flatten)]
    pub raw: Map<String, Value>,
}

impl LinkField {
    pub fn target(&self) -> Option<&str> {
        self.raw.get("target").and_then(Value::as_str)
    }

    pub fn is_broken(&self) -> bool {
        self.raw
            .get("isBroken")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}

/// A normalized slice. Slices have no natural id; `id` is derived from the
/// type name and the digest of the raw slice.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SliceNode {
    pub id: String,
    #[serde(rename = "__typename")]
    pub type_name: String,
    pub slice_type: String,
    pub slice_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub primary: FieldMap,
    pub items: Vec<FieldMap>,
    #[serde(skip)]
    pub content_digest: String,
}

/// The same document in another language.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedAlternateLanguage {
    pub id: String,
    pub uid: Option<String>,
    #[serde(rename = "type")]
    pub doc_type: String,
    pub lang: String,
    pub url: Option<String>,
    pub document: DocumentReference,
}

/// A normalized document node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedDocument {
    /// Derived node id, namespaced per repository.
    pub id: String,
    #[serde(rename = "prismicId")]
    pub prismic_id: String,
    #[serde(skip)]
    pub repository: String,
    #[serde(rename = "__typename")]
    pub type_name: String,
    #[serde(rename = "type")]
    pub doc_type: String,
    pub uid: Option<String>,
    pub lang: String,
    pub tags: Vec<String>,
    pub href: Option<String>,
    pub url: Option<String>,
    pub first_publication_date: Option<String>,
    pub last_publication_date: Option<String>,
    pub alternate_languages: Vec<NormalizedAlternateLanguage>,
    pub data: FieldMap,
    #[serde(rename = "dataRaw")]
    pub data_raw: Map<String, Value>,
    #[serde(skip)]
    pub content_digest: String,
}

impl NormalizedDocument {
    pub fn field(&self, name: &str) -> Option<&NormalizedField> {
        self.data.get(name)
    }

    /// Every document this one points at: link fields at any depth inside
    /// groups and slices, plus alternate languages.
    pub fn document_references(&self) -> Vec<&DocumentReference> {
        let mut out = Vec::new();
        collect_map_references(&self.data, &mut out);
        out.extend(self.alternate_languages.iter().map(|alt| &alt.document));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct MapLookup(HashMap<String, Arc<NormalizedDocument>>);

    impl DocumentLookup for MapLookup {
        fn lookup(&self, node_id: &str) -> Option<Arc<NormalizedDocument>> {
            self.0.get(node_id).cloned()
        }
    }

    fn link_to(node_id: &str, prismic_id: &str) -> NormalizedField {
        NormalizedField::Link(Box::new(LinkField {
            link_type: LinkType::Document,
            url: Some(format!("/{prismic_id}")),
            document: Some(DocumentReference::new(node_id, prismic_id)),
            raw: Map::new(),
        }))
    }

    fn document(node_id: &str, prismic_id: &str, data: FieldMap) -> NormalizedDocument {
        NormalizedDocument {
            id: node_id.into(),
            prismic_id: prismic_id.into(),
            repository: "repo".into(),
            type_name: "PrismicPage".into(),
            doc_type: "page".into(),
            uid: None,
            lang: "en-us".into(),
            tags: vec![],
            href: None,
            url: None,
            first_publication_date: None,
            last_publication_date: None,
            alternate_languages: vec![],
            data,
            data_raw: Map::new(),
            content_digest: String::new(),
        }
    }

    #[test]
    fn references_are_collected_through_groups_and_slices() {
        let mut group_item = FieldMap::new();
        group_item.insert("link".into(), link_to("n-b", "B"));

        let mut primary = FieldMap::new();
        primary.insert("cta".into(), link_to("n-c", "C"));
        let slice = SliceNode {
            id: "s1".into(),
            type_name: "PrismicPageDataBodyCta".into(),
            slice_type: "cta".into(),
            slice_label: None,
            variation: None,
            version: None,
            primary,
            items: vec![],
            content_digest: String::new(),
        };

        let mut data = FieldMap::new();
        data.insert("links".into(), NormalizedField::Group(vec![group_item]));
        data.insert(
            "body".into(),
            NormalizedField::Slices(vec![NormalizedField::Slice(Box::new(slice))]),
        );
        let doc = document("n-a", "A", data);

        let ids: Vec<&str> = doc
            .document_references()
            .into_iter()
            .map(|r| r.prismic_id.as_str())
            .collect();
        assert_eq!(ids, vec!["B", "C"]);
    }

    #[test]
    fn reference_resolves_against_current_lookup_state() {
        let reference = DocumentReference::new("n-b", "B");
        let mut lookup = MapLookup(HashMap::new());
        assert!(reference.resolve(&lookup).is_none());

        lookup
            .0
            .insert("n-b".into(), Arc::new(document("n-b", "B", FieldMap::new())));
        let resolved = reference.resolve(&lookup).expect("target now available");
        assert_eq!(resolved.prismic_id, "B");
    }
}

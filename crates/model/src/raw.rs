//! Raw documents as the CMS API returns them.
//!
//! These types are read-only inputs. Field values inside [`RawDocument::data`]
//! stay as [`serde_json::Value`] because the normalizer dispatches on the
//! type path of a field, never on the runtime shape of its value: an empty
//! group and an empty slice zone are both `[]`.
//!
//! The typed views at the bottom of this module ([`RawImage`], [`RawLink`],
//! [`RawSlice`], [`RawRichTextBlock`]) are decoded on demand once the type path
//! says what a value is supposed to be.
//!
//! ```text
//! RawDocument
//! ├── id, uid, type, lang, tags, href
//! ├── first_publication_date / last_publication_date
//! ├── alternate_languages: [AlternateLanguage]
//! └── data: { field-name → Value }
//! ```
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single document from the CMS API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDocument {
    /// Source id, stable across edits.
    pub id: String,
    #[serde(default)]
    pub uid: Option<String>,
    /// Custom type API id, e.g. `"page"`.
    #[serde(rename = "type")]
    pub doc_type: String,
    #[serde(default)]
    pub href: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub slugs: Vec<String>,
    #[serde(default = "default_lang")]
    pub lang: String,
    #[serde(default)]
    pub first_publication_date: Option<String>,
    #[serde(default)]
    pub last_publication_date: Option<String>,
    #[serde(default)]
    pub alternate_languages: Vec<AlternateLanguage>,
    #[serde(default)]
    pub data: Map<String, Value>,
}

fn default_lang() -> String {
    "*".to_string()
}

impl RawDocument {
    /// The document as a JSON value, used for content digests.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Link-resolver view of this document.
    pub fn link_target(&self) -> LinkTarget {
        LinkTarget {
            id: self.id.clone(),
            uid: self.uid.clone(),
            doc_type: self.doc_type.clone(),
            lang: self.lang.clone(),
            tags: self.tags.clone(),
            slug: self.slugs.first().cloned(),
            is_broken: false,
        }
    }
}

/// Reference to the same document in another language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlternateLanguage {
    pub id: String,
    #[serde(default)]
    pub uid: Option<String>,
    #[serde(rename = "type")]
    pub doc_type: String,
    pub lang: String,
}

impl AlternateLanguage {
    pub fn link_target(&self) -> LinkTarget {
        LinkTarget {
            id: self.id.clone(),
            uid: self.uid.clone(),
            doc_type: self.doc_type.clone(),
            lang: self.lang.clone(),
            tags: Vec::new(),
            slug: None,
            is_broken: false,
        }
    }
}

/// What a link resolver sees: enough of a document to build a route.
///
/// Built from a full [`RawDocument`], an [`AlternateLanguage`], or a document
/// [`RawLink`] (which only carries the denormalized subset).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkTarget {
    pub id: String,
    pub uid: Option<String>,
    #[serde(rename = "type")]
    pub doc_type: String,
    pub lang: String,
    pub tags: Vec<String>,
    pub slug: Option<String>,
    pub is_broken: bool,
}

/// Kind of a link field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LinkType {
    Document,
    Media,
    Web,
    /// Empty link field.
    Any,
}

/// Typed view over a link field value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawLink {
    pub link_type: LinkType,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub uid: Option<String>,
    #[serde(rename = "type", default)]
    pub doc_type: Option<String>,
    #[serde(default)]
    pub lang: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(rename = "isBroken", default)]
    pub is_broken: bool,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub target: Option<String>,
}

impl RawLink {
    /// Decode a link value. Returns `None` when the value isn't link-shaped.
    pub fn from_value(value: &Value) -> Option<Self> {
        serde_json::from_value(value.clone()).ok()
    }

    /// Id of the linked document, if this is a live document link.
    pub fn document_id(&self) -> Option<&str> {
        match self.link_type {
            LinkType::Document if !self.is_broken => self.id.as_deref(),
            _ => None,
        }
    }

    pub fn link_target(&self) -> Option<LinkTarget> {
        let id = self.id.clone()?;
        Some(LinkTarget {
            id,
            uid: self.uid.clone(),
            doc_type: self.doc_type.clone().unwrap_or_default(),
            lang: self.lang.clone().unwrap_or_else(default_lang),
            tags: self.tags.clone(),
            slug: self.slug.clone(),
            is_broken: self.is_broken,
        })
    }
}

/// Width/height pair shared by images and image thumbnails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageDimensions {
    pub width: u32,
    pub height: u32,
}

/// Typed view over an image field value.
///
/// Thumbnails appear in the raw value as sibling keys named after the
/// configured thumbnail; they are read separately by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawImage {
    pub url: String,
    pub dimensions: ImageDimensions,
    #[serde(default)]
    pub alt: Option<String>,
    #[serde(default)]
    pub copyright: Option<String>,
}

impl RawImage {
    /// Decode an image value. Missing `url` or `dimensions` yields `None`.
    pub fn from_value(value: &Value) -> Option<Self> {
        serde_json::from_value(value.clone()).ok()
    }
}

/// Typed view over one slice in a slice zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSlice {
    pub slice_type: String,
    #[serde(default)]
    pub slice_label: Option<String>,
    /// Present on shared slices only.
    #[serde(default)]
    pub variation: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub primary: Map<String, Value>,
    #[serde(default)]
    pub items: Vec<Map<String, Value>>,
}

impl RawSlice {
    pub fn from_value(value: &Value) -> Option<Self> {
        serde_json::from_value(value.clone()).ok()
    }
}

/// One block of a structured text field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRichTextBlock {
    #[serde(rename = "type")]
    pub block_type: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub spans: Vec<RawSpan>,
    /// Image blocks.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub alt: Option<String>,
    #[serde(default)]
    pub copyright: Option<String>,
    #[serde(default)]
    pub dimensions: Option<ImageDimensions>,
    #[serde(rename = "linkTo", default)]
    pub link_to: Option<Value>,
    /// Embed blocks.
    #[serde(default)]
    pub oembed: Option<Value>,
    #[serde(default)]
    pub label: Option<String>,
}

/// Inline markup over a `[start, end)` character range of a block's text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSpan {
    pub start: usize,
    pub end: usize,
    #[serde(rename = "type")]
    pub span_type: String,
    #[serde(default)]
    pub data: Option<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn document_defaults_apply() {
        let doc: RawDocument =
            serde_json::from_value(json!({"id": "X1", "type": "page"})).expect("decode");
        assert_eq!(doc.lang, "*");
        assert!(doc.data.is_empty());
        assert!(doc.alternate_languages.is_empty());
    }

    #[test]
    fn broken_document_link_has_no_target_id() {
        let link = RawLink::from_value(&json!({
            "link_type": "Document",
            "id": "X2",
            "isBroken": true
        }))
        .expect("link");
        assert_eq!(link.document_id(), None);

        let live = RawLink::from_value(&json!({"link_type": "Document", "id": "X2"})).unwrap();
        assert_eq!(live.document_id(), Some("X2"));
    }

    #[test]
    fn image_without_dimensions_is_not_an_image() {
        assert!(RawImage::from_value(&json!({"url": "https://images.example/a.png"})).is_none());
        assert!(RawImage::from_value(&json!({})).is_none());
    }

    #[test]
    fn web_link_is_never_a_document_reference() {
        let link = RawLink::from_value(&json!({
            "link_type": "Web",
            "url": "https://example.com",
            "target": "_blank"
        }))
        .unwrap();
        assert_eq!(link.document_id(), None);
        assert_eq!(link.target.as_deref(), Some("_blank"));
    }
}

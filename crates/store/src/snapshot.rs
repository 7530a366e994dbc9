//! Rendering stored documents into the JSON shape page data uses.
//!
//! Link `document` fields are resolved against the lookup at render time, up
//! to a fixed depth. A target that is not stored yet, or lies beyond the
//! depth, renders as `null`.
use model::{
    DocumentLookup, DocumentReference, FieldMap, NormalizedDocument, NormalizedField, SliceNode,
};
use reconcile::DEFAULT_IDENTITY_FIELD;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::StoreError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotOptions {
    /// Field carrying the node id on every rendered document.
    pub identity_field: String,
    /// How many link hops are expanded inline.
    pub link_depth: usize,
    /// Only render documents of this repository.
    pub repository: Option<String>,
}

impl Default for SnapshotOptions {
    fn default() -> Self {
        Self {
            identity_field: DEFAULT_IDENTITY_FIELD.to_string(),
            link_depth: 2,
            repository: None,
        }
    }
}

impl SnapshotOptions {
    pub fn with_identity_field(mut self, field: impl Into<String>) -> Self {
        self.identity_field = field.into();
        self
    }

    pub fn with_link_depth(mut self, depth: usize) -> Self {
        self.link_depth = depth;
        self
    }

    pub fn with_repository(mut self, repository: impl Into<String>) -> Self {
        self.repository = Some(repository.into());
        self
    }

    pub fn validate(&self) -> Result<(), StoreError> {
        if self.identity_field.trim().is_empty() {
            return Err(StoreError::InvalidConfig(
                "identity_field must not be empty".into(),
            ));
        }
        Ok(())
    }
}

/// Render `document` with links expanded `depth` hops deep.
pub fn render_document<L>(
    document: &NormalizedDocument,
    lookup: &L,
    identity_field: &str,
    depth: usize,
) -> Value
where
    L: DocumentLookup + ?Sized,
{
    let mut out = Map::new();
    out.insert("__typename".into(), Value::String(document.type_name.clone()));
    out.insert("id".into(), Value::String(document.id.clone()));
    out.insert(
        DEFAULT_IDENTITY_FIELD.into(),
        Value::String(document.id.clone()),
    );
    out.insert("prismicId".into(), Value::String(document.prismic_id.clone()));
    out.insert("type".into(), Value::String(document.doc_type.clone()));
    out.insert("uid".into(), opt_string(&document.uid));
    out.insert("lang".into(), Value::String(document.lang.clone()));
    out.insert(
        "tags".into(),
        Value::Array(document.tags.iter().cloned().map(Value::String).collect()),
    );
    out.insert("href".into(), opt_string(&document.href));
    out.insert("url".into(), opt_string(&document.url));
    out.insert(
        "first_publication_date".into(),
        opt_string(&document.first_publication_date),
    );
    out.insert(
        "last_publication_date".into(),
        opt_string(&document.last_publication_date),
    );

    let renderer = Renderer {
        lookup,
        identity_field,
    };
    let alternates = document
        .alternate_languages
        .iter()
        .map(|alt| {
            let mut value = to_object(alt);
            value.insert(
                "document".into(),
                renderer.reference(&alt.document, depth),
            );
            Value::Object(value)
        })
        .collect();
    out.insert("alternate_languages".into(), Value::Array(alternates));
    out.insert("data".into(), renderer.map(&document.data, depth));
    out.insert("dataRaw".into(), Value::Object(document.data_raw.clone()));
    if !out.contains_key(identity_field) {
        out.insert(identity_field.into(), Value::String(document.id.clone()));
    }
    Value::Object(out)
}

struct Renderer<'a, L: ?Sized> {
    lookup: &'a L,
    identity_field: &'a str,
}

impl<L> Renderer<'_, L>
where
    L: DocumentLookup + ?Sized,
{
    fn reference(&self, reference: &DocumentReference, depth: usize) -> Value {
        if depth == 0 {
            return Value::Null;
        }
        match reference.resolve(self.lookup) {
            Some(target) => render_document(&target, self.lookup, self.identity_field, depth - 1),
            None => Value::Null,
        }
    }

    fn map(&self, fields: &FieldMap, depth: usize) -> Value {
        Value::Object(
            fields
                .iter()
                .map(|(name, field)| (name.clone(), self.field(field, depth)))
                .collect(),
        )
    }

    fn field(&self, field: &NormalizedField, depth: usize) -> Value {
        match field {
            NormalizedField::Primitive(value) | NormalizedField::Raw(value) => value.clone(),
            NormalizedField::StructuredText(_) | NormalizedField::Image(_) => {
                serde_json::to_value(field).unwrap_or(Value::Null)
            }
            NormalizedField::Link(link) => {
                let mut value = to_object(link.as_ref());
                let document = match &link.document {
                    Some(reference) => self.reference(reference, depth),
                    None => Value::Null,
                };
                value.insert("document".into(), document);
                Value::Object(value)
            }
            NormalizedField::Group(items) => Value::Array(
                items.iter().map(|item| self.map(item, depth)).collect(),
            ),
            NormalizedField::Slices(slices) => Value::Array(
                slices.iter().map(|slice| self.field(slice, depth)).collect(),
            ),
            NormalizedField::Slice(slice) => self.slice(slice, depth),
        }
    }

    fn slice(&self, slice: &SliceNode, depth: usize) -> Value {
        let mut value = to_object(slice);
        value.insert("primary".into(), self.map(&slice.primary, depth));
        value.insert(
            "items".into(),
            Value::Array(slice.items.iter().map(|item| self.map(item, depth)).collect()),
        );
        Value::Object(value)
    }
}

fn to_object<T: Serialize>(value: &T) -> Map<String, Value> {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    }
}

fn opt_string(value: &Option<String>) -> Value {
    value.clone().map(Value::String).unwrap_or(Value::Null)
}

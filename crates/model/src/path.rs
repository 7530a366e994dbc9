//! Field paths and type-path entries.
//!
//! A [`FieldPath`] is an immutable sequence of segments rooted at a custom
//! type id, e.g. `page.data.body.text_block.primary.content`. Recursive code
//! derives child paths with [`FieldPath::child`] and never mutates a path in
//! place, so sibling branches can't corrupt each other's position.
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Field-type tag recorded for each type path.
///
/// Containers (`Group`, `Slices`, `Slice`, `SharedSlice`,
/// `SharedSliceVariation`) are tagged distinctly from their element types so
/// the normalizer never has to guess from data shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldType {
    Document,
    DocumentData,
    AlternateLanguages,
    Boolean,
    Color,
    Date,
    Embed,
    GeoPoint,
    Group,
    Image,
    ImageThumbnail,
    IntegrationFields,
    Link,
    Number,
    Select,
    Slices,
    Slice,
    SharedSlice,
    SharedSliceVariation,
    StructuredText,
    Text,
    Timestamp,
    #[serde(rename = "UID")]
    Uid,
    Unknown,
}

impl FieldType {
    /// Types whose values are stored as-is.
    pub fn is_primitive(self) -> bool {
        matches!(
            self,
            FieldType::Boolean
                | FieldType::Color
                | FieldType::Date
                | FieldType::Embed
                | FieldType::GeoPoint
                | FieldType::IntegrationFields
                | FieldType::Number
                | FieldType::Select
                | FieldType::Text
                | FieldType::Timestamp
                | FieldType::Uid
        )
    }
}

/// One registry entry: a path and the type found there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypePath {
    pub path: Vec<String>,
    #[serde(rename = "type")]
    pub field_type: FieldType,
}

impl TypePath {
    pub fn new(path: &FieldPath, field_type: FieldType) -> Self {
        Self {
            path: path.segments().to_vec(),
            field_type,
        }
    }

    /// Dotted lookup key.
    pub fn key(&self) -> String {
        self.path.join(".")
    }
}

/// Immutable, cheaply clonable field path.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct FieldPath {
    segments: Arc<[String]>,
}

impl FieldPath {
    /// Root path for a custom type.
    pub fn root(custom_type: impl Into<String>) -> Self {
        Self {
            segments: Arc::from(vec![custom_type.into()]),
        }
    }

    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        Self {
            segments: Arc::from(segments),
        }
    }

    /// A new path with `segment` appended. `self` is left untouched.
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut segments = Vec::with_capacity(self.segments.len() + 1);
        segments.extend(self.segments.iter().cloned());
        segments.push(segment.into());
        Self {
            segments: Arc::from(segments),
        }
    }

    pub fn parent(&self) -> Option<Self> {
        match self.segments.len() {
            0 => None,
            n => Some(Self::from_segments(self.segments[..n - 1].iter().cloned())),
        }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn last(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Dotted lookup key, matching [`TypePath::key`].
    pub fn key(&self) -> String {
        self.segments.join(".")
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

impl fmt::Debug for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FieldPath({})", self.key())
    }
}

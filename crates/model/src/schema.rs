//! Custom-type and shared-slice schema models.
//!
//! These mirror the JSON the CMS exposes for its content models. A custom type
//! groups fields into tabs; the tab names carry no meaning for normalization
//! and are flattened away by [`CustomTypeModel::fields`].
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Ordered field-name → schema map.
pub type FieldSchemaMap = IndexMap<String, FieldSchema>;

/// A document type definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomTypeModel {
    pub id: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default = "default_true")]
    pub repeatable: bool,
    /// Tab name → fields.
    #[serde(default)]
    pub json: IndexMap<String, FieldSchemaMap>,
}

fn default_true() -> bool {
    true
}

impl CustomTypeModel {
    /// All fields across tabs, in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = (&String, &FieldSchema)> {
        self.json.values().flat_map(|tab| tab.iter())
    }

    /// Whether the type declares a `UID` field.
    pub fn has_uid(&self) -> bool {
        self.fields()
            .any(|(_, schema)| matches!(schema, FieldSchema::Uid))
    }
}

/// A reusable slice definition shared across custom types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SharedSliceModel {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub variations: Vec<SharedSliceVariation>,
}

impl SharedSliceModel {
    pub fn variation(&self, id: &str) -> Option<&SharedSliceVariation> {
        self.variations.iter().find(|v| v.id == id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SharedSliceVariation {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub primary: FieldSchemaMap,
    #[serde(default)]
    pub items: FieldSchemaMap,
}

/// Schema of a single field, tagged by its `type` key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum FieldSchema {
    Boolean,
    Color,
    Date,
    Embed,
    GeoPoint,
    IntegrationFields,
    Link,
    Number,
    Select,
    StructuredText,
    Text,
    Timestamp,
    #[serde(rename = "UID")]
    Uid,
    Image {
        #[serde(default)]
        config: ImageConfig,
    },
    Group {
        #[serde(default)]
        config: GroupConfig,
    },
    Slices {
        #[serde(default)]
        config: SlicesConfig,
    },
    /// Legacy per-custom-type slice.
    Slice {
        #[serde(rename = "non-repeat", default)]
        non_repeat: FieldSchemaMap,
        #[serde(default)]
        repeat: FieldSchemaMap,
    },
    /// Reference to a [`SharedSliceModel`] by the choice key.
    SharedSlice,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageConfig {
    #[serde(default)]
    pub thumbnails: Vec<ThumbnailConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThumbnailConfig {
    pub name: String,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupConfig {
    #[serde(default)]
    pub fields: FieldSchemaMap,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SlicesConfig {
    #[serde(default)]
    pub choices: FieldSchemaMap,
}

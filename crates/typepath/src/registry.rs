//! The type-path registry and the schema walker that builds it.
//!
//! ```text
//! page                                   Document
//! page.uid                               UID
//! page.alternate_languages               AlternateLanguages
//! page.data                              DocumentData
//! page.data.title                        StructuredText
//! page.data.hero                         Image
//! page.data.hero.thumbnails.mobile       ImageThumbnail
//! page.data.links                        Group
//! page.data.links.link                   Link
//! page.data.body                         Slices
//! page.data.body.text                    Slice
//! page.data.body.text.primary.content    StructuredText
//! page.data.body.hero                    SharedSlice
//! page.data.body.hero.default            SharedSliceVariation
//! page.data.body.hero.default.primary.t  Text
//! ```
use std::collections::{HashMap, HashSet};

use model::{
    CustomTypeModel, FieldPath, FieldSchema, FieldSchemaMap, FieldType, SharedSliceModel,
    TypePath,
};
use tracing::warn;

use crate::error::TypePathError;

/// Immutable map from dotted field path to field type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypePathRegistry {
    entries: Vec<TypePath>,
    by_key: HashMap<String, FieldType>,
    children: HashMap<String, Vec<String>>,
}

impl TypePathRegistry {
    /// Walk the given schemas. Shared-slice choices are resolved against
    /// `shared_slices` by id; a choice with no model is skipped with a warning.
    pub fn build(
        custom_types: &[CustomTypeModel],
        shared_slices: &[SharedSliceModel],
    ) -> Result<Self, TypePathError> {
        let shared: HashMap<&str, &SharedSliceModel> =
            shared_slices.iter().map(|s| (s.id.as_str(), s)).collect();
        let mut builder = Builder::default();
        for custom_type in custom_types {
            builder.custom_type(custom_type, &shared)?;
        }
        Self::from_type_paths(builder.entries)
    }

    /// Rebuild from persisted entries, rejecting duplicates.
    pub fn from_type_paths(entries: Vec<TypePath>) -> Result<Self, TypePathError> {
        let mut by_key = HashMap::with_capacity(entries.len());
        let mut children: HashMap<String, Vec<String>> = HashMap::new();
        for entry in &entries {
            let Some((last, parent)) = entry.path.split_last() else {
                return Err(TypePathError::EmptyPath);
            };
            let key = entry.key();
            if by_key.insert(key.clone(), entry.field_type).is_some() {
                return Err(TypePathError::DuplicatePath(key));
            }
            if !parent.is_empty() {
                children
                    .entry(parent.join("."))
                    .or_default()
                    .push(last.clone());
            }
        }
        Ok(Self {
            entries,
            by_key,
            children,
        })
    }

    pub fn resolve(&self, path: &FieldPath) -> Option<FieldType> {
        self.by_key.get(&path.key()).copied()
    }

    /// Direct child segments of `path`, in declaration order.
    pub fn children(&self, path: &FieldPath) -> Vec<&str> {
        self.children
            .get(&path.key())
            .map(|segments| segments.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Custom type ids that have a `Document` root entry.
    pub fn custom_types(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| e.path.len() == 1 && e.field_type == FieldType::Document)
            .map(|e| e.path[0].as_str())
            .collect()
    }

    pub fn type_paths(&self) -> &[TypePath] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Field type recorded for a leaf or container schema.
pub fn field_type_of(schema: &FieldSchema) -> FieldType {
    match schema {
        FieldSchema::Boolean => FieldType::Boolean,
        FieldSchema::Color => FieldType::Color,
        FieldSchema::Date => FieldType::Date,
        FieldSchema::Embed => FieldType::Embed,
        FieldSchema::GeoPoint => FieldType::GeoPoint,
        FieldSchema::IntegrationFields => FieldType::IntegrationFields,
        FieldSchema::Link => FieldType::Link,
        FieldSchema::Number => FieldType::Number,
        FieldSchema::Select => FieldType::Select,
        FieldSchema::StructuredText => FieldType::StructuredText,
        FieldSchema::Text => FieldType::Text,
        FieldSchema::Timestamp => FieldType::Timestamp,
        FieldSchema::Uid => FieldType::Uid,
        FieldSchema::Image { .. } => FieldType::Image,
        FieldSchema::Group { .. } => FieldType::Group,
        FieldSchema::Slices { .. } => FieldType::Slices,
        FieldSchema::Slice { .. } => FieldType::Slice,
        FieldSchema::SharedSlice => FieldType::SharedSlice,
        FieldSchema::Unknown => FieldType::Unknown,
    }
}

#[derive(Default)]
struct Builder {
    entries: Vec<TypePath>,
    seen: HashSet<String>,
}

impl Builder {
    fn push(&mut self, path: &FieldPath, field_type: FieldType) -> Result<(), TypePathError> {
        let key = path.key();
        if !self.seen.insert(key.clone()) {
            return Err(TypePathError::DuplicatePath(key));
        }
        self.entries.push(TypePath::new(path, field_type));
        Ok(())
    }

    fn custom_type(
        &mut self,
        custom_type: &CustomTypeModel,
        shared: &HashMap<&str, &SharedSliceModel>,
    ) -> Result<(), TypePathError> {
        let root = FieldPath::root(custom_type.id.as_str());
        self.push(&root, FieldType::Document)?;
        self.push(&root.child("alternate_languages"), FieldType::AlternateLanguages)?;
        let data = root.child("data");
        self.push(&data, FieldType::DocumentData)?;

        for (name, schema) in custom_type.fields() {
            if matches!(schema, FieldSchema::Uid) {
                self.push(&root.child("uid"), FieldType::Uid)?;
                continue;
            }
            self.field(&data.child(name.as_str()), schema, shared)?;
        }
        Ok(())
    }

    fn fields(
        &mut self,
        parent: &FieldPath,
        fields: &FieldSchemaMap,
        shared: &HashMap<&str, &SharedSliceModel>,
    ) -> Result<(), TypePathError> {
        for (name, schema) in fields {
            self.field(&parent.child(name.as_str()), schema, shared)?;
        }
        Ok(())
    }

    fn field(
        &mut self,
        path: &FieldPath,
        schema: &FieldSchema,
        shared: &HashMap<&str, &SharedSliceModel>,
    ) -> Result<(), TypePathError> {
        match schema {
            FieldSchema::Image { config } => {
                self.push(path, FieldType::Image)?;
                let thumbnails = path.child("thumbnails");
                for thumbnail in &config.thumbnails {
                    self.push(
                        &thumbnails.child(thumbnail.name.as_str()),
                        FieldType::ImageThumbnail,
                    )?;
                }
            }
            FieldSchema::Group { config } => {
                self.push(path, FieldType::Group)?;
                self.fields(path, &config.fields, shared)?;
            }
            FieldSchema::Slices { config } => {
                self.push(path, FieldType::Slices)?;
                for (choice, choice_schema) in &config.choices {
                    self.slice_choice(&path.child(choice.as_str()), choice, choice_schema, shared)?;
                }
            }
            FieldSchema::Slice { .. } | FieldSchema::SharedSlice => {
                warn!(path = %path, "slice schema outside a slice zone; recorded as unknown");
                self.push(path, FieldType::Unknown)?;
            }
            other => self.push(path, field_type_of(other))?,
        }
        Ok(())
    }

    fn slice_choice(
        &mut self,
        path: &FieldPath,
        choice: &str,
        schema: &FieldSchema,
        shared: &HashMap<&str, &SharedSliceModel>,
    ) -> Result<(), TypePathError> {
        match schema {
            FieldSchema::Slice { non_repeat, repeat } => {
                self.push(path, FieldType::Slice)?;
                self.fields(&path.child("primary"), non_repeat, shared)?;
                self.fields(&path.child("items"), repeat, shared)?;
            }
            FieldSchema::SharedSlice => {
                let Some(model) = shared.get(choice) else {
                    warn!(path = %path, slice = choice, "shared slice model not found; skipped");
                    return Ok(());
                };
                self.push(path, FieldType::SharedSlice)?;
                for variation in &model.variations {
                    let variation_path = path.child(variation.id.as_str());
                    self.push(&variation_path, FieldType::SharedSliceVariation)?;
                    self.fields(&variation_path.child("primary"), &variation.primary, shared)?;
                    self.fields(&variation_path.child("items"), &variation.items, shared)?;
                }
            }
            other => {
                warn!(path = %path, "slice zone choice is not a slice; recorded as unknown");
                self.push(path, field_type_of(other))?;
            }
        }
        Ok(())
    }
}

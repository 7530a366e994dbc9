//! Type-path registry.
//!
//! Derived once per schema version from the CMS's custom-type and
//! shared-slice models, persisted as a content-hashed manifest at build time,
//! and loaded back when a preview session bootstraps.
//!
//! The registry is the only thing the normalizer dispatches on. Container
//! fields (`Group`, `Slices`, `Slice`, `SharedSlice`,
//! `SharedSliceVariation`) are tagged distinctly from their element types, so
//! an empty group and an empty slice zone never need to be told apart by
//! their data.
//!
//! ## Lookups
//!
//! [`TypePathRegistry::resolve`] returns `None` for an unknown path. That is a
//! normal outcome: callers pass such values through unchanged.
//!
//! ```
//! use model::{CustomTypeModel, FieldPath, FieldType};
//! use typepath::TypePathRegistry;
//!
//! let page: CustomTypeModel = serde_json::from_str(
//!     r#"{"id":"page","json":{"Main":{"title":{"type":"StructuredText"}}}}"#,
//! ).unwrap();
//! let registry = TypePathRegistry::build(&[page], &[]).unwrap();
//!
//! let title = FieldPath::root("page").child("data").child("title");
//! assert_eq!(registry.resolve(&title), Some(FieldType::StructuredText));
//! assert_eq!(registry.resolve(&title.child("nope")), None);
//! ```
mod error;
mod manifest;
mod registry;

pub use crate::error::TypePathError;
pub use crate::manifest::{
    pointer_file_name, schema_digest, ManifestFiles, ManifestPointer, TypePathManifest,
    MANIFEST_VERSION,
};
pub use crate::registry::{field_type_of, TypePathRegistry};

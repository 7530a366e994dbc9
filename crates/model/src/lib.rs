//! Live preview data model.
//!
//! Shared vocabulary for every other crate in the workspace. Nothing in here
//! performs I/O or holds state.
//!
//! ## What lives here
//!
//! - **Raw documents** ([`raw`]): the CMS API shape, read-only input.
//! - **Schema models** ([`schema`]): custom types and shared slices, as the
//!   CMS exposes them. Consumed to build the type-path registry.
//! - **Paths** ([`path`]): immutable [`FieldPath`]s and the [`TypePath`]
//!   entries a registry is made of.
//! - **Normalized nodes** ([`normalized`]): the normalizer's output, including
//!   the [`DocumentReference`] value used for lazy cross-document links.
//!
//! ## Example
//!
//! ```
//! use model::{FieldPath, FieldType, TypePath};
//!
//! let path = FieldPath::root("page").child("data").child("title");
//! let entry = TypePath::new(&path, FieldType::StructuredText);
//! assert_eq!(entry.key(), "page.data.title");
//! ```
pub mod normalized;
pub mod path;
pub mod raw;
pub mod schema;

pub use crate::normalized::{
    DocumentLookup, DocumentReference, FieldMap, FixedImage, FluidImage, ImageField, LinkField,
    NormalizedAlternateLanguage, NormalizedDocument, NormalizedField, SliceNode,
    StructuredTextField,
};
pub use crate::path::{FieldPath, FieldType, TypePath};
pub use crate::raw::{
    AlternateLanguage, ImageDimensions, LinkTarget, LinkType, RawDocument, RawImage, RawLink,
    RawRichTextBlock, RawSlice, RawSpan,
};
pub use crate::schema::{
    CustomTypeModel, FieldSchema, FieldSchemaMap, GroupConfig, ImageConfig, SharedSliceModel,
    SharedSliceVariation, SlicesConfig, ThumbnailConfig,
};

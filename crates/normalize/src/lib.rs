//! Field normalizer.
//!
//! Turns raw CMS documents into the node shape the static build produced.
//! One algorithm for every environment; what varies is the
//! [`Capabilities`] set handed in (link resolver, optional HTML serializer,
//! image URL builder).
//!
//! ## What we do
//!
//! - **Structured text** → `{html, text, raw}`, rendered eagerly.
//! - **Images** → base URL plus `fixed`/`fluid` descriptors, a placeholder
//!   URL and one entry per configured thumbnail.
//! - **Links** → raw keys, a resolved `url`, and for live document links an
//!   unresolved [`model::DocumentReference`].
//! - **Groups** → each element normalized against the group's field paths.
//! - **Slice zones** → each slice normalized against its own legacy or
//!   shared-slice schema, with a synthetic id.
//!
//! ## Non-fatal by default
//!
//! Unknown paths, malformed values and missing slice schemas never fail a
//! document. They pass through as [`model::NormalizedField::Raw`] with a
//! `warn!` naming the dotted path. A preview should render *something*.
//!
//! ## Example
//!
//! ```
//! use identity::NodeIdentity;
//! use model::{CustomTypeModel, LinkTarget, RawDocument};
//! use normalize::{Capabilities, NormalizeConfig, Normalizer};
//! use typepath::TypePathRegistry;
//!
//! let page: CustomTypeModel = serde_json::from_str(
//!     r#"{"id":"page","json":{"Main":{"title":{"type":"StructuredText"}}}}"#,
//! ).unwrap();
//! let registry = TypePathRegistry::build(&[page], &[]).unwrap();
//! let ids = NodeIdentity::for_repository("blog", None).unwrap();
//! let config = NormalizeConfig::default();
//! fn route(doc: &LinkTarget) -> Option<String> {
//!     Some(format!("/{}", doc.uid.as_deref().unwrap_or(&doc.id)))
//! }
//! let caps = Capabilities::new(route);
//!
//! let raw: RawDocument = serde_json::from_str(
//!     r#"{"id":"X1","uid":"hello","type":"page",
//!         "data":{"title":[{"type":"heading1","text":"Hello","spans":[]}]}}"#,
//! ).unwrap();
//! let doc = Normalizer::new(&registry, &ids, &config, &caps)
//!     .normalize_document(&raw)
//!     .unwrap();
//!
//! assert_eq!(doc.type_name, "PrismicPage");
//! assert_eq!(doc.url.as_deref(), Some("/hello"));
//! let title = doc.field("title").and_then(|f| f.as_structured_text()).unwrap();
//! assert_eq!(title.html, "<h1>Hello</h1>");
//! ```
mod capabilities;
mod config;
mod error;
mod images;
mod imgix;
mod normalizer;
pub mod richtext;
mod type_names;

pub use crate::capabilities::{
    Capabilities, HtmlElement, HtmlSerializer, ImageUrlBuilder, LinkResolver,
};
pub use crate::config::{ImageParams, NormalizeConfig};
pub use crate::error::NormalizeError;
pub use crate::imgix::ImgixUrlBuilder;
pub use crate::normalizer::Normalizer;
pub use crate::type_names::{document_type_name, legacy_slice_type_name, shared_slice_type_name};

//! Node identity service.
//!
//! Two deterministic functions the rest of the workspace builds on:
//!
//! - [`NodeIdentity::derive_id`]: UUIDv5 over `(kind, scope parts)`,
//!   namespaced per repository and type prefix.
//! - [`content_digest`]: SHA-256 over the canonical JSON form of a value,
//!   insensitive to object key order.
//!
//! Same logical input, same output, across runs and processes. Repeated
//! bootstraps therefore reuse node ids instead of fragmenting the store.
//!
//! ```
//! use identity::{content_digest, NodeIdentity};
//! use serde_json::json;
//!
//! let ids = NodeIdentity::for_repository("blog", None).unwrap();
//! assert_eq!(ids.document_id("X1").unwrap(), ids.document_id("X1").unwrap());
//! assert_eq!(
//!     content_digest(&json!({"a": 1, "b": 2})),
//!     content_digest(&json!({"b": 2, "a": 1}))
//! );
//! ```
mod digest;
mod error;
mod node;

pub use crate::digest::{canonical_json, content_digest, digest_bytes, DIGEST_VERSION};
pub use crate::error::IdentityError;
pub use crate::node::{NodeIdentity, NodeKind};

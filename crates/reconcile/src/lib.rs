//! Preview merge reconciler.
//!
//! Splices freshly normalized preview nodes into page data the static build
//! already produced. Two strategies, chosen by the caller:
//!
//! - [`traverse_and_replace`]: walk the static data and swap in any node
//!   whose identity field matches a preview node.
//! - [`root_replace_or_insert`]: for previews of pages that were never
//!   built, put the node at a root key derived from its type name.
//!
//! Neither falls back to the other. Both return a [`MergeOutcome`] whose
//! `is_preview` says whether preview content actually landed.
//!
//! ```
//! use reconcile::{traverse_and_replace, PreviewSnapshot};
//! use serde_json::json;
//!
//! let snapshot = PreviewSnapshot::from_nodes("id", vec![json!({"id": "x", "v": 2})]);
//! let out = traverse_and_replace(&json!({"page": {"ref": {"id": "x", "v": 1}}}), &snapshot);
//! assert!(out.is_preview);
//! assert_eq!(out.data, json!({"page": {"ref": {"id": "x", "v": 2}}}));
//! ```
mod merge;
mod snapshot;

pub use crate::merge::{
    reconcile, root_key, root_replace_or_insert, traverse_and_replace, MergeOutcome,
    MergeStrategy,
};
pub use crate::snapshot::{PreviewSnapshot, DEFAULT_IDENTITY_FIELD};

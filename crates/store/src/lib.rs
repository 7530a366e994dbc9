//! Document/session store.
//!
//! Holds normalized documents keyed by derived node id, the type-path
//! registry of every bootstrapped repository, per-repository bootstrap status
//! and access tokens. The store is the only shared mutable state in a preview
//! session; everything else reads it.
//!
//! Link fields never hold documents, only references. [`DocumentStore`]
//! implements [`model::DocumentLookup`], so a reference resolves against
//! whatever is stored *now*:
//!
//! ```
//! use store::DocumentStore;
//! use model::DocumentReference;
//!
//! let store = DocumentStore::new();
//! let reference = DocumentReference::new("node-b", "B");
//! assert!(reference.resolve(&store).is_none()); // not fetched yet
//! ```
//!
//! [`RepositoryRegistry`] holds per-repository configuration. It is built once
//! and passed around explicitly.
mod backend;
mod config;
mod error;
mod session;
mod snapshot;
mod store;

pub use crate::backend::{DocumentBackend, InMemoryBackend};
pub use crate::config::{
    RepositoryConfig, RepositoryOptions, RepositoryRegistry, MAX_PAGE_SIZE,
};
pub use crate::error::StoreError;
pub use crate::session::{BootstrapStatus, FailureCause};
pub use crate::snapshot::{render_document, SnapshotOptions};
pub use crate::store::DocumentStore;

//! CMS access for live preview.
//!
//! [`CmsClient`] is the seam between the preview engine and the CMS. The
//! engine only ever talks to the trait; [`HttpCmsClient`] is the production
//! implementation and tests substitute in-memory fakes.
//!
//! - Paginated search, single-document and id-batch fetches.
//! - Bearer-token auth. 401/403 surface as [`ClientError::Unauthorized`] so
//!   the UI can ask for an access token.
//! - Exponential backoff with jitter for 5xx, 408, 429 and transport errors.
//! - Every call races a [`tokio_util::sync::CancellationToken`].
//!
//! [`ManifestSource`] loads the type-path manifest written at build time.
mod api;
mod cms;
mod config;
mod error;
mod http;
mod manifest;
mod retry;
mod serde_millis;

pub use crate::api::{id_predicate, ids_predicate, ApiInfo, ApiRef, QueryOptions, SearchPage};
pub use crate::cms::CmsClient;
pub use crate::config::{ClientConfig, MAX_IDS_PER_QUERY};
pub use crate::error::ClientError;
pub use crate::http::HttpCmsClient;
pub use crate::manifest::{
    FileManifestSource, HttpManifestSource, ManifestSource, StaticManifestSource,
};
pub use crate::retry::{with_retry, RetryConfig};

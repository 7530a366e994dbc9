//! Workspace umbrella crate for live preview of headless-CMS content.
//!
//! A statically built site renders from CMS documents normalized at build
//! time. Live preview fetches unpublished content at a preview ref,
//! normalizes it into the same node shape, and splices it into the static
//! page data at render time.
//!
//! ```text
//! RawDocument ──normalize──▶ NormalizedDocument ──store──▶ DocumentStore
//!                                                              │ snapshot
//! static page data ─────────────────reconcile──────────────────┴──▶ page data
//! ```
//!
//! This crate re-exports the component crates, loads the YAML configuration
//! describing every repository, and builds type-path manifests at build time.
//!
//! ```rust,no_run
//! use livepreview::LivePreviewConfig;
//!
//! # fn main() -> Result<(), livepreview::ConfigLoadError> {
//! let config = LivePreviewConfig::from_file("preview.yaml")?;
//! let engine = livepreview::engine_from_config(&config)?;
//! assert!(!engine.repositories().is_empty());
//! # Ok(())
//! # }
//! ```
mod config;
mod manifest;
mod routes;

use std::sync::Arc;

pub use client::{
    ApiInfo, ApiRef, ClientConfig, ClientError, CmsClient, FileManifestSource, HttpCmsClient,
    HttpManifestSource, ManifestSource, QueryOptions, RetryConfig, SearchPage,
    StaticManifestSource,
};
pub use engine::{
    BootstrapState, BootstrapSummary, ClientFactory, ClosureConfig, ClosureReport, ErrorKind,
    HttpClientFactory, PreviewEngine, PreviewError, PreviewSession, Resolution, ResolverParams,
    ResolverState,
};
pub use identity::{content_digest, IdentityError, NodeIdentity};
pub use model::{
    CustomTypeModel, DocumentLookup, DocumentReference, LinkTarget, NormalizedDocument,
    NormalizedField, RawDocument, SharedSliceModel,
};
pub use normalize::{
    Capabilities, HtmlSerializer, ImageParams, ImageUrlBuilder, LinkResolver, NormalizeConfig,
    NormalizeError, Normalizer,
};
pub use reconcile::{reconcile, MergeOutcome, MergeStrategy, PreviewSnapshot};
pub use store::{
    BootstrapStatus, DocumentStore, RepositoryConfig, RepositoryOptions, RepositoryRegistry,
    SnapshotOptions, StoreError,
};
pub use typepath::{TypePathError, TypePathManifest, TypePathRegistry};

pub use crate::config::{
    ConfigLoadError, LivePreviewConfig, ManifestYamlConfig, RepositoryYamlConfig,
};
pub use crate::manifest::{build_manifest, read_models, write_manifests};
pub use crate::routes::RouteLinkResolver;

/// Build a [`PreviewEngine`] for every repository in `config`, reading
/// manifests from `manifests.dir` when set and over HTTP otherwise.
pub fn engine_from_config(config: &LivePreviewConfig) -> Result<PreviewEngine, ConfigLoadError> {
    let registry = config.registry()?;
    let clients = HttpClientFactory::new()?;
    let manifests: Arc<dyn ManifestSource> = match (&config.manifests.dir, &config.manifests.base_url)
    {
        (Some(dir), _) => Arc::new(FileManifestSource::new(dir.clone())),
        (None, Some(base_url)) => Arc::new(
            HttpManifestSource::new(clients.http_client().clone()).with_base_url(base_url)?,
        ),
        (None, None) => Arc::new(HttpManifestSource::new(clients.http_client().clone())),
    };
    Ok(PreviewEngine::new(
        Arc::new(registry),
        Arc::new(DocumentStore::new()),
        Arc::new(clients),
        manifests,
    ))
}

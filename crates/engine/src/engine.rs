use std::sync::Arc;

use client::{CmsClient, ManifestSource, QueryOptions};
use reconcile::{reconcile, root_replace_or_insert, MergeOutcome, MergeStrategy};
use serde_json::Value;
use store::{BootstrapStatus, DocumentStore, RepositoryOptions, RepositoryRegistry, SnapshotOptions};
use tokio_util::sync::CancellationToken;
use tracing::info;
use typepath::TypePathRegistry;

use crate::error::PreviewError;
use crate::factory::ClientFactory;

/// Entry point for everything a preview session does.
///
/// Holds the repository registry, the shared store and the collaborators
/// used to reach the CMS. Cheap to clone.
#[derive(Clone)]
pub struct PreviewEngine {
    pub(crate) repositories: Arc<RepositoryRegistry>,
    pub(crate) store: Arc<DocumentStore>,
    pub(crate) clients: Arc<dyn ClientFactory>,
    pub(crate) manifests: Arc<dyn ManifestSource>,
}

impl std::fmt::Debug for PreviewEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreviewEngine")
            .field("repositories", &self.repositories.names())
            .field("store", &self.store)
            .finish()
    }
}

impl PreviewEngine {
    pub fn new(
        repositories: Arc<RepositoryRegistry>,
        store: Arc<DocumentStore>,
        clients: Arc<dyn ClientFactory>,
        manifests: Arc<dyn ManifestSource>,
    ) -> Self {
        Self {
            repositories,
            store,
            clients,
            manifests,
        }
    }

    pub fn store(&self) -> &Arc<DocumentStore> {
        &self.store
    }

    pub fn repositories(&self) -> &RepositoryRegistry {
        &self.repositories
    }

    pub(crate) fn options(&self, repository: &str) -> Result<Arc<RepositoryOptions>, PreviewError> {
        self.repositories
            .get(repository)
            .ok_or_else(|| PreviewError::UnknownRepository(repository.to_owned()))
    }

    pub(crate) fn client_for(
        &self,
        options: &RepositoryOptions,
    ) -> Result<Arc<dyn CmsClient>, PreviewError> {
        let token = self.access_token(options.name());
        self.clients
            .client(options, token.as_deref())
            .map_err(|err| PreviewError::from_client(options.name(), err))
    }

    /// The repository's type paths: from the store when a previous run loaded
    /// them, otherwise from the manifest source.
    pub(crate) async fn type_paths(
        &self,
        options: &RepositoryOptions,
        reload: bool,
        cancel: &CancellationToken,
    ) -> Result<Arc<TypePathRegistry>, PreviewError> {
        let repository = options.name();
        if !reload {
            if let Some(registry) = self.store.type_paths(repository) {
                return Ok(registry);
            }
        }
        let manifest = self
            .manifests
            .load(repository, &options.config.type_paths_manifest(), cancel)
            .await
            .map_err(|err| PreviewError::from_manifest(repository, err))?;
        let registry = Arc::new(manifest.registry()?);
        self.store.set_type_paths(repository, Arc::clone(&registry));
        Ok(registry)
    }

    /// Base query for reading documents at `preview_ref`.
    pub(crate) fn query(options: &RepositoryOptions, preview_ref: &str) -> QueryOptions {
        QueryOptions::at_ref(preview_ref)
            .with_lang(options.config.lang.clone())
            .with_fetch_links(options.config.fetch_links.clone())
            .with_page_size(options.config.page_size)
    }

    pub fn bootstrap_status(&self, repository: &str) -> BootstrapStatus {
        self.store.bootstrap_status(repository)
    }

    // ---- render ----

    /// Merge preview content into statically built page data.
    pub fn render(
        &self,
        static_data: &Value,
        strategy: &MergeStrategy,
        options: &SnapshotOptions,
    ) -> Result<MergeOutcome, PreviewError> {
        let snapshot = self.store.snapshot(options)?;
        Ok(reconcile(static_data, &snapshot, strategy))
    }

    /// Insert the stored document `prismic_id` at the root of `static_data`,
    /// for pages that only exist as unpublished previews.
    pub fn render_unpublished(
        &self,
        static_data: &Value,
        repository: &str,
        prismic_id: &str,
        options: &SnapshotOptions,
    ) -> Result<MergeOutcome, PreviewError> {
        options.validate()?;
        let node = self
            .store
            .get_by_prismic_id(repository, prismic_id)
            .and_then(|doc| self.store.render(&doc.id, options));
        Ok(root_replace_or_insert(static_data, node.as_ref()))
    }

    // ---- access tokens ----

    /// Token set for this session, falling back to the configured one.
    pub fn access_token(&self, repository: &str) -> Option<String> {
        self.store.access_token(repository).or_else(|| {
            self.repositories
                .get(repository)
                .and_then(|options| options.config.access_token.clone())
        })
    }

    pub fn set_access_token(&self, repository: &str, token: &str) -> Result<(), PreviewError> {
        self.options(repository)?;
        let token = token.trim();
        if token.is_empty() {
            return Err(PreviewError::Configuration(
                "access token must not be empty".into(),
            ));
        }
        self.store.set_access_token(repository, token);
        info!(repository, "access_token_set");
        Ok(())
    }

    pub fn clear_access_token(&self, repository: &str) -> Result<Option<String>, PreviewError> {
        self.options(repository)?;
        let removed = self.store.clear_access_token(repository);
        info!(repository, removed = removed.is_some(), "access_token_cleared");
        Ok(removed)
    }

    /// Whether the UI should prompt for a token after an auth failure.
    pub fn prompts_for_access_token(&self, repository: &str) -> bool {
        self.repositories
            .get(repository)
            .is_some_and(|options| options.config.prompt_for_access_token)
    }

    /// Forget every document and session. Tokens survive.
    pub fn reset(&self) -> Result<usize, PreviewError> {
        Ok(self.store.reset()?)
    }

    /// Forget one repository's documents and session, so its next bootstrap
    /// starts from `INIT`. Its token survives.
    pub fn reset_repository(&self, repository: &str) -> Result<usize, PreviewError> {
        self.options(repository)?;
        Ok(self.store.clear_repository(repository)?)
    }
}

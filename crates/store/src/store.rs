use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use model::{DocumentLookup, NormalizedDocument};
use reconcile::PreviewSnapshot;
use serde_json::Value;
use tracing::{debug, info};
use typepath::TypePathRegistry;

use crate::backend::{DocumentBackend, InMemoryBackend};
use crate::error::StoreError;
use crate::session::{BootstrapStatus, FailureCause};
use crate::snapshot::{render_document, SnapshotOptions};

/// The document/session store shared by bootstrap, resolver and render.
///
/// Documents are keyed by derived node id. Every write bumps
/// [`DocumentStore::revision`] so render layers can recompute merged data.
pub struct DocumentStore {
    backend: Box<dyn DocumentBackend>,
    type_paths: RwLock<HashMap<String, Arc<TypePathRegistry>>>,
    sessions: RwLock<HashMap<String, BootstrapStatus>>,
    access_tokens: RwLock<HashMap<String, String>>,
    revision: AtomicU64,
}

impl Default for DocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentStore")
            .field("documents", &self.backend.len())
            .field("revision", &self.revision())
            .finish()
    }
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::with_backend(Box::new(InMemoryBackend::new()))
    }

    pub fn with_backend(backend: Box<dyn DocumentBackend>) -> Self {
        Self {
            backend,
            type_paths: RwLock::new(HashMap::new()),
            sessions: RwLock::new(HashMap::new()),
            access_tokens: RwLock::new(HashMap::new()),
            revision: AtomicU64::new(0),
        }
    }

    pub fn revision(&self) -> u64 {
        self.revision.load(Ordering::Acquire)
    }

    fn bump(&self) -> u64 {
        self.revision.fetch_add(1, Ordering::AcqRel) + 1
    }

    // ---- documents ----

    pub fn put_document(
        &self,
        document: NormalizedDocument,
    ) -> Result<Arc<NormalizedDocument>, StoreError> {
        let document = Arc::new(document);
        self.backend.put(Arc::clone(&document))?;
        let revision = self.bump();
        debug!(node_id = %document.id, revision, "store_put");
        Ok(document)
    }

    /// Store a batch of documents. Returns how many were written.
    pub fn put_documents<I>(&self, documents: I) -> Result<usize, StoreError>
    where
        I: IntoIterator<Item = NormalizedDocument>,
    {
        let batch: Vec<_> = documents.into_iter().map(Arc::new).collect();
        if batch.is_empty() {
            return Ok(0);
        }
        let written = self.backend.batch_put(batch)?;
        let revision = self.bump();
        debug!(written, revision, "store_batch_put");
        Ok(written)
    }

    pub fn get(&self, node_id: &str) -> Option<Arc<NormalizedDocument>> {
        self.backend.get(node_id)
    }

    pub fn get_by_prismic_id(
        &self,
        repository: &str,
        prismic_id: &str,
    ) -> Option<Arc<NormalizedDocument>> {
        self.backend.get_by_prismic_id(repository, prismic_id)
    }

    pub fn contains(&self, node_id: &str) -> bool {
        self.backend.get(node_id).is_some()
    }

    /// Stored documents, optionally for one repository, sorted by node id.
    pub fn documents(&self, repository: Option<&str>) -> Vec<Arc<NormalizedDocument>> {
        let mut docs = Vec::new();
        self.backend.scan(&mut |doc| {
            if repository.map_or(true, |repo| doc.repository == repo) {
                docs.push(Arc::clone(doc));
            }
        });
        docs.sort_by(|a, b| a.id.cmp(&b.id));
        docs
    }

    pub fn len(&self) -> usize {
        self.backend.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backend.is_empty()
    }

    // ---- type paths ----

    pub fn set_type_paths(&self, repository: &str, registry: Arc<TypePathRegistry>) {
        let mut type_paths = self
            .type_paths
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        type_paths.insert(repository.to_owned(), registry);
    }

    pub fn type_paths(&self, repository: &str) -> Option<Arc<TypePathRegistry>> {
        self.type_paths
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(repository)
            .cloned()
    }

    // ---- bootstrap status ----

    pub fn bootstrap_status(&self, repository: &str) -> BootstrapStatus {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(repository)
            .cloned()
            .unwrap_or_default()
    }

    /// Move `repository` to `BOOTSTRAPPING` for `preview_ref`, or refuse.
    ///
    /// The check and the transition happen under one write lock, so two
    /// callers racing for the same repository cannot both get through.
    pub fn try_begin_bootstrap(&self, repository: &str, preview_ref: &str) -> Result<(), StoreError> {
        let mut sessions = self.sessions.write().map_err(|_| StoreError::Poisoned)?;
        let current = sessions.get(repository).cloned().unwrap_or_default();
        current.admit(repository, preview_ref)?;
        sessions.insert(
            repository.to_owned(),
            BootstrapStatus::Bootstrapping {
                preview_ref: preview_ref.to_owned(),
            },
        );
        Ok(())
    }

    pub fn finish_bootstrap(&self, repository: &str, preview_ref: &str, documents: usize) {
        self.set_status(
            repository,
            BootstrapStatus::Bootstrapped {
                preview_ref: preview_ref.to_owned(),
                documents,
            },
        );
    }

    pub fn fail_bootstrap(&self, repository: &str, preview_ref: Option<&str>, cause: FailureCause) {
        self.set_status(
            repository,
            BootstrapStatus::Failed {
                preview_ref: preview_ref.map(str::to_owned),
                cause,
            },
        );
    }

    fn set_status(&self, repository: &str, status: BootstrapStatus) {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        sessions.insert(repository.to_owned(), status);
    }

    // ---- access tokens ----

    pub fn access_token(&self, repository: &str) -> Option<String> {
        self.access_tokens
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(repository)
            .cloned()
    }

    pub fn set_access_token(&self, repository: &str, token: impl Into<String>) {
        self.access_tokens
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(repository.to_owned(), token.into());
    }

    /// Returns the removed token, if there was one.
    pub fn clear_access_token(&self, repository: &str) -> Option<String> {
        self.access_tokens
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(repository)
    }

    // ---- lifecycle ----

    /// Forget one repository's documents, type paths and bootstrap status.
    /// Its access token survives.
    pub fn clear_repository(&self, repository: &str) -> Result<usize, StoreError> {
        let removed = self.backend.clear(Some(repository))?;
        self.type_paths
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(repository);
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(repository);
        let revision = self.bump();
        info!(repository, removed, revision, "store_clear_repository");
        Ok(removed)
    }

    /// Drop every document and session. Access tokens survive.
    pub fn reset(&self) -> Result<usize, StoreError> {
        let removed = self.backend.clear(None)?;
        self.type_paths
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        let revision = self.bump();
        info!(removed, revision, "store_reset");
        Ok(removed)
    }

    // ---- rendering ----

    /// Render one stored document with links resolved `link_depth` hops.
    pub fn render(&self, node_id: &str, options: &SnapshotOptions) -> Option<Value> {
        let document = self.get(node_id)?;
        Some(render_document(
            &document,
            self,
            &options.identity_field,
            options.link_depth,
        ))
    }

    /// Every stored document rendered and keyed by the identity field.
    pub fn snapshot(&self, options: &SnapshotOptions) -> Result<PreviewSnapshot, StoreError> {
        options.validate()?;
        let nodes = self
            .documents(options.repository.as_deref())
            .into_iter()
            .map(|doc| render_document(&doc, self, &options.identity_field, options.link_depth));
        Ok(PreviewSnapshot::from_nodes(
            options.identity_field.clone(),
            nodes,
        ))
    }
}

impl DocumentLookup for DocumentStore {
    fn lookup(&self, node_id: &str) -> Option<Arc<NormalizedDocument>> {
        self.get(node_id)
    }
}

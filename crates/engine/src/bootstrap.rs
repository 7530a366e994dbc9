//! Repository bootstrap.
//!
//! ```text
//! INIT ──start──▶ BOOTSTRAPPING ──succeed──▶ BOOTSTRAPPED
//!                       │
//!                       └──────fail──────▶ FAILED(cause)
//! ```
//!
//! One invocation walks the machine once. A bootstrap:
//!
//! 1. finds the preview session and the repository's options,
//! 2. claims the repository in the store (refused when already bootstrapped
//!    for the same ref, or while another bootstrap is running),
//! 3. loads the type paths,
//! 4. fetches the documents at the preview ref, or only what a release
//!    changes,
//! 5. normalizes and stores them, then runs the link closure.
//!
//! Writes committed before a failure or cancellation stay in the store.
use std::collections::{HashMap, HashSet};
use std::time::Instant;

use client::{CmsClient, QueryOptions};
use identity::content_digest;
use model::{NormalizedDocument, RawDocument};
use normalize::Normalizer;
use serde::{Deserialize, Serialize};
use store::{FailureCause, RepositoryOptions};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn, Instrument, Level};

use crate::closure::{ClosureConfig, ClosureFetcher, ClosureReport};
use crate::engine::PreviewEngine;
use crate::error::PreviewError;
use crate::session::PreviewSession;

/// Outcome of a successful bootstrap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BootstrapSummary {
    pub repository: String,
    pub preview_ref: String,
    pub release_id: Option<String>,
    /// Documents fetched at the preview ref (before any release diff).
    pub fetched: usize,
    /// Documents stored as seeds.
    pub documents: usize,
    pub closure: ClosureReport,
    pub elapsed_micros: u64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum BootstrapState {
    #[default]
    Init,
    Bootstrapping,
    Bootstrapped(BootstrapSummary),
    Failed(PreviewError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum BootstrapEvent {
    Start,
    Succeed(BootstrapSummary),
    Fail(PreviewError),
}

impl BootstrapState {
    /// Apply `event`. Events that don't fit the current state leave it as is;
    /// terminal states never change.
    pub fn on(self, event: BootstrapEvent) -> Self {
        match (self, event) {
            (BootstrapState::Init, BootstrapEvent::Start) => BootstrapState::Bootstrapping,
            (BootstrapState::Bootstrapping, BootstrapEvent::Succeed(summary)) => {
                BootstrapState::Bootstrapped(summary)
            }
            (BootstrapState::Bootstrapping, BootstrapEvent::Fail(err)) => {
                BootstrapState::Failed(err)
            }
            (state, _) => state,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            BootstrapState::Init => "INIT",
            BootstrapState::Bootstrapping => "BOOTSTRAPPING",
            BootstrapState::Bootstrapped(_) => "BOOTSTRAPPED",
            BootstrapState::Failed(_) => "FAILED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BootstrapState::Bootstrapped(_) | BootstrapState::Failed(_)
        )
    }

    pub fn summary(&self) -> Option<&BootstrapSummary> {
        match self {
            BootstrapState::Bootstrapped(summary) => Some(summary),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&PreviewError> {
        match self {
            BootstrapState::Failed(err) => Some(err),
            _ => None,
        }
    }
}

impl PreviewEngine {
    /// Bootstrap from the preview cookie value, if there is one.
    pub async fn bootstrap(
        &self,
        cookie: Option<&str>,
        cancel: &CancellationToken,
    ) -> BootstrapState {
        let state = BootstrapState::Init.on(BootstrapEvent::Start);
        let outcome = match self.session_from_cookie(cookie) {
            Ok(session) => self.bootstrap_inner(&session, cancel).await,
            Err(err) => Err(err),
        };
        finish(state, outcome)
    }

    /// Bootstrap an already detected session.
    pub async fn bootstrap_session(
        &self,
        session: &PreviewSession,
        cancel: &CancellationToken,
    ) -> BootstrapState {
        let state = BootstrapState::Init.on(BootstrapEvent::Start);
        finish(state, self.bootstrap_inner(session, cancel).await)
    }

    /// The cookie's session for a configured repository.
    fn session_from_cookie(&self, cookie: Option<&str>) -> Result<PreviewSession, PreviewError> {
        let sessions = PreviewSession::from_cookie_value(cookie.unwrap_or_default())?;
        let Some(first) = sessions.first() else {
            return Err(PreviewError::SessionAbsent);
        };
        let unknown = first.repository.clone();
        sessions
            .into_iter()
            .find(|session| self.repositories.get(&session.repository).is_some())
            .ok_or(PreviewError::UnknownRepository(unknown))
    }

    async fn bootstrap_inner(
        &self,
        session: &PreviewSession,
        cancel: &CancellationToken,
    ) -> Result<BootstrapSummary, PreviewError> {
        let start = Instant::now();
        let options = self.options(&session.repository)?;
        let repository = options.name();
        // Guard failures leave the store untouched.
        self.store
            .try_begin_bootstrap(repository, &session.preview_ref)?;

        let span = tracing::span!(
            Level::INFO,
            "preview.bootstrap",
            repository = %repository,
            preview_ref = %session.preview_ref
        );
        let result = self
            .run_bootstrap(&options, session, start, cancel)
            .instrument(span)
            .await;

        let elapsed_micros = start.elapsed().as_micros();
        match &result {
            Ok(summary) => {
                self.store
                    .finish_bootstrap(repository, &session.preview_ref, summary.documents);
                info!(
                    repository = %repository,
                    documents = summary.documents,
                    linked = summary.closure.fetched,
                    release = ?summary.release_id,
                    elapsed_micros,
                    "bootstrap_success"
                );
            }
            Err(err) => {
                self.store.fail_bootstrap(
                    repository,
                    Some(&session.preview_ref),
                    FailureCause::new(err.kind().as_str(), err.to_string()),
                );
                warn!(
                    repository = %repository,
                    kind = %err.kind(),
                    error = %err,
                    elapsed_micros,
                    "bootstrap_failure"
                );
            }
        }
        result
    }

    async fn run_bootstrap(
        &self,
        options: &RepositoryOptions,
        session: &PreviewSession,
        start: Instant,
        cancel: &CancellationToken,
    ) -> Result<BootstrapSummary, PreviewError> {
        let repository = options.name();
        let client = self.client_for(options)?;
        let registry = self.type_paths(options, true, cancel).await?;
        let normalizer = Normalizer::new(
            &registry,
            &options.identity,
            &options.normalize,
            &options.capabilities,
        );

        let mut query = Self::query(options, &session.preview_ref);
        query.predicates.extend(options.config.predicates.iter().cloned());
        let raws = client
            .fetch_all(&query, cancel)
            .await
            .map_err(|err| PreviewError::from_client(repository, err))?;
        let fetched = raws.len();

        let release_id = options
            .config
            .release_id
            .clone()
            .or_else(|| session.release_id.clone());
        let raws = match &release_id {
            Some(release) => {
                let changed = release_diff(client.as_ref(), options, raws, cancel).await?;
                info!(release = %release, fetched, changed = changed.len(), "release_diff");
                changed
            }
            None => raws,
        };

        let normalized: Vec<NormalizedDocument> = raws
            .iter()
            .filter_map(|raw| normalizer.normalize_document(raw).ok())
            .collect();
        if cancel.is_cancelled() {
            return Err(PreviewError::Aborted);
        }
        let mut seeds = Vec::with_capacity(normalized.len());
        for doc in normalized {
            seeds.push(self.store.put_document(doc)?);
        }
        let documents = seeds.len();

        let link_query = Self::query(options, &session.preview_ref);
        let closure_config =
            ClosureConfig::default().with_max_depth(options.config.max_link_depth as usize);
        let mut seen = HashSet::new();
        let closure = ClosureFetcher::new(
            client.as_ref(),
            normalizer,
            &self.store,
            &link_query,
            closure_config,
        )
        .expand(seeds, &mut seen, cancel)
        .await?;

        Ok(BootstrapSummary {
            repository: repository.to_owned(),
            preview_ref: session.preview_ref.clone(),
            release_id,
            fetched,
            documents,
            closure,
            elapsed_micros: start.elapsed().as_micros() as u64,
        })
    }
}

fn finish(state: BootstrapState, outcome: Result<BootstrapSummary, PreviewError>) -> BootstrapState {
    match outcome {
        Ok(summary) => state.on(BootstrapEvent::Succeed(summary)),
        Err(err) => state.on(BootstrapEvent::Fail(err)),
    }
}

/// Documents a release adds or changes relative to the master ref.
///
/// Unpublished documents are always part of the diff. Published ones are
/// compared by content digest against their master version.
async fn release_diff(
    client: &dyn CmsClient,
    options: &RepositoryOptions,
    raws: Vec<RawDocument>,
    cancel: &CancellationToken,
) -> Result<Vec<RawDocument>, PreviewError> {
    let repository = options.name();
    let published = client
        .fetch_published_ids(cancel)
        .await
        .map_err(|err| PreviewError::from_client(repository, err))?;
    let overlap: Vec<String> = raws
        .iter()
        .filter(|raw| published.contains(&raw.id))
        .map(|raw| raw.id.clone())
        .collect();

    let mut master_digests = HashMap::new();
    if !overlap.is_empty() {
        let api = client
            .fetch_api(cancel)
            .await
            .map_err(|err| PreviewError::from_client(repository, err))?;
        let master = api
            .master_ref()
            .ok_or_else(|| PreviewError::Data("API root advertises no master ref".into()))?;
        let query = QueryOptions::at_ref(master.reference.clone())
            .with_lang(options.config.lang.clone())
            .with_fetch_links(options.config.fetch_links.clone());
        let master_docs = client
            .fetch_by_ids(&overlap, &query, cancel)
            .await
            .map_err(|err| PreviewError::from_client(repository, err))?;
        master_digests = master_docs
            .iter()
            .map(|doc| (doc.id.clone(), content_digest(&doc.to_value())))
            .collect();
    }

    Ok(raws
        .into_iter()
        .filter(|raw| match master_digests.get(&raw.id) {
            Some(digest) => *digest != content_digest(&raw.to_value()),
            None => true,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary() -> BootstrapSummary {
        BootstrapSummary {
            repository: "blog".into(),
            preview_ref: "r".into(),
            release_id: None,
            fetched: 0,
            documents: 0,
            closure: ClosureReport::default(),
            elapsed_micros: 0,
        }
    }

    #[test]
    fn transitions() {
        let state = BootstrapState::Init.on(BootstrapEvent::Start);
        assert_eq!(state, BootstrapState::Bootstrapping);
        let done = state.on(BootstrapEvent::Succeed(summary()));
        assert_eq!(done.name(), "BOOTSTRAPPED");
        let still = done.clone().on(BootstrapEvent::Fail(PreviewError::Aborted));
        assert_eq!(still, done);
    }

    #[test]
    fn init_cannot_skip_to_terminal() {
        let state = BootstrapState::Init.on(BootstrapEvent::Succeed(summary()));
        assert_eq!(state, BootstrapState::Init);
        let failed = BootstrapState::Bootstrapping.on(BootstrapEvent::Fail(PreviewError::SessionAbsent));
        assert!(failed.is_terminal());
        assert_eq!(failed.error(), Some(&PreviewError::SessionAbsent));
    }
}

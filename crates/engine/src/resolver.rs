//! Single-document preview entry.
//!
//! `INIT → RESOLVING → RESOLVED | FAILED`. The resolver URL carries a
//! `documentId` and the preview `token`; the document is fetched at the
//! token's ref, normalized, stored, and turned into the path the browser
//! should navigate to.
use std::time::Instant;

use client::ClientError;
use normalize::Normalizer;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn, Instrument, Level};

use crate::engine::PreviewEngine;
use crate::error::PreviewError;
use crate::session::{PreviewSession, ResolverParams};

/// Where a resolved preview should land.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub repository: String,
    pub document_id: String,
    pub node_id: String,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum ResolverState {
    #[default]
    Init,
    Resolving,
    Resolved(Resolution),
    Failed(PreviewError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResolverEvent {
    Start,
    Resolve(Resolution),
    Fail(PreviewError),
}

impl ResolverState {
    pub fn on(self, event: ResolverEvent) -> Self {
        match (self, event) {
            (ResolverState::Init, ResolverEvent::Start) => ResolverState::Resolving,
            (ResolverState::Resolving, ResolverEvent::Resolve(resolution)) => {
                ResolverState::Resolved(resolution)
            }
            (ResolverState::Resolving, ResolverEvent::Fail(err)) => ResolverState::Failed(err),
            (state, _) => state,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ResolverState::Init => "INIT",
            ResolverState::Resolving => "RESOLVING",
            ResolverState::Resolved(_) => "RESOLVED",
            ResolverState::Failed(_) => "FAILED",
        }
    }

    pub fn resolution(&self) -> Option<&Resolution> {
        match self {
            ResolverState::Resolved(resolution) => Some(resolution),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&PreviewError> {
        match self {
            ResolverState::Failed(err) => Some(err),
            _ => None,
        }
    }
}

impl PreviewEngine {
    /// Resolve a single-document preview.
    ///
    /// `expected_repository`, when given, must match the repository the
    /// token belongs to.
    pub async fn resolve(
        &self,
        params: Option<&ResolverParams>,
        expected_repository: Option<&str>,
        cancel: &CancellationToken,
    ) -> ResolverState {
        let state = ResolverState::Init.on(ResolverEvent::Start);
        let outcome = match params {
            Some(params) => self.resolve_inner(params, expected_repository, cancel).await,
            None => Err(PreviewError::SessionAbsent),
        };
        match outcome {
            Ok(resolution) => state.on(ResolverEvent::Resolve(resolution)),
            Err(err) => state.on(ResolverEvent::Fail(err)),
        }
    }

    async fn resolve_inner(
        &self,
        params: &ResolverParams,
        expected_repository: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<Resolution, PreviewError> {
        let start = Instant::now();
        let session = params.session()?;
        if let Some(expected) = expected_repository {
            if expected != session.repository {
                return Err(PreviewError::RepositoryMismatch {
                    expected: expected.to_owned(),
                    found: session.repository,
                });
            }
        }
        let span = tracing::span!(
            Level::INFO,
            "preview.resolve",
            repository = %session.repository,
            document_id = %params.document_id
        );

        let result = self
            .resolve_document(params, &session, cancel)
            .instrument(span)
            .await;

        let elapsed_micros = start.elapsed().as_micros();
        match &result {
            Ok(resolution) => info!(
                repository = %resolution.repository,
                document_id = %resolution.document_id,
                path = %resolution.path,
                elapsed_micros,
                "resolve_success"
            ),
            Err(err) => warn!(
                repository = %session.repository,
                document_id = %params.document_id,
                kind = %err.kind(),
                error = %err,
                elapsed_micros,
                "resolve_failure"
            ),
        }
        result
    }

    async fn resolve_document(
        &self,
        params: &ResolverParams,
        session: &PreviewSession,
        cancel: &CancellationToken,
    ) -> Result<Resolution, PreviewError> {
        let options = self.options(&session.repository)?;
        let repository = options.name();
        let client = self.client_for(&options)?;
        let registry = self.type_paths(&options, false, cancel).await?;
        let normalizer = Normalizer::new(
            &registry,
            &options.identity,
            &options.normalize,
            &options.capabilities,
        );

        let query = Self::query(&options, &session.preview_ref);
        let raw = client
            .fetch_document_by_id(&params.document_id, &query, cancel)
            .await
            .map_err(|err| match err {
                ClientError::NotFound(_) => {
                    PreviewError::DocumentNotFound(params.document_id.clone())
                }
                other => PreviewError::from_client(repository, other),
            })?;
        let doc = normalizer.normalize_document(&raw)?;
        if cancel.is_cancelled() {
            return Err(PreviewError::Aborted);
        }
        let stored = self.store.put_document(doc)?;
        Ok(Resolution {
            repository: repository.to_owned(),
            document_id: params.document_id.clone(),
            node_id: stored.id.clone(),
            path: stored
                .url
                .clone()
                .filter(|url| !url.is_empty())
                .unwrap_or_else(|| "/".to_owned()),
        })
    }
}

//! Linked-document closure.
//!
//! Starting from a set of seed documents, fetch every document reachable
//! through link fields and alternate languages, one generation at a time.
//! Each generation is fetched as one id batch (chunked and concurrent inside
//! the client); generations run in sequence.
//!
//! The walk stops when a generation adds nothing new or after
//! [`ClosureConfig::max_depth`] generations. Stopping at the cap is not an
//! error: references past it simply resolve to nothing.
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use client::{CmsClient, QueryOptions};
use model::NormalizedDocument;
use normalize::Normalizer;
use serde::{Deserialize, Serialize};
use store::DocumentStore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::PreviewError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClosureConfig {
    /// Generations fetched beyond the seeds.
    pub max_depth: usize,
}

impl Default for ClosureConfig {
    fn default() -> Self {
        Self { max_depth: 3 }
    }
}

impl ClosureConfig {
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }
}

/// What a closure walk did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClosureReport {
    /// Generations fetched.
    pub depth: usize,
    /// Documents fetched and stored.
    pub fetched: usize,
    /// Whether the walk stopped at the depth cap with references left over.
    pub truncated: bool,
    /// CMS ids referenced but not fetched because of the cap.
    pub unresolved: usize,
}

pub struct ClosureFetcher<'a> {
    client: &'a dyn CmsClient,
    normalizer: Normalizer<'a>,
    store: &'a DocumentStore,
    query: &'a QueryOptions,
    config: ClosureConfig,
}

impl<'a> ClosureFetcher<'a> {
    pub fn new(
        client: &'a dyn CmsClient,
        normalizer: Normalizer<'a>,
        store: &'a DocumentStore,
        query: &'a QueryOptions,
        config: ClosureConfig,
    ) -> Self {
        Self {
            client,
            normalizer,
            store,
            query,
            config,
        }
    }

    /// Fetch, normalize and store everything reachable from `seeds`.
    ///
    /// `fetched` holds the CMS ids already fetched in this session and is
    /// extended as the walk goes.
    pub async fn expand(
        &self,
        seeds: Vec<Arc<NormalizedDocument>>,
        fetched: &mut HashSet<String>,
        cancel: &CancellationToken,
    ) -> Result<ClosureReport, PreviewError> {
        let start = Instant::now();
        let repository = self.normalizer.identity().repository().to_owned();
        let mut report = ClosureReport::default();
        fetched.extend(seeds.iter().map(|doc| doc.prismic_id.clone()));
        let mut frontier = seeds;

        loop {
            let pending = self.pending_ids(&frontier, fetched);
            if pending.is_empty() {
                break;
            }
            if report.depth >= self.config.max_depth {
                report.truncated = true;
                report.unresolved = pending.len();
                warn!(
                    repository = %repository,
                    max_depth = self.config.max_depth,
                    unresolved = pending.len(),
                    "link depth limit reached; deeper references stay unresolved"
                );
                break;
            }
            if cancel.is_cancelled() {
                return Err(PreviewError::Aborted);
            }

            let raws = self
                .client
                .fetch_by_ids(&pending, self.query, cancel)
                .await
                .map_err(|err| PreviewError::from_client(&repository, err))?;
            fetched.extend(pending);
            let generation: Vec<NormalizedDocument> = raws
                .iter()
                .filter_map(|raw| self.normalizer.normalize_document(raw).ok())
                .collect();

            // A cancelled session must not write anything more.
            if cancel.is_cancelled() {
                return Err(PreviewError::Aborted);
            }
            let mut next = Vec::with_capacity(generation.len());
            for doc in generation {
                next.push(self.store.put_document(doc)?);
            }
            report.depth += 1;
            report.fetched += next.len();
            debug!(
                repository = %repository,
                depth = report.depth,
                documents = next.len(),
                "closure_generation"
            );
            frontier = next;
        }

        info!(
            repository = %repository,
            depth = report.depth,
            fetched = report.fetched,
            truncated = report.truncated,
            elapsed_micros = start.elapsed().as_micros(),
            "closure_success"
        );
        Ok(report)
    }

    /// Referenced CMS ids not fetched yet, in first reference order.
    fn pending_ids(
        &self,
        frontier: &[Arc<NormalizedDocument>],
        fetched: &HashSet<String>,
    ) -> Vec<String> {
        let mut seen = HashSet::new();
        frontier
            .iter()
            .flat_map(|doc| doc.document_references())
            .filter(|reference| !fetched.contains(&reference.prismic_id))
            .filter(|reference| seen.insert(reference.prismic_id.clone()))
            .map(|reference| reference.prismic_id.clone())
            .collect()
    }
}

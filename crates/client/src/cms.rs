use std::collections::HashSet;

use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use model::RawDocument;
use tokio_util::sync::CancellationToken;

use crate::api::{id_predicate, ids_predicate, ApiInfo, QueryOptions, SearchPage};
use crate::config::MAX_IDS_PER_QUERY;
use crate::error::ClientError;

/// Read access to a CMS repository.
///
/// Implementors provide the three primitive calls; everything else has a
/// default built on [`CmsClient::fetch_page`]. Every call takes the session's
/// cancellation token and must return [`ClientError::Aborted`] once it fires.
#[async_trait]
pub trait CmsClient: Send + Sync {
    /// The API root: refs and releases.
    async fn fetch_api(&self, cancel: &CancellationToken) -> Result<ApiInfo, ClientError>;

    /// One page (1-based) of a document search.
    async fn fetch_page(
        &self,
        query: &QueryOptions,
        page: u32,
        cancel: &CancellationToken,
    ) -> Result<SearchPage, ClientError>;

    /// CMS ids of every document published at the master ref.
    async fn fetch_published_ids(
        &self,
        cancel: &CancellationToken,
    ) -> Result<HashSet<String>, ClientError>;

    /// How many id chunks `fetch_by_ids` runs at once.
    fn max_concurrent_requests(&self) -> usize {
        4
    }

    async fn fetch_document_by_id(
        &self,
        id: &str,
        query: &QueryOptions,
        cancel: &CancellationToken,
    ) -> Result<RawDocument, ClientError> {
        let query = query.clone().with_predicate(id_predicate(id)).with_page_size(1);
        let page = self.fetch_page(&query, 1, cancel).await?;
        page.results
            .into_iter()
            .find(|doc| doc.id == id)
            .ok_or_else(|| ClientError::NotFound(format!("document '{id}'")))
    }

    /// Every page of `query`, in order.
    async fn fetch_all(
        &self,
        query: &QueryOptions,
        cancel: &CancellationToken,
    ) -> Result<Vec<RawDocument>, ClientError> {
        let mut documents = Vec::new();
        let mut page = 1;
        loop {
            let result = self.fetch_page(query, page, cancel).await?;
            let more = result.has_next();
            documents.extend(result.results);
            if !more {
                return Ok(documents);
            }
            page += 1;
        }
    }

    /// Documents by CMS id, in chunks of [`MAX_IDS_PER_QUERY`] fetched
    /// concurrently. Ids the CMS doesn't know are silently absent.
    async fn fetch_by_ids(
        &self,
        ids: &[String],
        query: &QueryOptions,
        cancel: &CancellationToken,
    ) -> Result<Vec<RawDocument>, ClientError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let queries: Vec<QueryOptions> = ids
            .chunks(MAX_IDS_PER_QUERY)
            .map(|chunk| {
                query
                    .clone()
                    .with_predicate(ids_predicate(chunk))
                    .with_page_size(MAX_IDS_PER_QUERY as u32)
            })
            .collect();
        let pages: Vec<Vec<RawDocument>> = stream::iter(queries)
            .map(|chunk_query| async move { self.fetch_all(&chunk_query, cancel).await })
            .buffered(self.max_concurrent_requests().max(1))
            .try_collect()
            .await?;
        Ok(pages.into_iter().flatten().collect())
    }
}

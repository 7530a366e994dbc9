//! `reqwest`-backed [`CmsClient`].
use std::collections::HashSet;
use std::time::Instant;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CACHE_CONTROL};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::api::{ApiInfo, QueryOptions, SearchPage};
use crate::cms::CmsClient;
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::retry::with_retry;

const PUBLISHED_IDS_QUERY: &str = "query PublishedIds($after: String) { \
_allDocuments(after: $after, first: 100) { \
pageInfo { hasNextPage endCursor } \
edges { node { _meta { id } } } } }";

/// CMS client over HTTP.
#[derive(Debug, Clone)]
pub struct HttpCmsClient {
    http: reqwest::Client,
    config: ClientConfig,
}

impl HttpCmsClient {
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        config.validate()?;
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_max_idle_per_host(32)
            .build()
            .map_err(|err| ClientError::InvalidConfig(format!("HTTP client: {err}")))?;
        Ok(Self { http, config })
    }

    /// Share an existing connection pool.
    pub fn with_http_client(config: ClientConfig, http: reqwest::Client) -> Result<Self, ClientError> {
        config.validate()?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn search_url(&self) -> String {
        format!("{}/documents/search", self.config.api_endpoint.trim_end_matches('/'))
    }

    async fn get_json<T>(
        &self,
        url: &str,
        params: &[(String, String)],
        headers: HeaderMap,
        cancel: &CancellationToken,
    ) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
    {
        with_retry(&self.config.retry, cancel, |attempt| {
            let mut request = self.http.get(url).query(params).headers(headers.clone());
            if let Some(token) = &self.config.access_token {
                request = request.bearer_auth(token);
            }
            async move {
                let start = Instant::now();
                let response = request.send().await?;
                let status = response.status();
                debug!(
                    url,
                    attempt,
                    status = status.as_u16(),
                    elapsed_micros = start.elapsed().as_micros() as u64,
                    "cms_request"
                );
                if !status.is_success() {
                    let body = response.text().await.unwrap_or_default();
                    return Err(ClientError::from_status(status.as_u16(), body));
                }
                response
                    .json::<T>()
                    .await
                    .map_err(|err| ClientError::Decode(err.to_string()))
            }
        })
        .await
    }
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<GraphQlData>,
    #[serde(default)]
    errors: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct GraphQlData {
    #[serde(rename = "_allDocuments")]
    all_documents: Connection,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Connection {
    page_info: PageInfo,
    edges: Vec<Edge>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageInfo {
    has_next_page: bool,
    end_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Edge {
    node: EdgeNode,
}

#[derive(Debug, Deserialize)]
struct EdgeNode {
    #[serde(rename = "_meta")]
    meta: Meta,
}

#[derive(Debug, Deserialize)]
struct Meta {
    id: String,
}

#[async_trait]
impl CmsClient for HttpCmsClient {
    async fn fetch_api(&self, cancel: &CancellationToken) -> Result<ApiInfo, ClientError> {
        self.get_json(&self.config.api_endpoint, &[], HeaderMap::new(), cancel)
            .await
    }

    async fn fetch_page(
        &self,
        query: &QueryOptions,
        page: u32,
        cancel: &CancellationToken,
    ) -> Result<SearchPage, ClientError> {
        let params = query.to_params(Some(page));
        self.get_json(&self.search_url(), &params, HeaderMap::new(), cancel)
            .await
    }

    async fn fetch_published_ids(
        &self,
        cancel: &CancellationToken,
    ) -> Result<HashSet<String>, ClientError> {
        let endpoint = self.config.graphql_endpoint.as_deref().ok_or_else(|| {
            ClientError::InvalidConfig("graphql_endpoint is required for release diffs".into())
        })?;
        let api = self.fetch_api(cancel).await?;
        let master = api
            .master_ref()
            .ok_or_else(|| ClientError::Decode("API root advertises no master ref".into()))?;
        let mut headers = HeaderMap::new();
        let master_ref = HeaderValue::from_str(&master.reference)
            .map_err(|err| ClientError::Decode(format!("master ref: {err}")))?;
        headers.insert("Prismic-Ref", master_ref);
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));

        let mut ids = HashSet::new();
        let mut cursor: Option<String> = None;
        loop {
            let params = vec![
                ("query".to_string(), PUBLISHED_IDS_QUERY.to_string()),
                ("variables".to_string(), json!({ "after": cursor }).to_string()),
            ];
            let response: GraphQlResponse =
                self.get_json(endpoint, &params, headers.clone(), cancel).await?;
            if !response.errors.is_empty() {
                warn!(errors = response.errors.len(), "graphql_errors");
            }
            let connection = response
                .data
                .ok_or_else(|| ClientError::Decode("GraphQL response has no data".into()))?
                .all_documents;
            ids.extend(connection.edges.into_iter().map(|edge| edge.node.meta.id));
            match connection.page_info {
                PageInfo {
                    has_next_page: true,
                    end_cursor: Some(next),
                } => cursor = Some(next),
                _ => return Ok(ids),
            }
        }
    }

    fn max_concurrent_requests(&self) -> usize {
        self.config.max_concurrent_requests
    }
}

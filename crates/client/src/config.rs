use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::ClientError;
use crate::retry::RetryConfig;

/// The search API caps page size and id lists at this many entries.
pub const MAX_IDS_PER_QUERY: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// REST API root, e.g. `https://blog.cdn.prismic.io/api/v2`.
    pub api_endpoint: String,
    #[serde(default)]
    pub graphql_endpoint: Option<String>,
    /// Sent as a bearer token on every request.
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(with = "crate::serde_millis", default = "default_timeout")]
    pub timeout: Duration,
    #[serde(with = "crate::serde_millis", default = "default_connect_timeout")]
    pub connect_timeout: Duration,
    #[serde(default)]
    pub retry: RetryConfig,
    /// Id chunks fetched at the same time by `fetch_by_ids`.
    #[serde(default = "default_concurrency")]
    pub max_concurrent_requests: usize,
}

fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_concurrency() -> usize {
    8
}

impl ClientConfig {
    pub fn new(api_endpoint: impl Into<String>) -> Self {
        Self {
            api_endpoint: api_endpoint.into(),
            graphql_endpoint: None,
            access_token: None,
            timeout: default_timeout(),
            connect_timeout: default_connect_timeout(),
            retry: RetryConfig::default(),
            max_concurrent_requests: default_concurrency(),
        }
    }

    pub fn with_graphql_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.graphql_endpoint = Some(endpoint.into());
        self
    }

    pub fn with_access_token(mut self, token: Option<String>) -> Self {
        self.access_token = token.filter(|t| !t.is_empty());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_max_concurrent_requests(mut self, max: usize) -> Self {
        self.max_concurrent_requests = max;
        self
    }

    pub fn validate(&self) -> Result<(), ClientError> {
        Url::parse(&self.api_endpoint).map_err(|err| {
            ClientError::InvalidConfig(format!("api_endpoint '{}': {err}", self.api_endpoint))
        })?;
        if let Some(endpoint) = &self.graphql_endpoint {
            Url::parse(endpoint).map_err(|err| {
                ClientError::InvalidConfig(format!("graphql_endpoint '{endpoint}': {err}"))
            })?;
        }
        if self.timeout.is_zero() {
            return Err(ClientError::InvalidConfig("timeout must be positive".into()));
        }
        if self.max_concurrent_requests == 0 {
            return Err(ClientError::InvalidConfig(
                "max_concurrent_requests must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_checks_endpoints() {
        assert!(ClientConfig::new("https://blog.cdn.prismic.io/api/v2").validate().is_ok());
        assert!(ClientConfig::new("blog").validate().is_err());
        assert!(ClientConfig::new("https://x.io/api")
            .with_graphql_endpoint("::")
            .validate()
            .is_err());
        assert!(ClientConfig::new("https://x.io/api")
            .with_max_concurrent_requests(0)
            .validate()
            .is_err());
    }

    #[test]
    fn empty_token_is_dropped() {
        let cfg = ClientConfig::new("https://x.io/api").with_access_token(Some(String::new()));
        assert!(cfg.access_token.is_none());
    }

    #[test]
    fn durations_deserialize_from_millis() {
        let cfg: ClientConfig = serde_json::from_str(
            r#"{"api_endpoint":"https://x.io/api","timeout":1500,"retry":{"max_retries":1}}"#,
        )
        .unwrap();
        assert_eq!(cfg.timeout, Duration::from_millis(1500));
        assert_eq!(cfg.retry.max_retries, 1);
        assert_eq!(cfg.retry.base_delay, Duration::from_millis(100));
    }
}

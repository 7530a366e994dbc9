use std::sync::Arc;
use std::time::Duration;

use client::{ClientConfig, ClientError, CmsClient, HttpCmsClient, RetryConfig};
use store::RepositoryOptions;

/// Builds the CMS client for one repository and access token.
///
/// Called once per bootstrap or resolve, so a token set in between takes
/// effect on the next run.
pub trait ClientFactory: Send + Sync {
    fn client(
        &self,
        options: &RepositoryOptions,
        access_token: Option<&str>,
    ) -> Result<Arc<dyn CmsClient>, ClientError>;
}

/// [`HttpCmsClient`]s sharing one connection pool.
#[derive(Debug, Clone)]
pub struct HttpClientFactory {
    http: reqwest::Client,
    retry: RetryConfig,
    timeout: Duration,
}

impl HttpClientFactory {
    pub fn new() -> Result<Self, ClientError> {
        let timeout = Duration::from_secs(30);
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(32)
            .build()
            .map_err(|err| ClientError::InvalidConfig(format!("HTTP client: {err}")))?;
        Ok(Self {
            http,
            retry: RetryConfig::default(),
            timeout,
        })
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn http_client(&self) -> &reqwest::Client {
        &self.http
    }

    pub fn client_config(
        &self,
        options: &RepositoryOptions,
        access_token: Option<&str>,
    ) -> ClientConfig {
        let repo = &options.config;
        ClientConfig::new(repo.api_endpoint())
            .with_graphql_endpoint(repo.graphql_endpoint())
            .with_access_token(access_token.map(str::to_owned))
            .with_timeout(self.timeout)
            .with_retry(self.retry)
    }
}

impl ClientFactory for HttpClientFactory {
    fn client(
        &self,
        options: &RepositoryOptions,
        access_token: Option<&str>,
    ) -> Result<Arc<dyn CmsClient>, ClientError> {
        let config = self.client_config(options, access_token);
        Ok(Arc::new(HttpCmsClient::with_http_client(
            config,
            self.http.clone(),
        )?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use normalize::Capabilities;
    use store::RepositoryConfig;

    #[test]
    fn config_follows_repository() {
        let factory = HttpClientFactory::new().unwrap();
        let options =
            RepositoryOptions::new(RepositoryConfig::new("blog"), Capabilities::default()).unwrap();
        let cfg = factory.client_config(&options, Some("tok"));
        assert_eq!(cfg.api_endpoint, "https://blog.cdn.prismic.io/api/v2");
        assert_eq!(cfg.graphql_endpoint.as_deref(), Some("https://blog.prismic.io/graphql"));
        assert_eq!(cfg.access_token.as_deref(), Some("tok"));
        assert!(factory.client(&options, None).is_ok());
    }
}

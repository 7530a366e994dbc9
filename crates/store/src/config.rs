//! Per-repository configuration.
//!
//! [`RepositoryConfig`] is the serializable part, loaded from YAML by the
//! umbrella crate. [`RepositoryOptions`] adds the runtime capabilities and
//! derived values. [`RepositoryRegistry`] is built once at startup and handed
//! to whoever needs it; it is never mutated afterwards.
use std::collections::HashMap;
use std::sync::Arc;

use identity::NodeIdentity;
use normalize::{Capabilities, ImageParams, NormalizeConfig};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::StoreError;

/// Largest page size the CMS search API accepts.
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryConfig {
    /// Repository name, the first label of the CMS host.
    pub name: String,
    /// REST API root. Defaults to `https://{name}.cdn.prismic.io/api/v2`.
    #[serde(default)]
    pub api_endpoint: Option<String>,
    /// GraphQL endpoint used for release diffs.
    #[serde(default)]
    pub graphql_endpoint: Option<String>,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default = "default_lang")]
    pub lang: String,
    #[serde(default)]
    pub fetch_links: Vec<String>,
    /// Extra `q` predicates applied to full-repository fetches.
    #[serde(default)]
    pub predicates: Vec<String>,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// Preview this release instead of detecting one from the preview ref.
    #[serde(default)]
    pub release_id: Option<String>,
    #[serde(default)]
    pub type_prefix: Option<String>,
    #[serde(default = "default_max_link_depth")]
    pub max_link_depth: u32,
    /// URL or file path of the type-path manifest pointer.
    #[serde(default)]
    pub type_paths_manifest: Option<String>,
    #[serde(default)]
    pub image_params: Option<ImageParams>,
    #[serde(default)]
    pub placeholder_params: Option<ImageParams>,
    #[serde(default = "default_true")]
    pub prompt_for_access_token: bool,
}

fn default_lang() -> String {
    "*".to_string()
}

fn default_page_size() -> u32 {
    MAX_PAGE_SIZE
}

fn default_max_link_depth() -> u32 {
    3
}

fn default_true() -> bool {
    true
}

impl RepositoryConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            api_endpoint: None,
            graphql_endpoint: None,
            access_token: None,
            lang: default_lang(),
            fetch_links: Vec::new(),
            predicates: Vec::new(),
            page_size: default_page_size(),
            release_id: None,
            type_prefix: None,
            max_link_depth: default_max_link_depth(),
            type_paths_manifest: None,
            image_params: None,
            placeholder_params: None,
            prompt_for_access_token: true,
        }
    }

    pub fn with_api_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.api_endpoint = Some(endpoint.into());
        self
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_max_link_depth(mut self, depth: u32) -> Self {
        self.max_link_depth = depth;
        self
    }

    pub fn with_type_paths_manifest(mut self, location: impl Into<String>) -> Self {
        self.type_paths_manifest = Some(location.into());
        self
    }

    pub fn api_endpoint(&self) -> String {
        self.api_endpoint
            .clone()
            .unwrap_or_else(|| format!("https://{}.cdn.prismic.io/api/v2", self.name))
    }

    pub fn graphql_endpoint(&self) -> String {
        self.graphql_endpoint
            .clone()
            .unwrap_or_else(|| format!("https://{}.prismic.io/graphql", self.name))
    }

    /// Manifest pointer location, defaulting to `/{name}.json` under the site.
    pub fn type_paths_manifest(&self) -> String {
        self.type_paths_manifest
            .clone()
            .unwrap_or_else(|| format!("{}.json", self.name))
    }

    pub fn normalize_config(&self) -> NormalizeConfig {
        let mut cfg = NormalizeConfig::default();
        cfg.type_prefix = self.type_prefix.clone();
        if let Some(params) = &self.image_params {
            cfg.image_params = params.clone();
        }
        if let Some(params) = &self.placeholder_params {
            cfg.placeholder_params = params.clone();
        }
        cfg
    }

    pub fn validate(&self) -> Result<(), StoreError> {
        let valid_name = !self.name.is_empty()
            && self
                .name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-');
        if !valid_name {
            return Err(StoreError::InvalidConfig(format!(
                "repository name '{}' must be a non-empty host label",
                self.name
            )));
        }
        for (label, endpoint) in [
            ("api_endpoint", self.api_endpoint.as_deref()),
            ("graphql_endpoint", self.graphql_endpoint.as_deref()),
        ] {
            if let Some(endpoint) = endpoint {
                Url::parse(endpoint).map_err(|err| {
                    StoreError::InvalidConfig(format!("{label} '{endpoint}': {err}"))
                })?;
            }
        }
        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(StoreError::InvalidConfig(format!(
                "page_size must be between 1 and {MAX_PAGE_SIZE}, got {}",
                self.page_size
            )));
        }
        self.normalize_config()
            .validate()
            .map_err(|err| StoreError::InvalidConfig(err.to_string()))
    }
}

/// Everything one repository needs at runtime.
#[derive(Debug, Clone)]
pub struct RepositoryOptions {
    pub config: RepositoryConfig,
    pub normalize: NormalizeConfig,
    pub capabilities: Capabilities,
    pub identity: NodeIdentity,
}

impl RepositoryOptions {
    pub fn new(config: RepositoryConfig, capabilities: Capabilities) -> Result<Self, StoreError> {
        config.validate()?;
        let identity = NodeIdentity::for_repository(&config.name, config.type_prefix.as_deref())?;
        Ok(Self {
            normalize: config.normalize_config(),
            config,
            capabilities,
            identity,
        })
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }
}

/// Repository-name-keyed options, immutable once built.
#[derive(Debug, Clone, Default)]
pub struct RepositoryRegistry {
    repositories: HashMap<String, Arc<RepositoryOptions>>,
}

impl RepositoryRegistry {
    pub fn new<I>(options: I) -> Result<Self, StoreError>
    where
        I: IntoIterator<Item = RepositoryOptions>,
    {
        let mut repositories = HashMap::new();
        for opts in options {
            let name = opts.name().to_owned();
            if repositories.insert(name.clone(), Arc::new(opts)).is_some() {
                return Err(StoreError::DuplicateRepository(name));
            }
        }
        Ok(Self { repositories })
    }

    pub fn get(&self, name: &str) -> Option<Arc<RepositoryOptions>> {
        self.repositories.get(name).cloned()
    }

    pub fn require(&self, name: &str) -> Result<Arc<RepositoryOptions>, StoreError> {
        self.get(name)
            .ok_or_else(|| StoreError::UnknownRepository(name.to_owned()))
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.repositories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.repositories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.repositories.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_repository_name() {
        let cfg: RepositoryConfig = serde_json::from_str(r#"{"name": "blog"}"#).unwrap();
        assert_eq!(cfg.api_endpoint(), "https://blog.cdn.prismic.io/api/v2");
        assert_eq!(cfg.graphql_endpoint(), "https://blog.prismic.io/graphql");
        assert_eq!(cfg.page_size, 100);
        assert_eq!(cfg.max_link_depth, 3);
        assert!(cfg.prompt_for_access_token);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn invalid_configs_are_rejected() {
        assert!(RepositoryConfig::new("").validate().is_err());
        assert!(RepositoryConfig::new("my.repo").validate().is_err());
        assert!(RepositoryConfig::new("blog").with_page_size(0).validate().is_err());
        assert!(RepositoryConfig::new("blog").with_page_size(101).validate().is_err());
        assert!(RepositoryConfig::new("blog")
            .with_api_endpoint("not a url")
            .validate()
            .is_err());
    }

    #[test]
    fn registry_rejects_duplicates() {
        let a = RepositoryOptions::new(RepositoryConfig::new("blog"), Capabilities::default()).unwrap();
        let b = a.clone();
        assert_eq!(
            RepositoryRegistry::new([a, b]).unwrap_err(),
            StoreError::DuplicateRepository("blog".into())
        );
    }

    #[test]
    fn registry_lookup() {
        let a = RepositoryOptions::new(RepositoryConfig::new("blog"), Capabilities::default()).unwrap();
        let registry = RepositoryRegistry::new([a]).unwrap();
        assert!(registry.get("blog").is_some());
        assert_eq!(
            registry.require("shop").unwrap_err(),
            StoreError::UnknownRepository("shop".into())
        );
        assert_eq!(registry.names(), vec!["blog"]);
    }
}

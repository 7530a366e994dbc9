//! YAML configuration for every previewed repository.
//!
//! One file describes all repositories a site previews, where the type-path
//! manifests live, and how preview snapshots are rendered.
//!
//! ```yaml
//! version: "1.0"
//! name: "marketing site"
//!
//! repositories:
//!   - name: blog
//!     access_token: "MC5..."
//!     lang: "*"
//!     fetch_links: ["author.name"]
//!     max_link_depth: 3
//!     schemas_dir: "prismic/blog"
//!     routes:
//!       page: "/:uid"
//!       post: "/blog/:uid"
//!
//! manifests:
//!   dir: "public"
//!   prefix: ""
//!
//! snapshot:
//!   identity_field: "_previewable"
//!   link_depth: 2
//! ```
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use client::ClientError;
use normalize::Capabilities;
use serde::{Deserialize, Serialize};
use store::{RepositoryConfig, RepositoryOptions, RepositoryRegistry, SnapshotOptions, StoreError};
use thiserror::Error;
use typepath::TypePathError;

use crate::routes::RouteLinkResolver;

/// Errors that can occur when loading YAML configuration files
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("unsupported config version: {0}")]
    UnsupportedVersion(String),

    #[error("missing required field: {0}")]
    MissingField(String),

    #[error("repository: {0}")]
    Repository(#[from] StoreError),

    #[error("client: {0}")]
    Client(#[from] ClientError),

    #[error("type paths: {0}")]
    TypePaths(#[from] TypePathError),

    #[error("schema file {}: {message}", path.display())]
    Schema { path: PathBuf, message: String },
}

/// Top-level configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LivePreviewConfig {
    /// Configuration format version
    pub version: String,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub repositories: Vec<RepositoryYamlConfig>,

    #[serde(default)]
    pub manifests: ManifestYamlConfig,

    #[serde(default)]
    pub snapshot: SnapshotOptions,
}

/// One repository: its [`RepositoryConfig`] plus what only configuration
/// can supply, route templates and the schema directory for manifest builds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryYamlConfig {
    #[serde(flatten)]
    pub repository: RepositoryConfig,

    #[serde(default)]
    pub routes: BTreeMap<String, String>,

    /// Template for types without a route of their own.
    #[serde(default)]
    pub fallback_route: Option<String>,

    /// Directory with `custom_types/*.json` and `shared_slices/*.json`.
    #[serde(default)]
    pub schemas_dir: Option<PathBuf>,
}

/// Where manifests are written at build time and read at preview time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestYamlConfig {
    /// Read manifests from this directory.
    #[serde(default)]
    pub dir: Option<PathBuf>,

    /// Otherwise fetch them relative to this URL.
    #[serde(default)]
    pub base_url: Option<String>,

    /// File name prefix of pointers and manifests.
    #[serde(default)]
    pub prefix: String,
}

impl LivePreviewConfig {
    /// Load a YAML configuration file from the given path
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse YAML configuration from a string
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigLoadError> {
        let config: LivePreviewConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        match self.version.as_str() {
            "1.0" | "1" => Ok(()),
            v => Err(ConfigLoadError::UnsupportedVersion(v.to_string())),
        }?;

        if self.repositories.is_empty() {
            return Err(ConfigLoadError::MissingField("repositories".into()));
        }
        let mut names = HashSet::new();
        for repo in &self.repositories {
            repo.validate()?;
            if !names.insert(repo.repository.name.as_str()) {
                return Err(ConfigLoadError::Validation(format!(
                    "repository '{}' is configured twice",
                    repo.repository.name
                )));
            }
        }
        if let Some(base_url) = &self.manifests.base_url {
            url::Url::parse(base_url).map_err(|err| {
                ConfigLoadError::Validation(format!("manifests.base_url '{base_url}': {err}"))
            })?;
        }
        self.snapshot.validate()?;
        Ok(())
    }

    pub fn repository(&self, name: &str) -> Option<&RepositoryYamlConfig> {
        self.repositories
            .iter()
            .find(|repo| repo.repository.name == name)
    }

    /// Runtime options for every repository, with route templates as the
    /// link resolver.
    pub fn repository_options(&self) -> Result<Vec<RepositoryOptions>, ConfigLoadError> {
        self.repositories
            .iter()
            .map(|repo| {
                let capabilities = Capabilities::new(repo.link_resolver());
                Ok(RepositoryOptions::new(repo.repository.clone(), capabilities)?)
            })
            .collect()
    }

    pub fn registry(&self) -> Result<RepositoryRegistry, ConfigLoadError> {
        Ok(RepositoryRegistry::new(self.repository_options()?)?)
    }
}

impl Default for LivePreviewConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            name: None,
            repositories: Vec::new(),
            manifests: ManifestYamlConfig::default(),
            snapshot: SnapshotOptions::default(),
        }
    }
}

impl RepositoryYamlConfig {
    pub fn new(repository: RepositoryConfig) -> Self {
        Self {
            repository,
            routes: BTreeMap::new(),
            fallback_route: None,
            schemas_dir: None,
        }
    }

    pub fn with_route(mut self, doc_type: impl Into<String>, template: impl Into<String>) -> Self {
        self.routes.insert(doc_type.into(), template.into());
        self
    }

    pub fn link_resolver(&self) -> RouteLinkResolver {
        let resolver = RouteLinkResolver::new(self.routes.clone());
        match &self.fallback_route {
            Some(template) => resolver.with_fallback(template.clone()),
            None => resolver,
        }
    }

    fn validate(&self) -> Result<(), ConfigLoadError> {
        self.repository.validate()?;
        self.link_resolver().validate().map_err(|msg| {
            ConfigLoadError::Validation(format!("repository '{}': {msg}", self.repository.name))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::LinkTarget;
    use normalize::LinkResolver;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const YAML: &str = r#"
version: "1.0"
name: "site"
repositories:
  - name: blog
    access_token: "secret"
    page_size: 50
    max_link_depth: 2
    fetch_links: ["author.name"]
    routes:
      page: "/:uid"
  - name: shop
manifests:
  dir: "public"
snapshot:
  link_depth: 1
"#;

    #[test]
    fn test_load_valid_yaml() {
        let config = LivePreviewConfig::from_yaml(YAML).unwrap();
        assert_eq!(config.name.as_deref(), Some("site"));
        assert_eq!(config.repositories.len(), 2);

        let blog = config.repository("blog").unwrap();
        assert_eq!(blog.repository.page_size, 50);
        assert_eq!(blog.repository.max_link_depth, 2);
        assert_eq!(blog.repository.access_token.as_deref(), Some("secret"));
        assert_eq!(blog.repository.fetch_links, vec!["author.name".to_string()]);

        let shop = config.repository("shop").unwrap();
        assert_eq!(shop.repository.page_size, 100);
        assert_eq!(shop.repository.lang, "*");
        assert_eq!(config.manifests.dir.as_deref(), Some(Path::new("public")));
        assert_eq!(config.snapshot.link_depth, 1);
    }

    #[test]
    fn test_load_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(YAML.as_bytes()).unwrap();
        let config = LivePreviewConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.version, "1.0");
    }

    #[test]
    fn test_registry_uses_routes() {
        let config = LivePreviewConfig::from_yaml(YAML).unwrap();
        let registry = config.registry().unwrap();
        assert_eq!(registry.names(), vec!["blog", "shop"]);
        let blog = registry.get("blog").unwrap();
        let target = LinkTarget {
            id: "X".into(),
            uid: Some("about".into()),
            doc_type: "page".into(),
            lang: "en-us".into(),
            tags: Vec::new(),
            slug: None,
            is_broken: false,
        };
        assert_eq!(
            blog.capabilities.link_resolver.resolve(&target).as_deref(),
            Some("/about")
        );
    }

    #[test]
    fn test_validation_errors() {
        let err = LivePreviewConfig::from_yaml("version: \"2.0\"\nrepositories: [{name: blog}]")
            .unwrap_err();
        assert!(matches!(err, ConfigLoadError::UnsupportedVersion(_)));

        let err = LivePreviewConfig::from_yaml("version: \"1.0\"").unwrap_err();
        assert!(matches!(err, ConfigLoadError::MissingField(_)));

        let err = LivePreviewConfig::from_yaml(
            "version: \"1.0\"\nrepositories: [{name: blog}, {name: blog}]",
        )
        .unwrap_err();
        assert!(err.to_string().contains("twice"));

        let err = LivePreviewConfig::from_yaml(
            "version: \"1.0\"\nrepositories: [{name: blog, page_size: 500}]",
        )
        .unwrap_err();
        assert!(err.to_string().contains("page_size"));

        let err = LivePreviewConfig::from_yaml(
            "version: \"1.0\"\nrepositories: [{name: blog, routes: {page: \"/:title\"}}]",
        )
        .unwrap_err();
        assert!(err.to_string().contains(":title"));
    }
}

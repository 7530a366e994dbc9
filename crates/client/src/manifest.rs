//! Where the browser-side bootstrap gets its type-path manifest from.
//!
//! The build writes a content-hashed manifest plus a stable pointer file
//! naming it. Sources read the pointer first, then the file it names, and
//! check that both agree.
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CACHE_CONTROL, PRAGMA};
use tokio_util::sync::CancellationToken;
use tracing::debug;
use typepath::{ManifestPointer, TypePathManifest};
use url::Url;

use crate::error::ClientError;
use crate::retry::{with_retry, RetryConfig};

#[async_trait]
pub trait ManifestSource: Send + Sync {
    /// Load the manifest for `repository`. `location` names the pointer file;
    /// how it is interpreted is up to the source.
    async fn load(
        &self,
        repository: &str,
        location: &str,
        cancel: &CancellationToken,
    ) -> Result<TypePathManifest, ClientError>;
}

/// Fetches manifests over HTTP with caching disabled.
#[derive(Debug, Clone)]
pub struct HttpManifestSource {
    http: reqwest::Client,
    base_url: Option<Url>,
    retry: RetryConfig,
}

impl HttpManifestSource {
    pub fn new(http: reqwest::Client) -> Self {
        Self {
            http,
            base_url: None,
            retry: RetryConfig::default(),
        }
    }

    /// Resolve relative pointer locations against `base_url`.
    pub fn with_base_url(mut self, base_url: &str) -> Result<Self, ClientError> {
        let url = Url::parse(base_url)
            .map_err(|err| ClientError::InvalidConfig(format!("base_url '{base_url}': {err}")))?;
        self.base_url = Some(url);
        Ok(self)
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    fn resolve(&self, location: &str) -> Result<Url, ClientError> {
        match Url::parse(location) {
            Ok(url) => Ok(url),
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                let base = self.base_url.as_ref().ok_or_else(|| {
                    ClientError::InvalidConfig(format!(
                        "relative manifest location '{location}' needs a base_url"
                    ))
                })?;
                base.join(location)
                    .map_err(|err| ClientError::InvalidConfig(format!("'{location}': {err}")))
            }
            Err(err) => Err(ClientError::InvalidConfig(format!("'{location}': {err}"))),
        }
    }

    async fn get_bytes(&self, url: &Url, cancel: &CancellationToken) -> Result<Vec<u8>, ClientError> {
        let mut headers = HeaderMap::new();
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
        with_retry(&self.retry, cancel, |_| {
            let request = self.http.get(url.clone()).headers(headers.clone());
            async move {
                let response = request.send().await?;
                let status = response.status();
                if !status.is_success() {
                    return Err(ClientError::from_status(
                        status.as_u16(),
                        format!("manifest {url}"),
                    ));
                }
                Ok(response.bytes().await?.to_vec())
            }
        })
        .await
    }
}

#[async_trait]
impl ManifestSource for HttpManifestSource {
    async fn load(
        &self,
        repository: &str,
        location: &str,
        cancel: &CancellationToken,
    ) -> Result<TypePathManifest, ClientError> {
        let pointer_url = self.resolve(location)?;
        let pointer: ManifestPointer = serde_json::from_slice(&self.get_bytes(&pointer_url, cancel).await?)
            .map_err(|err| ClientError::Decode(format!("manifest pointer: {err}")))?;
        let manifest_url = pointer_url
            .join(&pointer.file)
            .map_err(|err| ClientError::Decode(format!("manifest file '{}': {err}", pointer.file)))?;
        debug!(repository, manifest = %manifest_url, "manifest_fetch");
        let manifest = TypePathManifest::from_slice(&self.get_bytes(&manifest_url, cancel).await?)?;
        manifest.validate_for(repository, Some(&pointer))?;
        Ok(manifest)
    }
}

/// Reads manifests from a directory, e.g. the site's public output.
#[derive(Debug, Clone)]
pub struct FileManifestSource {
    dir: PathBuf,
}

impl FileManifestSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl ManifestSource for FileManifestSource {
    async fn load(
        &self,
        repository: &str,
        location: &str,
        cancel: &CancellationToken,
    ) -> Result<TypePathManifest, ClientError> {
        if cancel.is_cancelled() {
            return Err(ClientError::Aborted);
        }
        let pointer_path = self.dir.join(location.trim_start_matches('/'));
        let pointer_bytes = tokio::fs::read(&pointer_path).await.map_err(|err| {
            ClientError::NotFound(format!("{}: {err}", pointer_path.display()))
        })?;
        let pointer: ManifestPointer = serde_json::from_slice(&pointer_bytes)
            .map_err(|err| ClientError::Decode(format!("manifest pointer: {err}")))?;
        let manifest_path = pointer_path
            .parent()
            .unwrap_or(&self.dir)
            .join(&pointer.file);
        let bytes = tokio::fs::read(&manifest_path).await.map_err(|err| {
            ClientError::NotFound(format!("{}: {err}", manifest_path.display()))
        })?;
        let manifest = TypePathManifest::from_slice(&bytes)?;
        manifest.validate_for(repository, Some(&pointer))?;
        Ok(manifest)
    }
}

/// Manifests held in memory, keyed by repository. `location` is ignored.
#[derive(Debug, Default)]
pub struct StaticManifestSource {
    manifests: RwLock<HashMap<String, TypePathManifest>>,
}

impl StaticManifestSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, manifest: TypePathManifest) {
        let mut manifests = self
            .manifests
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        manifests.insert(manifest.repository.clone(), manifest);
    }
}

#[async_trait]
impl ManifestSource for StaticManifestSource {
    async fn load(
        &self,
        repository: &str,
        _location: &str,
        cancel: &CancellationToken,
    ) -> Result<TypePathManifest, ClientError> {
        if cancel.is_cancelled() {
            return Err(ClientError::Aborted);
        }
        let manifest = self
            .manifests
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(repository)
            .cloned()
            .ok_or_else(|| ClientError::NotFound(format!("manifest for '{repository}'")))?;
        manifest.validate_for(repository, None)?;
        Ok(manifest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_locations_need_a_base() {
        let source = HttpManifestSource::new(reqwest::Client::new());
        assert!(matches!(
            source.resolve("blog.json"),
            Err(ClientError::InvalidConfig(_))
        ));
        let source = source.with_base_url("https://site.example/static/").unwrap();
        assert_eq!(
            source.resolve("blog.json").unwrap().as_str(),
            "https://site.example/static/blog.json"
        );
        assert_eq!(
            source.resolve("https://cdn.example/m.json").unwrap().as_str(),
            "https://cdn.example/m.json"
        );
    }
}

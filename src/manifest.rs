//! Build-time manifest writer.
//!
//! Reads each repository's content models from its `schemas_dir`:
//!
//! ```text
//! {schemas_dir}/custom_types/*.json    one CustomTypeModel (or an array) per file
//! {schemas_dir}/shared_slices/*.json   one SharedSliceModel (or an array) per file
//! ```
//!
//! and writes the content-hashed type-path manifest plus its pointer into the
//! output directory, where [`client::FileManifestSource`] or
//! [`client::HttpManifestSource`] pick them up at preview time.
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use model::{CustomTypeModel, SharedSliceModel};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::info;
use typepath::{ManifestFiles, TypePathManifest};

use crate::config::{ConfigLoadError, LivePreviewConfig, RepositoryYamlConfig};

/// Every model in the `*.json` files of `dir`, in file name order. A missing
/// directory holds no models.
pub fn read_models<T: DeserializeOwned>(dir: &Path) -> Result<Vec<T>, ConfigLoadError> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|entry| entry.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .collect();
    files.sort();

    let mut models = Vec::new();
    for path in files {
        let schema_error = |message: String| ConfigLoadError::Schema {
            path: path.clone(),
            message,
        };
        let value: Value = serde_json::from_slice(&fs::read(&path)?)
            .map_err(|err| schema_error(err.to_string()))?;
        let values = match value {
            Value::Array(values) => values,
            other => vec![other],
        };
        for value in values {
            models.push(serde_json::from_value(value).map_err(|err| schema_error(err.to_string()))?);
        }
    }
    Ok(models)
}

/// Build the manifest of one repository from its schema directory.
pub fn build_manifest(repo: &RepositoryYamlConfig) -> Result<TypePathManifest, ConfigLoadError> {
    let name = &repo.repository.name;
    let schemas = repo.schemas_dir.as_ref().ok_or_else(|| {
        ConfigLoadError::MissingField(format!("repositories[{name}].schemas_dir"))
    })?;
    let custom_types: Vec<CustomTypeModel> = read_models(&schemas.join("custom_types"))?;
    let shared_slices: Vec<SharedSliceModel> = read_models(&schemas.join("shared_slices"))?;
    if custom_types.is_empty() {
        return Err(ConfigLoadError::Validation(format!(
            "no custom types found for '{name}' under {}",
            schemas.display()
        )));
    }
    Ok(TypePathManifest::build(name, custom_types, shared_slices)?)
}

/// Write the manifests of every repository into `out_dir`.
pub fn write_manifests(
    config: &LivePreviewConfig,
    out_dir: &Path,
) -> Result<Vec<ManifestFiles>, ConfigLoadError> {
    let start = Instant::now();
    let mut written = Vec::with_capacity(config.repositories.len());
    for repo in &config.repositories {
        let manifest = build_manifest(repo)?;
        written.push(manifest.write_to_dir(out_dir, &config.manifests.prefix)?);
    }
    info!(
        repositories = written.len(),
        out_dir = %out_dir.display(),
        elapsed_micros = start.elapsed().as_micros(),
        "manifests_success"
    );
    Ok(written)
}

//! Persisted type-path manifests.
//!
//! At build time each repository's registry is serialized together with the
//! schema models it was derived from. The file name embeds the first 16 hex
//! characters of the schema digest so it can be served with long cache
//! lifetimes; a small pointer file under a stable name says which hashed file
//! is current.
//!
//! ```text
//! public/
//! ├── prismic-blog.json                    ManifestPointer
//! └── prismic-blog-3f9a0c51d2e4b7a8.json   TypePathManifest
//! ```
use std::fs;
use std::path::{Path, PathBuf};

use model::{CustomTypeModel, SharedSliceModel, TypePath};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use crate::error::TypePathError;
use crate::registry::TypePathRegistry;

/// Current manifest format version.
pub const MANIFEST_VERSION: u32 = 1;

const DIGEST_PREFIX_LEN: usize = 16;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypePathManifest {
    pub version: u32,
    pub repository: String,
    pub schema_digest: String,
    pub type_paths: Vec<TypePath>,
    #[serde(default)]
    pub custom_types: Vec<CustomTypeModel>,
    #[serde(default)]
    pub shared_slices: Vec<SharedSliceModel>,
}

/// Stable-named file pointing at the current hashed manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestPointer {
    pub version: u32,
    pub repository: String,
    pub schema_digest: String,
    pub file: String,
}

/// Paths written by [`TypePathManifest::write_to_dir`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestFiles {
    pub manifest: PathBuf,
    pub pointer: PathBuf,
}

/// Digest over the schema models a manifest was built from.
pub fn schema_digest(custom_types: &[CustomTypeModel], shared_slices: &[SharedSliceModel]) -> String {
    identity::content_digest(&json!({
        "custom_types": custom_types,
        "shared_slices": shared_slices,
    }))
}

/// `{prefix}{repository}.json`
pub fn pointer_file_name(prefix: &str, repository: &str) -> String {
    format!("{prefix}{repository}.json")
}

impl TypePathManifest {
    pub fn build(
        repository: &str,
        custom_types: Vec<CustomTypeModel>,
        shared_slices: Vec<SharedSliceModel>,
    ) -> Result<Self, TypePathError> {
        let registry = TypePathRegistry::build(&custom_types, &shared_slices)?;
        Ok(Self {
            version: MANIFEST_VERSION,
            repository: repository.to_owned(),
            schema_digest: schema_digest(&custom_types, &shared_slices),
            type_paths: registry.type_paths().to_vec(),
            custom_types,
            shared_slices,
        })
    }

    pub fn registry(&self) -> Result<TypePathRegistry, TypePathError> {
        TypePathRegistry::from_type_paths(self.type_paths.clone())
    }

    /// `{prefix}{repository}-{digest16}.json`
    pub fn file_name(&self, prefix: &str) -> String {
        let short = self
            .schema_digest
            .get(..DIGEST_PREFIX_LEN)
            .unwrap_or(&self.schema_digest);
        format!("{prefix}{}-{short}.json", self.repository)
    }

    pub fn pointer(&self, prefix: &str) -> ManifestPointer {
        ManifestPointer {
            version: self.version,
            repository: self.repository.clone(),
            schema_digest: self.schema_digest.clone(),
            file: self.file_name(prefix),
        }
    }

    pub fn to_json(&self) -> Result<String, TypePathError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode and check the format version.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, TypePathError> {
        let manifest: Self = serde_json::from_slice(bytes)?;
        manifest.check_version()?;
        Ok(manifest)
    }

    pub fn check_version(&self) -> Result<(), TypePathError> {
        if self.version != MANIFEST_VERSION {
            return Err(TypePathError::UnsupportedVersion {
                found: self.version,
                expected: MANIFEST_VERSION,
            });
        }
        Ok(())
    }

    /// Check that the manifest belongs to `repository` and, if a pointer was
    /// followed to get here, that it is the file the pointer named.
    pub fn validate_for(
        &self,
        repository: &str,
        pointer: Option<&ManifestPointer>,
    ) -> Result<(), TypePathError> {
        self.check_version()?;
        if self.repository != repository {
            return Err(TypePathError::RepositoryMismatch {
                expected: repository.to_owned(),
                found: self.repository.clone(),
            });
        }
        if let Some(pointer) = pointer {
            if pointer.schema_digest != self.schema_digest {
                return Err(TypePathError::DigestMismatch(format!(
                    "pointer names {}, manifest carries {}",
                    pointer.schema_digest, self.schema_digest
                )));
            }
        }
        Ok(())
    }

    /// Write the hashed manifest and its pointer into `dir`.
    pub fn write_to_dir(&self, dir: &Path, prefix: &str) -> Result<ManifestFiles, TypePathError> {
        fs::create_dir_all(dir)?;
        let manifest_path = dir.join(self.file_name(prefix));
        fs::write(&manifest_path, self.to_json()?)?;

        let pointer_path = dir.join(pointer_file_name(prefix, &self.repository));
        fs::write(&pointer_path, serde_json::to_vec(&self.pointer(prefix))?)?;

        info!(
            repository = %self.repository,
            type_paths = self.type_paths.len(),
            manifest = %manifest_path.display(),
            "manifest_written"
        );
        Ok(ManifestFiles {
            manifest: manifest_path,
            pointer: pointer_path,
        })
    }

    /// Follow the pointer for `repository` in `dir` and load the manifest.
    pub fn read_from_dir(dir: &Path, prefix: &str, repository: &str) -> Result<Self, TypePathError> {
        let pointer_bytes = fs::read(dir.join(pointer_file_name(prefix, repository)))?;
        let pointer: ManifestPointer = serde_json::from_slice(&pointer_bytes)?;
        let manifest = Self::from_slice(&fs::read(dir.join(&pointer.file))?)?;
        manifest.validate_for(repository, Some(&pointer))?;
        Ok(manifest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn models() -> (Vec<CustomTypeModel>, Vec<SharedSliceModel>) {
        let page: CustomTypeModel = serde_json::from_value(json!({
            "id": "page",
            "json": {"Main": {"title": {"type": "StructuredText"}}}
        }))
        .unwrap();
        (vec![page], vec![])
    }

    #[test]
    fn file_name_embeds_digest_prefix() {
        let (types, slices) = models();
        let manifest = TypePathManifest::build("blog", types, slices).unwrap();
        let name = manifest.file_name("prismic-");
        assert!(name.starts_with("prismic-blog-"));
        assert_eq!(name.len(), "prismic-blog-".len() + 16 + ".json".len());
        assert_eq!(pointer_file_name("prismic-", "blog"), "prismic-blog.json");
    }

    #[test]
    fn digest_follows_schema_changes() {
        let (types, slices) = models();
        let a = TypePathManifest::build("blog", types.clone(), slices.clone()).unwrap();
        let b = TypePathManifest::build("blog", types, slices).unwrap();
        assert_eq!(a.schema_digest, b.schema_digest);

        let other: CustomTypeModel = serde_json::from_value(json!({
            "id": "post",
            "json": {"Main": {"body": {"type": "Text"}}}
        }))
        .unwrap();
        let c = TypePathManifest::build("blog", vec![other], vec![]).unwrap();
        assert_ne!(a.schema_digest, c.schema_digest);
    }

    #[test]
    fn wrong_version_is_rejected() {
        let (types, slices) = models();
        let mut manifest = TypePathManifest::build("blog", types, slices).unwrap();
        manifest.version = 99;
        let bytes = manifest.to_json().unwrap();
        assert_eq!(
            TypePathManifest::from_slice(bytes.as_bytes()),
            Err(TypePathError::UnsupportedVersion {
                found: 99,
                expected: MANIFEST_VERSION
            })
        );
    }

    #[test]
    fn repository_mismatch_is_rejected() {
        let (types, slices) = models();
        let manifest = TypePathManifest::build("blog", types, slices).unwrap();
        assert!(matches!(
            manifest.validate_for("shop", None),
            Err(TypePathError::RepositoryMismatch { .. })
        ));
    }
}

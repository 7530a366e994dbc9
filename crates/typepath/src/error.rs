use thiserror::Error;

/// Errors raised while building, persisting or loading a type-path registry.
///
/// A path that is simply absent from a registry is not an error; lookups
/// return `None` and the normalizer passes the value through.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TypePathError {
    #[error("duplicate type path: {0}")]
    DuplicatePath(String),
    #[error("type path must have at least one segment")]
    EmptyPath,
    #[error("unsupported manifest version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },
    #[error("manifest is for repository '{found}', expected '{expected}'")]
    RepositoryMismatch { expected: String, found: String },
    #[error("manifest schema digest mismatch: {0}")]
    DigestMismatch(String),
    #[error("manifest i/o error: {0}")]
    Io(String),
    #[error("manifest decode error: {0}")]
    Decode(String),
}

impl From<std::io::Error> for TypePathError {
    fn from(err: std::io::Error) -> Self {
        TypePathError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for TypePathError {
    fn from(err: serde_json::Error) -> Self {
        TypePathError::Decode(err.to_string())
    }
}

use identity::IdentityError;
use thiserror::Error;

/// Errors raised by the store and the repository registry.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum StoreError {
    #[error("store lock poisoned")]
    Poisoned,
    #[error("repository '{0}' is not configured")]
    UnknownRepository(String),
    #[error("repository '{0}' is configured twice")]
    DuplicateRepository(String),
    #[error("invalid repository configuration: {0}")]
    InvalidConfig(String),
    #[error("bootstrap already running for repository '{0}'")]
    BootstrapInProgress(String),
    #[error("repository '{repository}' already bootstrapped for ref '{preview_ref}'")]
    AlreadyBootstrapped {
        repository: String,
        preview_ref: String,
    },
    #[error(transparent)]
    Identity(#[from] IdentityError),
}

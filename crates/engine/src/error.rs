//! Failure causes carried by the bootstrap and resolver state machines.
//!
//! Nothing in the engine panics or propagates past a state machine. Every
//! failure ends up as `FAILED(cause)`, and [`PreviewError::kind`] tells the UI
//! what to do about it.
//!
//! | Kind | Meaning | UI |
//! |------|---------|----|
//! | `session_absent` | no preview cookie, no `documentId`+`token` | render static site |
//! | `configuration` | repository or its options unknown | report |
//! | `auth` | CMS said 401/403 | prompt for an access token |
//! | `data` | document, type or manifest missing | report cause |
//! | `network` | transport or 5xx after retries | report, retry later |
//! | `aborted` | session cancelled | nothing |
//! | `guard` | already bootstrapped / bootstrap in progress | nothing |
use client::ClientError;
use normalize::NormalizeError;
use serde::{Deserialize, Serialize};
use store::StoreError;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    SessionAbsent,
    Configuration,
    Auth,
    Data,
    Network,
    Aborted,
    Guard,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::SessionAbsent => "session_absent",
            ErrorKind::Configuration => "configuration",
            ErrorKind::Auth => "auth",
            ErrorKind::Data => "data",
            ErrorKind::Network => "network",
            ErrorKind::Aborted => "aborted",
            ErrorKind::Guard => "guard",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum PreviewError {
    #[error("no active preview session")]
    SessionAbsent,
    #[error("missing resolver parameter '{0}'")]
    MissingParameter(&'static str),
    #[error("malformed preview session: {0}")]
    InvalidSession(String),
    #[error("repository '{0}' is not configured")]
    UnknownRepository(String),
    #[error("preview token belongs to '{found}', expected '{expected}'")]
    RepositoryMismatch { expected: String, found: String },
    #[error("invalid configuration: {0}")]
    Configuration(String),
    #[error("repository '{repository}' requires an access token: {message}")]
    Unauthorized { repository: String, message: String },
    #[error("document '{0}' not found")]
    DocumentNotFound(String),
    #[error("type paths unavailable: {0}")]
    Manifest(String),
    #[error("invalid CMS data: {0}")]
    Data(String),
    #[error("network failure: {0}")]
    Network(String),
    #[error("preview session aborted")]
    Aborted,
    #[error("repository '{repository}' already bootstrapped for ref '{preview_ref}'")]
    AlreadyBootstrapped {
        repository: String,
        preview_ref: String,
    },
    #[error("bootstrap already running for repository '{0}'")]
    BootstrapInProgress(String),
}

impl PreviewError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PreviewError::SessionAbsent | PreviewError::MissingParameter(_) => {
                ErrorKind::SessionAbsent
            }
            PreviewError::UnknownRepository(_)
            | PreviewError::RepositoryMismatch { .. }
            | PreviewError::Configuration(_) => ErrorKind::Configuration,
            PreviewError::Unauthorized { .. } => ErrorKind::Auth,
            PreviewError::InvalidSession(_)
            | PreviewError::DocumentNotFound(_)
            | PreviewError::Manifest(_)
            | PreviewError::Data(_) => ErrorKind::Data,
            PreviewError::Network(_) => ErrorKind::Network,
            PreviewError::Aborted => ErrorKind::Aborted,
            PreviewError::AlreadyBootstrapped { .. } | PreviewError::BootstrapInProgress(_) => {
                ErrorKind::Guard
            }
        }
    }

    /// Map a CMS client failure for `repository`.
    pub fn from_client(repository: &str, err: ClientError) -> Self {
        match err {
            ClientError::Unauthorized { message, .. } => PreviewError::Unauthorized {
                repository: repository.to_owned(),
                message,
            },
            ClientError::NotFound(what) => PreviewError::DocumentNotFound(what),
            ClientError::Aborted => PreviewError::Aborted,
            ClientError::Decode(msg) => PreviewError::Data(msg),
            ClientError::InvalidConfig(msg) => PreviewError::Configuration(msg),
            ClientError::Manifest(msg) => PreviewError::Manifest(msg),
            other => PreviewError::Network(other.to_string()),
        }
    }

    /// Like [`PreviewError::from_client`], but a missing resource is a
    /// manifest problem rather than a missing document.
    pub fn from_manifest(repository: &str, err: ClientError) -> Self {
        match err {
            ClientError::NotFound(what) => PreviewError::Manifest(format!("{what} not found")),
            ClientError::Decode(msg) => PreviewError::Manifest(msg),
            other => PreviewError::from_client(repository, other),
        }
    }
}

impl From<StoreError> for PreviewError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::AlreadyBootstrapped {
                repository,
                preview_ref,
            } => PreviewError::AlreadyBootstrapped {
                repository,
                preview_ref,
            },
            StoreError::BootstrapInProgress(repository) => {
                PreviewError::BootstrapInProgress(repository)
            }
            StoreError::UnknownRepository(repository) => PreviewError::UnknownRepository(repository),
            other => PreviewError::Configuration(other.to_string()),
        }
    }
}

impl From<NormalizeError> for PreviewError {
    fn from(err: NormalizeError) -> Self {
        PreviewError::Data(err.to_string())
    }
}

impl From<typepath::TypePathError> for PreviewError {
    fn from(err: typepath::TypePathError) -> Self {
        PreviewError::Manifest(err.to_string())
    }
}

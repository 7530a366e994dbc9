use identity::IdentityError;
use thiserror::Error;

/// Errors that stop a whole document from normalizing.
///
/// Field-level anomalies never surface here: they degrade to pass-through
/// values with a logged warning.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum NormalizeError {
    #[error("invalid normalizer configuration: {0}")]
    InvalidConfig(String),
    #[error("document id: {0}")]
    Identity(#[from] IdentityError),
}

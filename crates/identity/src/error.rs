use thiserror::Error;

/// Errors produced while deriving node identities.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdentityError {
    #[error("repository name must not be empty")]
    EmptyRepository,
    #[error("cannot derive a {0} id from an empty scope")]
    EmptyScope(&'static str),
}

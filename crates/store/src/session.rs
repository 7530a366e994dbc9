//! Per-repository bootstrap bookkeeping.
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Why a bootstrap ended in `FAILED`, as recorded in the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureCause {
    pub kind: String,
    pub message: String,
}

impl FailureCause {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
        }
    }
}

/// Last known bootstrap state of a repository.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BootstrapStatus {
    #[default]
    Init,
    Bootstrapping {
        preview_ref: String,
    },
    Bootstrapped {
        preview_ref: String,
        documents: usize,
    },
    Failed {
        preview_ref: Option<String>,
        cause: FailureCause,
    },
}

impl BootstrapStatus {
    pub fn preview_ref(&self) -> Option<&str> {
        match self {
            BootstrapStatus::Init => None,
            BootstrapStatus::Bootstrapping { preview_ref }
            | BootstrapStatus::Bootstrapped { preview_ref, .. } => Some(preview_ref),
            BootstrapStatus::Failed { preview_ref, .. } => preview_ref.as_deref(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BootstrapStatus::Bootstrapped { .. } | BootstrapStatus::Failed { .. }
        )
    }

    /// Whether a bootstrap for `preview_ref` may start from this state.
    ///
    /// Running bootstraps block everything. A finished bootstrap blocks the
    /// same ref only; a new ref is a new session. Failures may be retried.
    pub(crate) fn admit(&self, repository: &str, preview_ref: &str) -> Result<(), StoreError> {
        match self {
            BootstrapStatus::Bootstrapping { .. } => {
                Err(StoreError::BootstrapInProgress(repository.to_owned()))
            }
            BootstrapStatus::Bootstrapped {
                preview_ref: done, ..
            } if done == preview_ref => Err(StoreError::AlreadyBootstrapped {
                repository: repository.to_owned(),
                preview_ref: preview_ref.to_owned(),
            }),
            _ => Ok(()),
        }
    }
}

use thiserror::Error;

/// Errors raised by CMS and manifest clients.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ClientError {
    /// 401/403: the repository needs a (different) access token.
    #[error("unauthorized ({status}): {message}")]
    Unauthorized { status: u16, message: String },
    #[error("not found: {0}")]
    NotFound(String),
    #[error("request aborted")]
    Aborted,
    #[error("HTTP error {status}: {message}")]
    Http { status: u16, message: String },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("invalid response: {0}")]
    Decode(String),
    #[error("invalid client configuration: {0}")]
    InvalidConfig(String),
    #[error("manifest error: {0}")]
    Manifest(String),
}

impl ClientError {
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            401 | 403 => ClientError::Unauthorized { status, message },
            404 => ClientError::NotFound(message),
            _ => ClientError::Http { status, message },
        }
    }

    /// Transient failures worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Transport(_) => true,
            ClientError::Http { status, .. } => {
                matches!(*status, 408 | 429) || *status >= 500
            }
            _ => false,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ClientError::Unauthorized { .. })
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            ClientError::from_status(status.as_u16(), err.to_string())
        } else if err.is_decode() {
            ClientError::Decode(err.to_string())
        } else {
            ClientError::Transport(err.to_string())
        }
    }
}

impl From<typepath::TypePathError> for ClientError {
    fn from(err: typepath::TypePathError) -> Self {
        ClientError::Manifest(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert!(ClientError::from_status(401, "x").is_unauthorized());
        assert!(ClientError::from_status(403, "x").is_unauthorized());
        assert_eq!(ClientError::from_status(404, "doc"), ClientError::NotFound("doc".into()));
        assert!(ClientError::from_status(503, "x").is_retryable());
        assert!(!ClientError::from_status(400, "x").is_retryable());
        assert!(!ClientError::from_status(401, "x").is_retryable());
        assert!(!ClientError::Aborted.is_retryable());
    }
}

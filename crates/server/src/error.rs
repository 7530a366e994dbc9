use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use engine::{ErrorKind, PreviewError};
use serde::{Deserialize, Serialize};
use serde_json::json;

pub type ServerResult<T> = Result<T, ServerError>;

/// Server error types
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Preview(#[from] PreviewError),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// API error response structure
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ServerError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::NotFound(_) => StatusCode::NOT_FOUND,
            ServerError::Preview(err) => preview_status(err),
            ServerError::Internal(_) | ServerError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get error code string
    pub fn error_code(&self) -> &'static str {
        match self {
            ServerError::BadRequest(_) => "BAD_REQUEST",
            ServerError::NotFound(_) => "NOT_FOUND",
            ServerError::Preview(err) => preview_code(err),
            ServerError::Internal(_) => "INTERNAL_ERROR",
            ServerError::Config(_) => "CONFIG_ERROR",
        }
    }
}

fn preview_status(err: &PreviewError) -> StatusCode {
    match err {
        PreviewError::UnknownRepository(_) | PreviewError::DocumentNotFound(_) => {
            StatusCode::NOT_FOUND
        }
        _ => match err.kind() {
            ErrorKind::SessionAbsent | ErrorKind::Configuration => StatusCode::BAD_REQUEST,
            ErrorKind::Auth => StatusCode::UNAUTHORIZED,
            ErrorKind::Data => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorKind::Network => StatusCode::BAD_GATEWAY,
            ErrorKind::Aborted => StatusCode::SERVICE_UNAVAILABLE,
            ErrorKind::Guard => StatusCode::CONFLICT,
        },
    }
}

fn preview_code(err: &PreviewError) -> &'static str {
    match err {
        PreviewError::UnknownRepository(_) => "UNKNOWN_REPOSITORY",
        PreviewError::DocumentNotFound(_) => "DOCUMENT_NOT_FOUND",
        PreviewError::AlreadyBootstrapped { .. } => "ALREADY_BOOTSTRAPPED",
        PreviewError::BootstrapInProgress(_) => "BOOTSTRAP_IN_PROGRESS",
        _ => match err.kind() {
            ErrorKind::SessionAbsent => "NO_PREVIEW_SESSION",
            ErrorKind::Configuration => "PREVIEW_CONFIG_ERROR",
            ErrorKind::Auth => "ACCESS_TOKEN_REQUIRED",
            ErrorKind::Data => "PREVIEW_DATA_ERROR",
            ErrorKind::Network => "CMS_UNAVAILABLE",
            ErrorKind::Aborted => "PREVIEW_ABORTED",
            ErrorKind::Guard => "PREVIEW_GUARD",
        },
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let details = match &self {
            ServerError::Preview(err) => Some(json!({ "kind": err.kind() })),
            _ => None,
        };
        let body = ErrorResponse {
            error: ErrorDetail {
                code: self.error_code().to_string(),
                message: self.to_string(),
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<serde_json::Error> for ServerError {
    fn from(err: serde_json::Error) -> Self {
        ServerError::BadRequest(format!("JSON parse error: {err}"))
    }
}

impl From<anyhow::Error> for ServerError {
    fn from(err: anyhow::Error) -> Self {
        ServerError::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_failures_ask_for_a_token() {
        let err = ServerError::from(PreviewError::Unauthorized {
            repository: "blog".into(),
            message: "401".into(),
        });
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.error_code(), "ACCESS_TOKEN_REQUIRED");
    }

    #[test]
    fn guard_and_lookup_failures() {
        let guard = ServerError::from(PreviewError::BootstrapInProgress("blog".into()));
        assert_eq!(guard.status_code(), StatusCode::CONFLICT);

        let missing = ServerError::from(PreviewError::DocumentNotFound("X".into()));
        assert_eq!(missing.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(missing.error_code(), "DOCUMENT_NOT_FOUND");

        let absent = ServerError::from(PreviewError::SessionAbsent);
        assert_eq!(absent.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(absent.error_code(), "NO_PREVIEW_SESSION");

        let network = ServerError::from(PreviewError::Network("502".into()));
        assert_eq!(network.status_code(), StatusCode::BAD_GATEWAY);
    }
}

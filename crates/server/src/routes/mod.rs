//! API route handlers
//!
//! - `health`: liveness and readiness
//! - `preview`: bootstrap, resolve, render and session state
//! - `repositories`: stored documents and access tokens per repository

pub mod health;
pub mod preview;
pub mod repositories;

use crate::error::{ServerError, ServerResult};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

/// API version and base info
pub async fn api_info() -> ServerResult<impl IntoResponse> {
    Ok(Json(json!({
        "name": "Live Preview Server",
        "version": env!("CARGO_PKG_VERSION"),
        "api_version": "v1",
        "endpoints": [
            "/api/v1/preview/bootstrap",
            "/api/v1/preview/resolve",
            "/api/v1/preview/render",
            "/api/v1/preview/state/{repository}",
            "/api/v1/preview/session",
            "/api/v1/repositories/{repository}/documents/{id}",
            "/api/v1/repositories/{repository}/access-token",
            "/health",
            "/ready"
        ]
    })))
}

/// 404 Not Found handler
pub async fn not_found() -> ServerError {
    ServerError::NotFound("no such route".into())
}

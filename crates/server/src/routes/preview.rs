//! Preview session endpoints driven by the UI layer.
//!
//! - `POST /api/v1/preview/bootstrap` reads the preview cookie and runs the
//!   bootstrap state machine. Access-token cookies for configured
//!   repositories are adopted first.
//! - `POST /api/v1/preview/resolve` runs the single-document resolver.
//! - `POST /api/v1/preview/render` merges preview nodes into page data.
//! - `GET /api/v1/preview/state/{repository}` reports the bootstrap status.
//! - `DELETE /api/v1/preview/session` forgets every preview document.
use crate::error::{ServerError, ServerResult};
use crate::state::ServerState;
use axum::extract::{Path, Query, State};
use axum::http::header::COOKIE;
use axum::http::HeaderMap;
use axum::Json;
use engine::{
    access_token_cookie_name, cookie_value, BootstrapState, PreviewError, ResolverParams,
    ResolverState, PREVIEW_COOKIE,
};
use reconcile::{MergeOutcome, MergeStrategy};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use store::BootstrapStatus;
use tracing::warn;

/// All `Cookie` headers of a request, joined.
fn cookie_header(headers: &HeaderMap) -> String {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Store tokens the UI saved in `{repository}.accessToken` cookies.
fn adopt_access_tokens(state: &ServerState, cookies: &str) {
    for name in state.engine.repositories().names() {
        let Some(token) = cookie_value(cookies, &access_token_cookie_name(name)) else {
            continue;
        };
        if token.is_empty() {
            continue;
        }
        if let Err(err) = state.engine.set_access_token(name, token) {
            warn!(repository = name, error = %err, "access_token_cookie_rejected");
        }
    }
}

pub async fn bootstrap(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
) -> ServerResult<Json<Value>> {
    let cookies = cookie_header(&headers);
    adopt_access_tokens(&state, &cookies);

    let preview = cookie_value(&cookies, PREVIEW_COOKIE);
    match state.engine.bootstrap(preview, &state.run_token()).await {
        BootstrapState::Bootstrapped(summary) => Ok(Json(json!({
            "state": "BOOTSTRAPPED",
            "summary": summary,
        }))),
        BootstrapState::Failed(err) => Err(err.into()),
        other => Err(ServerError::Internal(format!(
            "bootstrap stopped in state {}",
            other.name()
        ))),
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateResponse {
    pub repository: String,
    pub status: BootstrapStatus,
    pub has_access_token: bool,
    pub prompt_for_access_token: bool,
}

pub async fn session_state(
    State(state): State<Arc<ServerState>>,
    Path(repository): Path<String>,
) -> ServerResult<Json<StateResponse>> {
    let repository = state.repository(Some(&repository))?;
    Ok(Json(StateResponse {
        status: state.engine.bootstrap_status(&repository),
        has_access_token: state.engine.access_token(&repository).is_some(),
        prompt_for_access_token: state.engine.prompts_for_access_token(&repository),
        repository,
    }))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveRequest {
    pub document_id: Option<String>,
    pub token: Option<String>,
    pub repository: Option<String>,
}

impl ResolveRequest {
    fn params(&self) -> Result<Option<ResolverParams>, PreviewError> {
        let present = |value: &Option<String>| value.clone().filter(|v| !v.is_empty());
        match (present(&self.document_id), present(&self.token)) {
            (None, None) => Ok(None),
            (Some(document_id), Some(token)) => Ok(Some(ResolverParams::new(document_id, token))),
            (None, Some(_)) => Err(PreviewError::MissingParameter("documentId")),
            (Some(_), None) => Err(PreviewError::MissingParameter("token")),
        }
    }
}

pub async fn resolve(
    State(state): State<Arc<ServerState>>,
    Json(request): Json<ResolveRequest>,
) -> ServerResult<Json<Value>> {
    let params = request.params()?;
    let outcome = state
        .engine
        .resolve(
            params.as_ref(),
            request.repository.as_deref(),
            &state.run_token(),
        )
        .await;
    match outcome {
        ResolverState::Resolved(resolution) => Ok(Json(json!({
            "state": "RESOLVED",
            "resolution": resolution,
        }))),
        ResolverState::Failed(err) => Err(err.into()),
        other => Err(ServerError::Internal(format!(
            "resolver stopped in state {}",
            other.name()
        ))),
    }
}

/// How the UI wants preview content merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RenderStrategy {
    /// Replace static nodes whose identity matches a preview node.
    TraverseAndReplace,
    /// Insert the document named by `documentId` at the root of the data.
    RootReplaceOrInsert,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderRequest {
    #[serde(default)]
    pub static_data: Value,
    pub strategy: RenderStrategy,
    pub document_id: Option<String>,
    pub repository: Option<String>,
}

pub async fn render(
    State(state): State<Arc<ServerState>>,
    Json(request): Json<RenderRequest>,
) -> ServerResult<Json<MergeOutcome>> {
    let outcome = match request.strategy {
        RenderStrategy::TraverseAndReplace => {
            let mut options = state.snapshot.clone();
            if let Some(repository) = request.repository.as_deref() {
                options.repository = Some(state.repository(Some(repository))?);
            }
            state.engine.render(
                &request.static_data,
                &MergeStrategy::TraverseAndReplace,
                &options,
            )?
        }
        RenderStrategy::RootReplaceOrInsert => {
            let document_id = request
                .document_id
                .as_deref()
                .filter(|id| !id.is_empty())
                .ok_or(PreviewError::MissingParameter("documentId"))?;
            let repository = state.repository(request.repository.as_deref())?;
            state.engine.render_unpublished(
                &request.static_data,
                &repository,
                document_id,
                &state.snapshot,
            )?
        }
    };
    Ok(Json(outcome))
}

#[derive(Debug, Default, Deserialize)]
pub struct ResetQuery {
    pub repository: Option<String>,
}

/// Drops every preview document, or only those of `?repository=`.
pub async fn reset(
    State(state): State<Arc<ServerState>>,
    Query(query): Query<ResetQuery>,
) -> ServerResult<Json<Value>> {
    let removed = match query.repository.as_deref() {
        Some(repository) => state.engine.reset_repository(repository)?,
        None => state.engine.reset()?,
    };
    Ok(Json(json!({ "removed": removed })))
}

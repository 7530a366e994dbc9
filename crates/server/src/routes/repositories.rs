use crate::error::{ServerError, ServerResult};
use crate::state::ServerState;
use axum::extract::{Path, State};
use axum::http::header::SET_COOKIE;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use engine::access_token_cookie_name;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

/// A stored preview node, rendered with its links expanded.
///
/// `id` is either the node id or the CMS document id.
pub async fn get_document(
    State(state): State<Arc<ServerState>>,
    Path((repository, id)): Path<(String, String)>,
) -> ServerResult<Json<Value>> {
    let repository = state.repository(Some(&repository))?;
    let store = state.engine.store();
    let node_id = match store.get_by_prismic_id(&repository, &id) {
        Some(document) => document.id.clone(),
        None => store
            .get(&id)
            .filter(|document| document.repository == repository)
            .map(|document| document.id.clone())
            .ok_or_else(|| ServerError::NotFound(format!("document '{id}' in '{repository}'")))?,
    };
    store
        .render(&node_id, &state.snapshot)
        .map(Json)
        .ok_or_else(|| ServerError::NotFound(format!("document '{id}' in '{repository}'")))
}

pub async fn get_access_token(
    State(state): State<Arc<ServerState>>,
    Path(repository): Path<String>,
) -> ServerResult<Json<Value>> {
    let repository = state.repository(Some(&repository))?;
    Ok(Json(json!({
        "repository": repository,
        "hasAccessToken": state.engine.access_token(&repository).is_some(),
        "promptForAccessToken": state.engine.prompts_for_access_token(&repository),
        "cookie": access_token_cookie_name(&repository),
    })))
}

#[derive(Debug, Deserialize)]
pub struct AccessTokenRequest {
    pub token: String,
}

pub async fn put_access_token(
    State(state): State<Arc<ServerState>>,
    Path(repository): Path<String>,
    Json(request): Json<AccessTokenRequest>,
) -> ServerResult<Response> {
    let repository = state.repository(Some(&repository))?;
    let token = request.token.trim();
    if token.contains(|c: char| c == ';' || c == ',' || c.is_whitespace()) {
        return Err(ServerError::BadRequest(
            "access token contains characters not allowed in a cookie".into(),
        ));
    }
    state.engine.set_access_token(&repository, token)?;
    let cookie = token_cookie(&state, &repository, token, None);
    no_content_with_cookie(cookie)
}

pub async fn delete_access_token(
    State(state): State<Arc<ServerState>>,
    Path(repository): Path<String>,
) -> ServerResult<Response> {
    let repository = state.repository(Some(&repository))?;
    state.engine.clear_access_token(&repository)?;
    let cookie = token_cookie(&state, &repository, "", Some(0));
    no_content_with_cookie(cookie)
}

fn token_cookie(state: &ServerState, repository: &str, token: &str, max_age: Option<u64>) -> String {
    let mut cookie = format!(
        "{}={token}; Path=/; SameSite=Lax",
        access_token_cookie_name(repository)
    );
    if let Some(seconds) = max_age {
        cookie.push_str(&format!("; Max-Age={seconds}"));
    }
    if state.config.cookie_secure {
        cookie.push_str("; Secure");
    }
    cookie
}

fn no_content_with_cookie(cookie: String) -> ServerResult<Response> {
    let value = HeaderValue::from_str(&cookie)
        .map_err(|err| ServerError::BadRequest(format!("invalid cookie: {err}")))?;
    let mut response = StatusCode::NO_CONTENT.into_response();
    response.headers_mut().insert(SET_COOKIE, value);
    Ok(response)
}

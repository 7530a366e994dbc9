//! Preview session detection.
//!
//! A preview session is signalled by the `io.prismic.preview` cookie. Its
//! value is either a JSON object keyed by CMS host:
//!
//! ```text
//! {"blog.prismic.io":{"preview":"https://blog.prismic.io/previews/Yk3:Yl1?websitePreviewId=Yj0"}}
//! ```
//!
//! or, in older toolbars, the bare preview URL. In both cases the repository
//! is the first label of the preview URL's host. A release preview carries
//! the release id after the `:` in the last path segment.
//!
//! A single-document resolver session is signalled by `documentId` and
//! `token` query parameters instead.
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::{form_urlencoded, Url};

use crate::error::PreviewError;

/// Cookie holding the preview ref.
pub const PREVIEW_COOKIE: &str = "io.prismic.preview";

/// Suffix of the access-token cookie; the full name is `{repository}.{suffix}`.
pub const ACCESS_TOKEN_COOKIE_SUFFIX: &str = "accessToken";

pub fn access_token_cookie_name(repository: &str) -> String {
    format!("{repository}.{ACCESS_TOKEN_COOKIE_SUFFIX}")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewSession {
    pub repository: String,
    /// The preview ref, passed verbatim as `ref` to the CMS.
    pub preview_ref: String,
    pub release_id: Option<String>,
}

impl PreviewSession {
    /// Parse a preview URL, e.g. the `token` of a resolver session.
    pub fn from_preview_url(preview_ref: &str) -> Result<Self, PreviewError> {
        let url = Url::parse(preview_ref)
            .map_err(|err| PreviewError::InvalidSession(format!("'{preview_ref}': {err}")))?;
        let repository = url
            .host_str()
            .and_then(|host| host.split('.').next())
            .filter(|label| !label.is_empty())
            .ok_or_else(|| {
                PreviewError::InvalidSession(format!("'{preview_ref}' names no repository"))
            })?
            .to_owned();
        let release_id = url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .and_then(|last| last.split_once(':'))
            .map(|(_, release)| release)
            .filter(|release| !release.is_empty() && *release != "master")
            .map(str::to_owned);
        Ok(Self {
            repository,
            preview_ref: preview_ref.to_owned(),
            release_id,
        })
    }

    /// Every session named by a preview cookie value. Empty when the value
    /// carries no preview.
    pub fn from_cookie_value(raw: &str) -> Result<Vec<Self>, PreviewError> {
        let decoded = percent_decode(raw.trim());
        if decoded.is_empty() {
            return Ok(Vec::new());
        }
        if decoded.starts_with('{') {
            let value: Value = serde_json::from_str(&decoded)
                .map_err(|err| PreviewError::InvalidSession(format!("cookie JSON: {err}")))?;
            let Value::Object(hosts) = value else {
                return Ok(Vec::new());
            };
            let mut sessions = Vec::new();
            for (host, entry) in hosts {
                // Non-host keys (e.g. `_tracker`) carry toolbar state.
                if !host.contains('.') {
                    continue;
                }
                if let Some(preview) = entry.get("preview").and_then(Value::as_str) {
                    sessions.push(Self::from_preview_url(preview)?);
                }
            }
            return Ok(sessions);
        }
        Self::from_preview_url(&decoded).map(|session| vec![session])
    }

    /// The session for `repository` in a cookie value, if any.
    pub fn for_repository(raw: &str, repository: &str) -> Result<Option<Self>, PreviewError> {
        Ok(Self::from_cookie_value(raw)?
            .into_iter()
            .find(|session| session.repository == repository))
    }

    pub fn is_release(&self) -> bool {
        self.release_id.is_some()
    }
}

/// Pull a cookie's value out of a `Cookie` header.
pub fn cookie_value<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    header.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        (key == name).then_some(value)
    })
}

/// Parameters of a single-document resolver session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolverParams {
    pub document_id: String,
    pub token: String,
}

impl ResolverParams {
    pub fn new(document_id: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            document_id: document_id.into(),
            token: token.into(),
        }
    }

    /// Read `documentId` and `token` from a query string.
    ///
    /// Neither present is not a resolver session (`Ok(None)`); only one of
    /// them present is an error naming the missing one.
    pub fn from_query(query: &str) -> Result<Option<Self>, PreviewError> {
        let mut document_id = None;
        let mut token = None;
        for (key, value) in form_urlencoded::parse(query.trim_start_matches('?').as_bytes()) {
            match key.as_ref() {
                "documentId" if !value.is_empty() => document_id = Some(value.into_owned()),
                "token" if !value.is_empty() => token = Some(value.into_owned()),
                _ => {}
            }
        }
        match (document_id, token) {
            (None, None) => Ok(None),
            (Some(document_id), Some(token)) => Ok(Some(Self { document_id, token })),
            (None, Some(_)) => Err(PreviewError::MissingParameter("documentId")),
            (Some(_), None) => Err(PreviewError::MissingParameter("token")),
        }
    }

    pub fn session(&self) -> Result<PreviewSession, PreviewError> {
        PreviewSession::from_preview_url(&self.token)
    }
}

fn percent_decode(raw: &str) -> String {
    // `+` and `&` are literal in cookie values; protect them from form decoding.
    let protected = raw.replace('+', "%2B").replace('&', "%26");
    form_urlencoded::parse(format!("v={protected}").as_bytes())
        .next()
        .map(|(_, value)| value.into_owned())
        .unwrap_or_default()
}

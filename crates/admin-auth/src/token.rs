//! Wire types for the backend `/auth` endpoints and the refresh exchange
//!
//! The backend speaks camelCase JSON:
//! - `POST /auth/login`   `{username, password}` -> `{accessToken, refreshToken}`
//! - `POST /auth/refresh` `{refreshToken}`       -> `{accessToken, refreshToken}`
//! - `GET  /auth/me`                            -> `{role, ...}`
//!
//! Login and identity confirmation travel through the API client like any
//! other request. The refresh exchange is issued here directly: it must never
//! carry the expired bearer token and must never re-enter the refresh
//! protocol itself.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constants::{PRIVILEGED_ROLES, REFRESH_PATH};
use crate::error::{Error, Result};

/// A freshly issued access/refresh pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Body of `POST /auth/login`.
#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

/// Body of `POST /auth/refresh`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest<'a> {
    pub refresh_token: &'a str,
}

/// Principal returned by `GET /auth/me`.
///
/// Only `role` is interpreted; every other field is kept verbatim for display.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CurrentUser {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl CurrentUser {
    /// Whether the principal may use the admin endpoints.
    pub fn is_admin(&self) -> bool {
        self.role
            .as_deref()
            .is_some_and(|role| PRIVILEGED_ROLES.contains(&role))
    }
}

/// Refresh response as sent on the wire. Both fields are checked by hand so a
/// 2xx with a missing token is reported as malformed rather than a parse error.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTokenResponse {
    access_token: Option<String>,
    refresh_token: Option<String>,
}

/// Join the API root and an endpoint path the way the backend expects
/// (plain concatenation, the path carries its leading slash).
pub fn endpoint_url(base_url: &str, path: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), path)
}

/// Exchange `refresh` for a new token pair.
///
/// Any non-2xx status is a hard failure; 401/403 are reported as
/// `RefreshRejected` since they mean the refresh token itself is dead.
pub async fn refresh_token(
    client: &reqwest::Client,
    base_url: &str,
    refresh: &str,
) -> Result<TokenPair> {
    let url = endpoint_url(base_url, REFRESH_PATH);
    debug!(url = %url, "exchanging refresh token");

    let response = client
        .post(&url)
        .json(&RefreshRequest {
            refresh_token: refresh,
        })
        .send()
        .await
        .map_err(|e| Error::Http(format!("token refresh request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| String::from("<no body>"));

        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(Error::RefreshRejected(format!("{status}: {body}")));
        }

        return Err(Error::RefreshFailed(format!(
            "refresh endpoint returned {status}: {body}"
        )));
    }

    let raw = response
        .json::<RawTokenResponse>()
        .await
        .map_err(|e| Error::MalformedResponse(format!("invalid refresh response: {e}")))?;

    let access_token = raw
        .access_token
        .filter(|token| !token.is_empty())
        .ok_or_else(|| Error::MalformedResponse("refresh response has no accessToken".into()))?;
    let refresh_token = raw
        .refresh_token
        .ok_or_else(|| Error::MalformedResponse("refresh response has no refreshToken".into()))?;

    Ok(TokenPair {
        access_token,
        refresh_token,
    })
}

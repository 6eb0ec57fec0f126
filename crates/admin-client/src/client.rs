//! Authenticated request pipeline
//!
//! Every privileged call goes through `ApiClient::request`:
//! 1. Attach `Authorization: Bearer <access token>` if one is stored, and a JSON
//!    content type if the call carries a body
//! 2. Dispatch
//! 3. 2xx: return the JSON body, or `{}` when the response is not JSON
//! 4. 401: obtain a new token from the refresh coordinator and re-dispatch
//!    exactly once; a second 401 is surfaced, never looped
//! 5. Other statuses: fail with the backend's `message`, else `HTTP Error: <status>`
//!
//! Views never touch the credential store; login and logout are the only
//! client operations that write it directly.

use std::sync::Arc;
use std::time::Duration;

use admin_auth::{
    CredentialStore, CurrentUser, LOGIN_PATH, LoginRequest, ME_PATH, TokenKind, TokenPair,
    endpoint_url,
};
use common::Secret;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::error::{Error, Result};
use crate::refresh::{HttpTokenRefresher, RefreshCoordinator, TokenRefresher};
use crate::signal::SessionSignal;

/// Header carrying the per-request correlation id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Method, optional JSON body and extra headers of one call.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub method: Method,
    pub body: Option<Value>,
    pub headers: HeaderMap,
}

impl RequestOptions {
    pub fn get() -> Self {
        Self::default()
    }

    pub fn post(body: Value) -> Self {
        Self {
            method: Method::POST,
            body: Some(body),
            ..Self::default()
        }
    }

    /// POST without a body (no content type is sent).
    pub fn post_empty() -> Self {
        Self {
            method: Method::POST,
            ..Self::default()
        }
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }
}

/// Client for the middleware admin API.
///
/// Cheap to clone; clones share the HTTP connection pool, the credential
/// store, the refresh gate and the session-ended signal.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    store: Arc<dyn CredentialStore>,
    coordinator: RefreshCoordinator,
    signal: SessionSignal,
}

impl ApiClient {
    /// Build a client whose refreshes go to `{base_url}/auth/refresh`.
    ///
    /// `timeout` bounds every request, refresh exchange included.
    pub fn new(
        base_url: impl Into<String>,
        store: Arc<dyn CredentialStore>,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::InvalidRequest(format!("building HTTP client: {e}")))?;
        let base_url = base_url.into();
        let refresher = Arc::new(HttpTokenRefresher::new(http.clone(), base_url.clone()));
        Ok(Self::with_refresher(http, base_url, store, refresher))
    }

    /// Build a client around an existing HTTP client and refresher.
    pub fn with_refresher(
        http: reqwest::Client,
        base_url: impl Into<String>,
        store: Arc<dyn CredentialStore>,
        refresher: Arc<dyn TokenRefresher>,
    ) -> Self {
        let signal = SessionSignal::new();
        let coordinator = RefreshCoordinator::new(store.clone(), refresher, signal.clone());
        Self {
            http,
            base_url: base_url.into(),
            store,
            coordinator,
            signal,
        }
    }

    /// Session-ended signal raised when the refresh protocol gives up.
    pub fn signal(&self) -> &SessionSignal {
        &self.signal
    }

    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Whether an access token is currently stored.
    pub fn has_credentials(&self) -> bool {
        self.store.get(TokenKind::Access).is_some()
    }

    /// Issue an authenticated call and return its JSON body.
    pub async fn request(&self, endpoint: &str, options: RequestOptions) -> Result<Value> {
        let request_id = format!("req_{}", uuid::Uuid::new_v4().as_simple());
        let result = self.execute(endpoint, &options, &request_id).await;
        if let Err(e) = &result {
            warn!(request_id = %request_id, endpoint, error = %e, "API call error");
        }
        result
    }

    /// `request` followed by deserialization into `T`.
    pub async fn request_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        options: RequestOptions,
    ) -> Result<T> {
        let value = self.request(endpoint, options).await?;
        serde_json::from_value(value).map_err(|e| Error::Decode(format!("{endpoint}: {e}")))
    }

    #[instrument(skip_all, fields(request_id = %request_id, method = %options.method, endpoint = %endpoint))]
    async fn execute(
        &self,
        endpoint: &str,
        options: &RequestOptions,
        request_id: &str,
    ) -> Result<Value> {
        let access = self.store.get(TokenKind::Access);
        let response = self
            .send(endpoint, options, access.as_deref(), request_id)
            .await?;

        if response.status() != StatusCode::UNAUTHORIZED {
            return read_response(response).await;
        }

        debug!(had_token = access.is_some(), "unauthorized, entering refresh protocol");
        let token = self.coordinator.obtain(access.as_deref()).await?;

        debug!("retrying with refreshed token");
        let retry = self.send(endpoint, options, Some(&token), request_id).await?;
        read_response(retry).await
    }

    async fn send(
        &self,
        endpoint: &str,
        options: &RequestOptions,
        token: Option<&str>,
        request_id: &str,
    ) -> Result<reqwest::Response> {
        let mut headers = options.headers.clone();
        headers.insert(
            HeaderName::from_static(REQUEST_ID_HEADER),
            HeaderValue::from_str(request_id)
                .map_err(|e| Error::InvalidRequest(format!("request id: {e}")))?,
        );
        if options.body.is_some() {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }
        if let Some(token) = token {
            let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| Error::InvalidRequest(format!("access token is not a valid header: {e}")))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let mut builder = self
            .http
            .request(options.method.clone(), endpoint_url(&self.base_url, endpoint))
            .headers(headers);
        if let Some(body) = &options.body {
            builder = builder.body(body.to_string());
        }

        match builder.send().await {
            Ok(response) => {
                crate::metrics::record_request(response.status().as_str());
                debug!(status = response.status().as_u16(), "response received");
                Ok(response)
            }
            Err(e) => {
                crate::metrics::record_request("transport");
                Err(Error::Transport(e.to_string()))
            }
        }
    }

    /// Confirm the identity behind the stored access token.
    pub async fn current_user(&self) -> Result<CurrentUser> {
        self.request_json(ME_PATH, RequestOptions::get()).await
    }

    /// Sign in and keep the session only if the principal is an admin.
    ///
    /// The login call bypasses the refresh protocol: a 401 here means bad
    /// credentials, not an expired session. On any failure the store is left
    /// empty.
    pub async fn login(&self, username: &str, password: &Secret<String>) -> Result<CurrentUser> {
        let request_id = format!("req_{}", uuid::Uuid::new_v4().as_simple());
        let body = serde_json::to_value(LoginRequest {
            username,
            password: password.expose(),
        })
        .map_err(|e| Error::InvalidRequest(e.to_string()))?;

        let response = self
            .send(LOGIN_PATH, &RequestOptions::post(body), None, &request_id)
            .await?;
        let value = read_response(response).await?;
        let pair: TokenPair = serde_json::from_value(value)
            .map_err(|e| Error::Decode(format!("login response: {e}")))?;
        self.store.set_pair(&pair);

        match self.current_user().await {
            Ok(user) if user.is_admin() => {
                info!(username, role = user.role.as_deref(), "signed in");
                Ok(user)
            }
            Ok(user) => {
                self.store.clear();
                warn!(username, role = user.role.as_deref(), "sign-in refused, not an admin");
                Err(Error::NoPermission { role: user.role })
            }
            Err(e) => {
                self.store.clear();
                Err(e)
            }
        }
    }

    /// Forget the stored session. Explicit logout does not broadcast.
    pub fn logout(&self) {
        self.store.clear();
        info!("signed out");
    }
}

/// Interpret a response that will not be retried.
async fn read_response(response: reqwest::Response) -> Result<Value> {
    let status = response.status();

    if status.is_success() {
        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.contains("application/json"));
        if !is_json {
            return Ok(Value::Object(serde_json::Map::new()));
        }
        return response
            .json::<Value>()
            .await
            .map_err(|e| Error::Decode(e.to_string()));
    }

    let message = response
        .json::<Value>()
        .await
        .ok()
        .and_then(|body| {
            body.get("message")
                .and_then(Value::as_str)
                .filter(|m| !m.is_empty())
                .map(str::to_owned)
        })
        .unwrap_or_else(|| format!("HTTP Error: {}", status.as_u16()));

    Err(Error::Api {
        status: status.as_u16(),
        message,
    })
}

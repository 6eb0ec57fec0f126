//! Error types for credential and token operations

/// Errors from the `/auth/refresh` exchange.
///
/// Payloads are plain strings so the error is `Clone`: one refresh outcome is
/// handed to every caller waiting on it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("refresh token rejected: {0}")]
    RefreshRejected(String),

    #[error("token refresh failed: {0}")]
    RefreshFailed(String),

    #[error("malformed token response: {0}")]
    MalformedResponse(String),
}

/// Result alias for auth operations.
pub type Result<T> = std::result::Result<T, Error>;

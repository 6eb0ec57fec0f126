//! Error types for API client operations

/// Why the refresh protocol could not produce a new access token.
///
/// Every caller waiting on one refresh episode receives a clone of the same
/// value. Apart from `Aborted`, every variant means the session is over:
/// credentials are cleared and the session-ended signal has fired.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RefreshError {
    #[error("Session expired.")]
    MissingRefreshToken,

    #[error("Session expired: {0}")]
    Refresh(#[from] admin_auth::Error),

    /// The refresh task was dropped before settling; credentials untouched
    #[error("token refresh stopped before settling")]
    Aborted,
}

/// Errors surfaced to callers of the API client.
///
/// Callers never see a bare 401: an unauthorized response is either recovered
/// by the refresh protocol or turned into `SessionExpired`. The one exception
/// is a retry that is itself rejected, which surfaces as `Api { status: 401 }`.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Transport(String),

    /// Non-2xx answer. Display is exactly the backend's message.
    #[error("{message}")]
    Api { status: u16, message: String },

    #[error(transparent)]
    SessionExpired(#[from] RefreshError),

    #[error("You do not have permission to access the admin dashboard (role: {})", role.as_deref().unwrap_or("none"))]
    NoPermission { role: Option<String> },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("Node has no advertised address.")]
    NoAdvertisedAddress,

    #[error("invalid response body: {0}")]
    Decode(String),
}

impl Error {
    /// HTTP status carried by an application-level failure.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether this failure ended the session (the shell returns to login).
    pub fn is_session_expired(&self) -> bool {
        matches!(self, Error::SessionExpired(e) if *e != RefreshError::Aborted)
    }
}

/// Result alias for client operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_displays_backend_message_verbatim() {
        let err = Error::Api {
            status: 500,
            message: "db down".into(),
        };
        assert_eq!(err.to_string(), "db down");
        assert_eq!(err.status(), Some(500));
        assert!(!err.is_session_expired());
    }

    #[test]
    fn missing_refresh_token_reads_as_session_expired() {
        let err: Error = RefreshError::MissingRefreshToken.into();
        assert_eq!(err.to_string(), "Session expired.");
        assert!(err.is_session_expired());
        assert_eq!(err.status(), None);
    }

    #[test]
    fn refresh_failure_keeps_cause() {
        let err: Error =
            RefreshError::from(admin_auth::Error::RefreshFailed("400 Bad Request".into())).into();
        assert_eq!(
            err.to_string(),
            "Session expired: token refresh failed: 400 Bad Request"
        );
    }

    #[test]
    fn aborted_refresh_does_not_end_session() {
        let err: Error = RefreshError::Aborted.into();
        assert_eq!(err.to_string(), "token refresh stopped before settling");
        assert!(!err.is_session_expired());
    }

    #[test]
    fn no_permission_names_role() {
        let err = Error::NoPermission {
            role: Some("USER".into()),
        };
        assert!(err.to_string().contains("role: USER"), "got: {err}");
        let err = Error::NoPermission { role: None };
        assert!(err.to_string().contains("role: none"), "got: {err}");
    }
}

//! Fixed identifiers shared with the backend and the persisted session
//!
//! The storage keys match the slots the web console used, so a credential
//! file written by one build stays readable by the next.

/// Storage slot for the short-lived access token
pub const ACCESS_TOKEN_KEY: &str = "aratiri_accessToken";

/// Storage slot for the refresh token
pub const REFRESH_TOKEN_KEY: &str = "aratiri_refreshToken";

/// Default middleware API root when nothing is configured
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:2100/v1";

pub const LOGIN_PATH: &str = "/auth/login";
pub const REFRESH_PATH: &str = "/auth/refresh";
pub const ME_PATH: &str = "/auth/me";

/// Roles that grant access to the admin endpoints.
pub const PRIVILEGED_ROLES: &[&str] = &["ADMIN", "SUPERADMIN"];

/// Name of the session-ended broadcast, used as a log and metric label.
pub const SESSION_ENDED_EVENT: &str = "force-logout";

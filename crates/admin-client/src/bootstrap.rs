//! Startup session check
//!
//! Decides whether a persisted access token still grants admin access:
//! - nothing stored: logged out, no network call
//! - undecodable or expired token: clear, logged out, no network call
//! - otherwise confirm via `GET /auth/me`; admin roles are let in, any other
//!   principal is cleared with a distinct "no permission" notice, and any
//!   failure degrades to "session expired"

use std::fmt;
use std::time::SystemTime;

use admin_auth::{CurrentUser, TokenKind, session};
use tracing::{debug, info, warn};

use crate::client::ApiClient;

/// Why the operator is looking at the login screen, when there is a reason
/// worth telling them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthNotice {
    NoPermission,
    SessionExpired,
}

impl fmt::Display for AuthNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthNotice::NoPermission => {
                write!(f, "You do not have permission to access the admin dashboard.")
            }
            AuthNotice::SessionExpired => write!(f, "Session expired. Please sign in again."),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BootstrapOutcome {
    Authenticated(CurrentUser),
    LoggedOut { notice: Option<AuthNotice> },
}

impl BootstrapOutcome {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, BootstrapOutcome::Authenticated(_))
    }
}

/// Check the stored session at `now`. Never fails; every problem maps to a
/// logged-out outcome.
pub async fn bootstrap(client: &ApiClient, now: SystemTime) -> BootstrapOutcome {
    let Some(token) = client.store().get(TokenKind::Access) else {
        debug!("no stored session");
        return BootstrapOutcome::LoggedOut { notice: None };
    };

    if !session::is_usable(&token, now) {
        info!("stored access token is invalid or expired, clearing");
        client.store().clear();
        return BootstrapOutcome::LoggedOut { notice: None };
    }

    match client.current_user().await {
        Ok(user) if user.is_admin() => {
            info!(role = user.role.as_deref(), "stored session confirmed");
            BootstrapOutcome::Authenticated(user)
        }
        Ok(user) => {
            warn!(role = user.role.as_deref(), "stored session lacks admin role, clearing");
            client.store().clear();
            BootstrapOutcome::LoggedOut {
                notice: Some(AuthNotice::NoPermission),
            }
        }
        Err(e) => {
            warn!(error = %e, "could not confirm stored session, clearing");
            client.store().clear();
            BootstrapOutcome::LoggedOut {
                notice: Some(AuthNotice::SessionExpired),
            }
        }
    }
}

//! Application shell: owns the authenticated/logged-out decision
//!
//! The shell subscribes to the client's session-ended signal once, when it is
//! created, and keeps that subscription for its whole lifetime. Whenever the
//! refresh protocol gives up, the listener drops the stored session and moves
//! the shell to `LoggedOut`, whatever command was in flight.

use std::time::SystemTime;

use admin_auth::CurrentUser;
use admin_client::{ApiClient, AuthNotice, BootstrapOutcome, SessionEnded};
use common::Secret;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq)]
pub enum AuthState {
    /// Startup check has not finished
    Checking,
    Authenticated(CurrentUser),
    LoggedOut { notice: Option<AuthNotice> },
}

impl AuthState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthState::Authenticated(_))
    }
}

impl From<BootstrapOutcome> for AuthState {
    fn from(outcome: BootstrapOutcome) -> Self {
        match outcome {
            BootstrapOutcome::Authenticated(user) => AuthState::Authenticated(user),
            BootstrapOutcome::LoggedOut { notice } => AuthState::LoggedOut { notice },
        }
    }
}

pub struct Shell {
    client: ApiClient,
    state: watch::Sender<AuthState>,
    listener: JoinHandle<()>,
}

impl Shell {
    /// Create the shell in `Checking` and start the session-ended listener.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(client: ApiClient) -> Self {
        let (state, _) = watch::channel(AuthState::Checking);
        let listener = tokio::spawn(listen_for_session_end(
            client.clone(),
            client.signal().subscribe(),
            state.clone(),
        ));
        Self {
            client,
            state,
            listener,
        }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn state(&self) -> AuthState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    /// Run the startup session check and publish its outcome.
    pub async fn start(&self, now: SystemTime) -> AuthState {
        let state = AuthState::from(admin_client::bootstrap(&self.client, now).await);
        self.state.send_replace(state.clone());
        state
    }

    pub async fn login(
        &self,
        username: &str,
        password: &Secret<String>,
    ) -> admin_client::Result<CurrentUser> {
        match self.client.login(username, password).await {
            Ok(user) => {
                self.state.send_replace(AuthState::Authenticated(user.clone()));
                Ok(user)
            }
            Err(e) => {
                self.state.send_replace(AuthState::LoggedOut { notice: None });
                Err(e)
            }
        }
    }

    pub fn logout(&self) {
        self.client.logout();
        self.state.send_replace(AuthState::LoggedOut { notice: None });
    }
}

impl Drop for Shell {
    fn drop(&mut self) {
        self.listener.abort();
    }
}

async fn listen_for_session_end(
    client: ApiClient,
    mut events: broadcast::Receiver<SessionEnded>,
    state: watch::Sender<AuthState>,
) {
    loop {
        match events.recv().await {
            Ok(SessionEnded) => {}
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "session-ended listener lagged");
            }
            Err(broadcast::error::RecvError::Closed) => {
                debug!("session signal closed, listener exiting");
                return;
            }
        }

        client.store().clear();
        state.send_replace(AuthState::LoggedOut { notice: None });
        info!("session ended, returned to login");
    }
}

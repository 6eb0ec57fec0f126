//! Single-flight access-token refresh
//!
//! However many requests hit a 401 at the same time, exactly one refresh call
//! reaches the backend and every caller receives its outcome. The refresh
//! token rotates on use, so a second concurrent refresh would fail against the
//! token the first one just invalidated.
//!
//! State machine:
//! - `Idle` → `Refreshing`: the first caller flips the state under the lock,
//!   before any `.await`, and spawns the refresh task. It is the owner.
//! - `Refreshing`: later callers append a continuation and wait; no second
//!   network call is dispatched.
//! - `Refreshing` → `Idle`: the task writes the outcome to the credential
//!   store (new pair, or cleared), emits the session-ended signal on failure,
//!   then drains every continuation in FIFO order with the same outcome.
//!
//! The owner waits on a continuation like everyone else. The refresh itself
//! runs in its own task, so a caller that gives up (dropped future, timeout)
//! cannot strand the others: a continuation resolves at most once and
//! dropping its receiver only discards that one outcome.
//!
//! If the refresh task is dropped before settling (runtime shutdown, panic in
//! the refresher), the waiters are released with `Aborted` and the store is
//! left as it was. Only a refresh that actually failed ends the session.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use admin_auth::{CredentialStore, TokenKind, TokenPair};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::error::RefreshError;
use crate::signal::SessionSignal;

/// Performs the refresh exchange. Implemented over HTTP in production and by
/// in-memory fakes in tests.
///
/// Uses `Pin<Box<dyn Future>>` so the coordinator can hold `Arc<dyn TokenRefresher>`.
pub trait TokenRefresher: Send + Sync {
    fn refresh<'a>(
        &'a self,
        refresh_token: &'a str,
    ) -> Pin<Box<dyn Future<Output = admin_auth::Result<TokenPair>> + Send + 'a>>;
}

/// `TokenRefresher` calling `POST {base_url}/auth/refresh`.
pub struct HttpTokenRefresher {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTokenRefresher {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

impl TokenRefresher for HttpTokenRefresher {
    fn refresh<'a>(
        &'a self,
        refresh_token: &'a str,
    ) -> Pin<Box<dyn Future<Output = admin_auth::Result<TokenPair>> + Send + 'a>> {
        Box::pin(admin_auth::refresh_token(
            &self.client,
            &self.base_url,
            refresh_token,
        ))
    }
}

type Outcome = Result<String, RefreshError>;

/// One caller blocked on the in-flight refresh.
type Continuation = oneshot::Sender<Outcome>;

enum RefreshState {
    Idle,
    Refreshing { waiters: Vec<Continuation> },
}

struct Inner {
    state: Mutex<RefreshState>,
    store: Arc<dyn CredentialStore>,
    refresher: Arc<dyn TokenRefresher>,
    signal: SessionSignal,
}

/// Cloneable handle to one refresh gate. Construct one per credential store;
/// clones share the gate.
#[derive(Clone)]
pub struct RefreshCoordinator {
    inner: Arc<Inner>,
}

impl RefreshCoordinator {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        refresher: Arc<dyn TokenRefresher>,
        signal: SessionSignal,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(RefreshState::Idle),
                store,
                refresher,
                signal,
            }),
        }
    }

    /// Obtain a fresh access token after `rejected` was answered with 401.
    ///
    /// `rejected` is the access token the failed request carried (`None` if it
    /// carried none). If the store already holds a different token, another
    /// caller's refresh settled between this caller's dispatch and its 401, and
    /// that token is returned without starting a new episode.
    pub async fn obtain(&self, rejected: Option<&str>) -> Outcome {
        let (tx, rx) = oneshot::channel();

        let owner = {
            let mut state = self.inner.lock_state();
            match &mut *state {
                RefreshState::Refreshing { waiters } => {
                    waiters.push(tx);
                    debug!(queued = waiters.len(), "refresh in flight, waiting for its outcome");
                    false
                }
                RefreshState::Idle => {
                    if let Some(current) = self.inner.store.get(TokenKind::Access)
                        && rejected != Some(current.as_str())
                    {
                        debug!("access token already rotated, skipping refresh");
                        return Ok(current);
                    }
                    *state = RefreshState::Refreshing { waiters: vec![tx] };
                    true
                }
            }
        };

        if owner {
            // created outside the task so an unpolled task still releases the gate
            let guard = SettleGuard::new(self.inner.clone());
            tokio::spawn(async move {
                let outcome = guard.inner.run_refresh().await;
                guard.settle(outcome);
            });
        }

        rx.await.unwrap_or(Err(RefreshError::Aborted))
    }

    /// Whether a refresh episode is outstanding.
    pub fn is_refreshing(&self) -> bool {
        matches!(*self.inner.lock_state(), RefreshState::Refreshing { .. })
    }

    /// Number of callers waiting on the outstanding episode (owner included).
    pub fn pending(&self) -> usize {
        match &*self.inner.lock_state() {
            RefreshState::Idle => 0,
            RefreshState::Refreshing { waiters } => waiters.len(),
        }
    }
}

impl Inner {
    fn lock_state(&self) -> MutexGuard<'_, RefreshState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The network half of an episode. Never touches the state.
    async fn run_refresh(&self) -> Result<TokenPair, RefreshError> {
        let Some(refresh) = self.store.get(TokenKind::Refresh) else {
            warn!("no refresh token stored, ending session without a refresh call");
            return Err(RefreshError::MissingRefreshToken);
        };

        info!("access token rejected, refreshing");
        self.refresher
            .refresh(&refresh)
            .await
            .map_err(RefreshError::from)
    }

    /// Apply the outcome, then release every waiter with it.
    fn settle(&self, outcome: Result<TokenPair, RefreshError>) {
        let outcome = match outcome {
            Ok(pair) => {
                self.store.set_pair(&pair);
                crate::metrics::record_refresh("success");
                info!("token refresh succeeded");
                Ok(pair.access_token)
            }
            Err(e) => {
                self.store.clear();
                crate::metrics::record_refresh(match e {
                    RefreshError::MissingRefreshToken => "missing_refresh_token",
                    _ => "failure",
                });
                warn!(error = %e, "token refresh failed, credentials cleared");
                self.signal.emit();
                Err(e)
            }
        };

        self.release(outcome);
    }

    /// Release the waiters of an episode that never produced an outcome.
    /// Credentials and the session-ended signal are left untouched.
    fn abandon(&self) {
        crate::metrics::record_refresh("aborted");
        warn!("token refresh stopped before settling, session left as is");
        self.release(Err(RefreshError::Aborted));
    }

    fn release(&self, outcome: Outcome) {
        let waiters = match std::mem::replace(&mut *self.lock_state(), RefreshState::Idle) {
            RefreshState::Refreshing { waiters } => waiters,
            RefreshState::Idle => Vec::new(),
        };
        debug!(waiters = waiters.len(), "draining refresh waiters");
        for waiter in waiters {
            // receiver gone means that caller stopped waiting
            let _ = waiter.send(outcome.clone());
        }
    }
}

/// Closes the episode exactly once: `settle` on completion, `abandon` if the
/// refresh task is dropped first.
struct SettleGuard {
    inner: Arc<Inner>,
    settled: bool,
}

impl SettleGuard {
    fn new(inner: Arc<Inner>) -> Self {
        Self {
            inner,
            settled: false,
        }
    }

    fn settle(mut self, outcome: Result<TokenPair, RefreshError>) {
        self.settled = true;
        self.inner.settle(outcome);
    }
}

impl Drop for SettleGuard {
    fn drop(&mut self) {
        if !self.settled {
            self.inner.abandon();
        }
    }
}

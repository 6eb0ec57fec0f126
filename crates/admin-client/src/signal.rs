//! Session-ended broadcast
//!
//! The refresh coordinator emits, the application shell subscribes once at
//! startup.
//! The event carries no payload. Observers must tolerate repeats; emission
//! with no live subscriber is not an error.

use tokio::sync::broadcast;
use tracing::{debug, warn};

use admin_auth::SESSION_ENDED_EVENT;

/// Capacity of the broadcast buffer. Events are identical, so a lagging
/// observer losing some of them still learns the session ended.
const CHANNEL_CAPACITY: usize = 16;

/// The current credential set is permanently invalid; return to login.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionEnded;

/// Cloneable handle to one session-ended channel.
#[derive(Debug, Clone)]
pub struct SessionSignal {
    tx: broadcast::Sender<SessionEnded>,
}

impl SessionSignal {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Register an observer. Only events emitted after this call are seen.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEnded> {
        self.tx.subscribe()
    }

    /// Broadcast `SessionEnded` to every current observer.
    pub fn emit(&self) {
        crate::metrics::record_session_ended();
        match self.tx.send(SessionEnded) {
            Ok(observers) => debug!(event = SESSION_ENDED_EVENT, observers, "session ended"),
            Err(_) => warn!(event = SESSION_ENDED_EVENT, "session ended with no observer"),
        }
    }
}

impl Default for SessionSignal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::broadcast::error::TryRecvError;

    #[tokio::test]
    async fn every_observer_sees_the_event() {
        let signal = SessionSignal::new();
        let mut shell = signal.subscribe();
        let mut other = signal.subscribe();

        signal.emit();

        assert_eq!(shell.recv().await.unwrap(), SessionEnded);
        assert_eq!(other.recv().await.unwrap(), SessionEnded);
        assert_eq!(shell.try_recv(), Err(TryRecvError::Empty));
    }

    #[test]
    fn emit_without_observers_is_fine() {
        SessionSignal::new().emit();
    }

    #[tokio::test]
    async fn clones_share_the_channel() {
        let signal = SessionSignal::new();
        let mut rx = signal.subscribe();
        signal.clone().emit();
        assert_eq!(rx.recv().await.unwrap(), SessionEnded);
    }

    #[tokio::test]
    async fn late_subscriber_misses_earlier_events() {
        let signal = SessionSignal::new();
        signal.emit();
        let mut rx = signal.subscribe();
        assert_eq!(rx.try_recv(), Err(TryRecvError::Empty));
    }
}

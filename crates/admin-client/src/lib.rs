//! Authenticated client for the Aratiri middleware admin API
//!
//! Wraps every admin call in the token refresh protocol so views never handle
//! an expired session themselves:
//! 1. Requests carry the stored access token as a bearer credential
//! 2. A 401 hands control to the `RefreshCoordinator`; concurrent 401s share a
//!    single refresh exchange and are retried once with the new token
//! 3. A refresh that cannot succeed clears the stored session and raises the
//!    session-ended signal exactly once; every waiting call fails alike
//! 4. At startup `bootstrap` decides whether the stored session is still
//!    usable before any view loads

pub mod admin;
pub mod bootstrap;
pub mod client;
pub mod error;
pub mod metrics;
pub mod models;
pub mod refresh;
pub mod signal;

pub use admin::recommended_nodes;
pub use bootstrap::{AuthNotice, BootstrapOutcome, bootstrap};
pub use client::{ApiClient, REQUEST_ID_HEADER, RequestOptions};
pub use error::{Error, RefreshError, Result};
pub use models::{
    Chain, Channel, NewAddress, NodeInfo, OpenChannelRequest, Peer, RemoteNode, WalletBalance,
};
pub use refresh::{HttpTokenRefresher, RefreshCoordinator, TokenRefresher};
pub use signal::{SessionEnded, SessionSignal};

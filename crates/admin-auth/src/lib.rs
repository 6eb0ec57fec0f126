//! Credential handling for the Aratiri admin console
//!
//! Owns everything that touches the bearer tokens themselves: the persisted
//! access/refresh slots, the unverified expiry decoder, and the wire types
//! and refresh call of the backend's `/auth` endpoints. The request pipeline
//! and the single-flight refresh protocol live in `admin-client`; this crate
//! has no notion of concurrent callers.
//!
//! Token lifecycle:
//! 1. Login stores a `TokenPair` via `CredentialStore::set_pair()`
//! 2. Bootstrap checks `session::decode()` before trusting a stored token
//! 3. On a 401 the coordinator calls `token::refresh_token()` once
//! 4. The rotated pair replaces the old one, or `CredentialStore::clear()` runs

pub mod constants;
pub mod credentials;
pub mod error;
pub mod session;
pub mod token;

pub use constants::*;
pub use credentials::{CredentialStore, FileCredentialStore, MemoryCredentialStore, TokenKind};
pub use error::{Error, Result};
pub use session::{Claims, decode};
pub use token::{CurrentUser, LoginRequest, RefreshRequest, TokenPair, endpoint_url, refresh_token};

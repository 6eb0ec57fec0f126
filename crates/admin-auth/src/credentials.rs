//! Credential storage for the access/refresh token pair
//!
//! Two independent string slots keyed by `ACCESS_TOKEN_KEY` and
//! `REFRESH_TOKEN_KEY`. Either may be absent; absence is the normal logged-out
//! state, not a fault. Only login, the refresh coordinator and explicit logout
//! write these slots.
//!
//! `FileCredentialStore` keeps the slots in a JSON file so a session survives
//! restarts of the console. Storage faults are logged and read back as
//! absence; none of the store operations return an error.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};

use crate::constants::{ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY};
use crate::token::TokenPair;

/// Which of the two persisted tokens a store operation addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    /// Fixed storage key for this slot.
    pub fn storage_key(self) -> &'static str {
        match self {
            TokenKind::Access => ACCESS_TOKEN_KEY,
            TokenKind::Refresh => REFRESH_TOKEN_KEY,
        }
    }
}

/// Key-value access to the persisted token slots.
///
/// Implementations must be cheap to call from the request path: the API
/// client reads the access token on every request.
pub trait CredentialStore: Send + Sync {
    fn get(&self, kind: TokenKind) -> Option<String>;

    fn set(&self, kind: TokenKind, value: &str);

    /// Remove both slots unconditionally.
    fn clear(&self);

    /// Store a freshly issued pair (login or successful refresh).
    fn set_pair(&self, pair: &TokenPair) {
        self.set(TokenKind::Access, &pair.access_token);
        self.set(TokenKind::Refresh, &pair.refresh_token);
    }
}

/// In-memory store. Nothing outlives the process.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    slots: Mutex<HashMap<TokenKind, String>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with the given slots, for tests and one-shot sessions.
    pub fn with_tokens(access: Option<&str>, refresh: Option<&str>) -> Self {
        let store = Self::new();
        if let Some(access) = access {
            store.set(TokenKind::Access, access);
        }
        if let Some(refresh) = refresh {
            store.set(TokenKind::Refresh, refresh);
        }
        store
    }

    fn slots(&self) -> MutexGuard<'_, HashMap<TokenKind, String>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self, kind: TokenKind) -> Option<String> {
        self.slots().get(&kind).cloned()
    }

    fn set(&self, kind: TokenKind, value: &str) {
        self.slots().insert(kind, value.to_owned());
    }

    fn clear(&self) {
        self.slots().clear();
    }
}

/// File-backed store holding `{ "<storage key>": "<token>" }`.
///
/// The whole map is held in memory behind a Mutex; every mutation rewrites the
/// file atomically while the lock is held, so concurrent writers cannot
/// interleave partial files.
pub struct FileCredentialStore {
    path: PathBuf,
    state: Mutex<HashMap<String, String>>,
}

impl FileCredentialStore {
    /// Open the store at `path`.
    ///
    /// A missing file is a logged-out session. An unreadable or corrupt file
    /// is logged and treated the same way; the next write replaces it.
    pub fn open(path: PathBuf) -> Self {
        let state = match std::fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<HashMap<String, String>>(&contents) {
                Ok(slots) => {
                    info!(path = %path.display(), slots = slots.len(), "loaded stored credentials");
                    slots
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "credential file is corrupt, treating as logged out");
                    HashMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no credential file, starting logged out");
                HashMap::new()
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "credential file unreadable, treating as logged out");
                HashMap::new()
            }
        };

        Self {
            path,
            state: Mutex::new(state),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn state(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist(&self, state: &HashMap<String, String>) {
        if let Err(e) = write_atomic(&self.path, state) {
            warn!(path = %self.path.display(), error = %e, "failed to persist credentials");
        }
    }
}

impl CredentialStore for FileCredentialStore {
    fn get(&self, kind: TokenKind) -> Option<String> {
        self.state().get(kind.storage_key()).cloned()
    }

    fn set(&self, kind: TokenKind, value: &str) {
        let mut state = self.state();
        state.insert(kind.storage_key().to_owned(), value.to_owned());
        debug!(slot = kind.storage_key(), "stored token");
        self.persist(&state);
    }

    fn clear(&self) {
        let mut state = self.state();
        state.remove(ACCESS_TOKEN_KEY);
        state.remove(REFRESH_TOKEN_KEY);
        debug!("cleared stored tokens");
        self.persist(&state);
    }

    fn set_pair(&self, pair: &TokenPair) {
        // One write for both slots so a crash cannot leave a mixed pair.
        let mut state = self.state();
        state.insert(ACCESS_TOKEN_KEY.to_owned(), pair.access_token.clone());
        state.insert(REFRESH_TOKEN_KEY.to_owned(), pair.refresh_token.clone());
        debug!("stored token pair");
        self.persist(&state);
    }
}

/// Write the slot map to `path` atomically with 0600 permissions.
fn write_atomic(path: &Path, data: &HashMap<String, String>) -> std::io::Result<()> {
    let json = serde_json::to_string_pretty(data).map_err(std::io::Error::other)?;

    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;
    let tmp_path = dir.join(format!(".credentials.tmp.{}", std::process::id()));

    std::fs::write(&tmp_path, json.as_bytes())?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&tmp_path, std::fs::Permissions::from_mode(0o600))?;
    }

    std::fs::rename(&tmp_path, path)?;
    debug!(path = %path.display(), "persisted credentials");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(suffix: &str) -> TokenPair {
        TokenPair {
            access_token: format!("at_{suffix}"),
            refresh_token: format!("rt_{suffix}"),
        }
    }

    #[test]
    fn memory_store_starts_empty() {
        let store = MemoryCredentialStore::new();
        assert_eq!(store.get(TokenKind::Access), None);
        assert_eq!(store.get(TokenKind::Refresh), None);
    }

    #[test]
    fn memory_store_slots_are_independent() {
        let store = MemoryCredentialStore::with_tokens(None, Some("rt_only"));
        assert_eq!(store.get(TokenKind::Access), None);
        assert_eq!(store.get(TokenKind::Refresh).as_deref(), Some("rt_only"));

        store.set(TokenKind::Access, "at_new");
        assert_eq!(store.get(TokenKind::Access).as_deref(), Some("at_new"));
        assert_eq!(store.get(TokenKind::Refresh).as_deref(), Some("rt_only"));
    }

    #[test]
    fn clear_removes_both_slots() {
        let store = MemoryCredentialStore::new();
        store.set_pair(&pair("1"));
        store.clear();
        assert_eq!(store.get(TokenKind::Access), None);
        assert_eq!(store.get(TokenKind::Refresh), None);

        // clearing an empty store is fine
        store.clear();
    }

    #[test]
    fn storage_keys_are_fixed() {
        assert_eq!(TokenKind::Access.storage_key(), "aratiri_accessToken");
        assert_eq!(TokenKind::Refresh.storage_key(), "aratiri_refreshToken");
    }

    #[test]
    fn file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        let store = FileCredentialStore::open(path.clone());
        store.set_pair(&pair("1"));

        let reopened = FileCredentialStore::open(path.clone());
        assert_eq!(reopened.get(TokenKind::Access).as_deref(), Some("at_1"));
        assert_eq!(reopened.get(TokenKind::Refresh).as_deref(), Some("rt_1"));

        let contents = std::fs::read_to_string(&path).unwrap();
        let raw: HashMap<String, String> = serde_json::from_str(&contents).unwrap();
        assert_eq!(raw["aratiri_accessToken"], "at_1");
        assert_eq!(raw["aratiri_refreshToken"], "rt_1");
    }

    #[test]
    fn file_store_missing_file_is_logged_out() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        let store = FileCredentialStore::open(path.clone());
        assert_eq!(store.get(TokenKind::Access), None);
        assert!(!path.exists(), "opening must not create the file");
    }

    #[test]
    fn file_store_corrupt_file_is_logged_out() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "not json {{").unwrap();

        let store = FileCredentialStore::open(path.clone());
        assert_eq!(store.get(TokenKind::Refresh), None);

        // next write replaces the corrupt file
        store.set(TokenKind::Access, "at_fresh");
        let reopened = FileCredentialStore::open(path);
        assert_eq!(reopened.get(TokenKind::Access).as_deref(), Some("at_fresh"));
    }

    #[test]
    fn file_store_clear_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        let store = FileCredentialStore::open(path.clone());
        store.set_pair(&pair("1"));
        store.clear();

        let reopened = FileCredentialStore::open(path);
        assert_eq!(reopened.get(TokenKind::Access), None);
        assert_eq!(reopened.get(TokenKind::Refresh), None);
    }

    #[test]
    fn file_store_write_failure_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "").unwrap();

        let store = FileCredentialStore::open(blocker.join("session.json"));
        store.set(TokenKind::Access, "at_1");
        // in-memory view still reflects the write
        assert_eq!(store.get(TokenKind::Access).as_deref(), Some("at_1"));
    }

    #[test]
    fn file_store_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");

        let store = FileCredentialStore::open(path.clone());
        store.set_pair(&pair("1"));

        assert!(path.exists());
    }

    #[cfg(unix)]
    #[test]
    fn file_permissions_are_0600() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        let store = FileCredentialStore::open(path.clone());
        store.set_pair(&pair("1"));

        let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600, "credential file must be 0600, got {mode:o}");
    }

    #[test]
    fn concurrent_writes_dont_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let store = std::sync::Arc::new(FileCredentialStore::open(path.clone()));

        let handles: Vec<_> = (0..10)
            .map(|i| {
                let store = store.clone();
                std::thread::spawn(move || store.set_pair(&pair(&i.to_string())))
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let contents = std::fs::read_to_string(&path).unwrap();
        let raw: HashMap<String, String> = serde_json::from_str(&contents).unwrap();
        assert_eq!(raw.len(), 2);
        // both slots come from the same write
        let access = raw["aratiri_accessToken"].trim_start_matches("at_");
        let refresh = raw["aratiri_refreshToken"].trim_start_matches("rt_");
        assert_eq!(access, refresh);
    }
}

//! Persisted session state and its on-disk store.
//!
//! `SessionState` is the single record the credential chain mutates: two
//! scraped API keys, the subject token, and the bearer access token with its
//! expiry. `SessionStore` owns the storage directory and performs atomic
//! load/save of that record; the cookie jar lives in a sibling file managed
//! by [`super::PersistentJar`].

use std::fmt;
use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::error::StoreError;
use crate::constants::{COOKIE_FILE, SESSION_FILE};

/// Cached outputs of the credential chain, persisted as a single JSON record.
///
/// Each field is derived lazily and invalidated independently; clearing the
/// subject token never cascades into the access token or the keys. The
/// access token is only usable while `access_token_expiry` is present and in
/// the future; an expired or absent expiry invalidates it even when the
/// string itself is still cached.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    /// API key scraped from the landing page; sent as `x-api-key` on the
    /// subject token request.
    pub api_key: Option<String>,
    /// Client API key scraped from the landing page; used as the Bearer
    /// credential on the access token exchange.
    pub client_api_key: Option<String>,
    /// Opaque subject (identity) token. Cached indefinitely: upstream never
    /// declares a TTL, and staleness is only detected when the bearer
    /// exchange rejects it.
    pub token: Option<String>,
    /// Short-lived bearer access token (sensitive, never log).
    pub access_token: Option<String>,
    /// Server-declared expiry of `access_token`, UTC.
    pub access_token_expiry: Option<DateTime<Utc>>,
}

impl SessionState {
    /// Returns true when a cached access token exists and is still valid at
    /// `now`.
    #[must_use]
    pub fn has_valid_access_token(&self, now: DateTime<Utc>) -> bool {
        self.access_token.is_some() && self.access_token_expiry.is_some_and(|expiry| now < expiry)
    }
}

// Custom Debug impl that redacts token values.
impl fmt::Debug for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn redact(value: &Option<String>) -> &'static str {
            if value.is_some() { "[REDACTED]" } else { "None" }
        }
        f.debug_struct("SessionState")
            .field("api_key", &self.api_key)
            .field("client_api_key", &self.client_api_key)
            .field("token", &redact(&self.token))
            .field("access_token", &redact(&self.access_token))
            .field("access_token_expiry", &self.access_token_expiry)
            .finish()
    }
}

/// Durable store for [`SessionState`] under an explicit directory.
///
/// The directory is a constructor parameter; there is no process-global
/// configuration. Both the state file and the cookie file live directly
/// under it.
#[derive(Debug, Clone)]
pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    /// Creates a store rooted at `dir`. The directory is created on first save.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the JSON session state file.
    #[must_use]
    pub fn state_path(&self) -> PathBuf {
        self.dir.join(SESSION_FILE)
    }

    /// Path of the Netscape-format cookie file.
    #[must_use]
    pub fn cookie_path(&self) -> PathBuf {
        self.dir.join(COOKIE_FILE)
    }

    /// Loads the persisted state, returning a fresh empty state when no file
    /// exists yet.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] when the file exists but cannot be read,
    /// or [`StoreError::Corrupt`] when it does not parse.
    #[instrument(level = "debug", skip(self))]
    pub fn load(&self) -> Result<SessionState, StoreError> {
        let path = self.state_path();
        if !path.exists() {
            debug!(path = %path.display(), "no session state file, starting empty");
            return Ok(SessionState::default());
        }
        let content = fs::read_to_string(&path).map_err(|e| StoreError::io(&path, e))?;
        let state = serde_json::from_str(&content).map_err(|e| StoreError::corrupt(&path, e))?;
        debug!(path = %path.display(), "loaded session state");
        Ok(state)
    }

    /// Saves the state with an atomic overwrite (write to a temp file in the
    /// same directory, then rename over the target).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] on any filesystem failure.
    #[instrument(level = "debug", skip_all)]
    pub fn save(&self, state: &SessionState) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir).map_err(|e| StoreError::io(&self.dir, e))?;
        let path = self.state_path();
        let tmp = path.with_extension("json.tmp");
        // Serialization of this plain record cannot fail; map defensively anyway.
        let content = serde_json::to_string(state).map_err(|e| StoreError::corrupt(&path, e))?;
        fs::write(&tmp, content).map_err(|e| StoreError::io(&tmp, e))?;
        fs::rename(&tmp, &path).map_err(|e| StoreError::io(&path, e))?;
        debug!(path = %path.display(), "saved session state");
        Ok(())
    }

    /// Removes the state file and the cookie file. Missing files are not an
    /// error; reset of a fresh store is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] when an existing file cannot be removed.
    #[instrument(level = "debug", skip(self))]
    pub fn reset(&self) -> Result<(), StoreError> {
        for path in [self.state_path(), self.cookie_path()] {
            match fs::remove_file(&path) {
                Ok(()) => debug!(path = %path.display(), "removed"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(StoreError::io(&path, e)),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempfile::TempDir;

    fn sample_state() -> SessionState {
        SessionState {
            api_key: Some("key-1".to_string()),
            client_api_key: Some("ckey-2".to_string()),
            token: Some("subject-token".to_string()),
            access_token: Some("bearer-token".to_string()),
            access_token_expiry: Some(Utc::now() + Duration::hours(1)),
        }
    }

    #[test]
    fn test_load_missing_file_returns_empty_state() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::new(dir.path());
        let state = store.load().unwrap();
        assert_eq!(state, SessionState::default());
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::new(dir.path());
        let state = sample_state();
        store.save(&state).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded, state);
    }

    #[test]
    fn test_save_creates_directory() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a").join("b");
        let store = SessionStore::new(&nested);
        store.save(&SessionState::default()).unwrap();
        assert!(nested.join(SESSION_FILE).exists());
    }

    #[test]
    fn test_save_leaves_no_temp_file() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::new(dir.path());
        store.save(&sample_state()).unwrap();
        store.save(&SessionState::default()).unwrap();

        let entries: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries.len(), 1, "only the state file: {entries:?}");
    }

    #[test]
    fn test_load_corrupt_file_is_error() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::new(dir.path());
        fs::write(store.state_path(), "not json at all").unwrap();

        let result = store.load();
        assert!(matches!(result, Err(StoreError::Corrupt { .. })));
    }

    #[test]
    fn test_reset_removes_files_and_tolerates_missing() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::new(dir.path());
        store.save(&sample_state()).unwrap();
        fs::write(store.cookie_path(), "# Netscape HTTP Cookie File\n").unwrap();

        store.reset().unwrap();
        assert!(!store.state_path().exists());
        assert!(!store.cookie_path().exists());

        // Second reset is a no-op
        store.reset().unwrap();
    }

    #[test]
    fn test_expiry_serialized_as_iso8601() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::new(dir.path());
        store.save(&sample_state()).unwrap();

        let raw = fs::read_to_string(store.state_path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        let expiry = value["access_token_expiry"].as_str().unwrap();
        assert!(expiry.contains('T'), "ISO-8601 timestamp: {expiry}");
    }

    #[test]
    fn test_access_token_validity_requires_future_expiry() {
        let now = Utc::now();
        let mut state = sample_state();
        assert!(state.has_valid_access_token(now));

        state.access_token_expiry = Some(now - Duration::seconds(1));
        assert!(!state.has_valid_access_token(now));

        state.access_token_expiry = None;
        assert!(!state.has_valid_access_token(now));

        state = SessionState {
            access_token_expiry: Some(now + Duration::hours(1)),
            ..SessionState::default()
        };
        assert!(!state.has_valid_access_token(now), "no token string");
    }

    #[test]
    fn test_debug_redacts_tokens() {
        let state = sample_state();
        let debug = format!("{state:?}");
        assert!(!debug.contains("subject-token"), "must not leak token: {debug}");
        assert!(!debug.contains("bearer-token"), "must not leak access token: {debug}");
        assert!(debug.contains("[REDACTED]"));
    }
}

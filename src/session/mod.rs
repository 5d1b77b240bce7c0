//! MLB.tv session facade.
//!
//! Composes the four credential stages (cookie login, API key scraping,
//! subject token issuance, bearer token exchange) behind explicit async
//! methods. Every getter that may touch the network returns a `Result`;
//! there is no implicit property access with hidden I/O.
//!
//! All mutation of the cached [`SessionState`] and the follow-up persist
//! happen under one `tokio::sync::Mutex` scoped to the session instance, so
//! concurrent callers cannot interleave a token invalidation with a cache
//! read.

mod error;
mod keys;
mod login;
mod token;

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use reqwest::{Client, RequestBuilder};
use tokio::sync::Mutex;
use tracing::{debug, instrument};

use crate::constants::{
    DEFAULT_ACCESS_TOKEN_URL, DEFAULT_API_KEY_URL, DEFAULT_AUTH_REFERER_URL, DEFAULT_AUTH_URL,
    DEFAULT_LOGIN_CHECK_URL, DEFAULT_TOKEN_URL, USER_AGENT,
};
use crate::store::{PersistentJar, SessionState, SessionStore};

pub use error::SessionError;

/// Login credentials for the identity endpoint.
///
/// The password is redacted in Debug output.
#[derive(Clone)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    /// Creates credentials from a username (email address) and password.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// The account email address.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// The five upstream endpoints the chain talks to.
///
/// `Default` is the production MLB.tv deployment; tests point every
/// endpoint at a mock server via [`Endpoints::with_base_url`].
#[derive(Debug, Clone)]
pub struct Endpoints {
    /// Credential form POST target.
    pub auth_url: String,
    /// Referer header value the auth endpoint expects.
    pub auth_referer_url: String,
    /// Authenticated-only page used for the login check.
    pub login_check_url: String,
    /// Landing page scraped for API keys.
    pub api_key_url: String,
    /// Subject token endpoint (query parameters appended at call time).
    pub token_url: String,
    /// Bearer access token exchange endpoint.
    pub access_token_url: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            auth_url: DEFAULT_AUTH_URL.to_string(),
            auth_referer_url: DEFAULT_AUTH_REFERER_URL.to_string(),
            login_check_url: DEFAULT_LOGIN_CHECK_URL.to_string(),
            api_key_url: DEFAULT_API_KEY_URL.to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
            access_token_url: DEFAULT_ACCESS_TOKEN_URL.to_string(),
        }
    }
}

impl Endpoints {
    /// Builds an endpoint set rooted at a single base URL, mirroring the
    /// production path layout. Intended for tests against a mock server.
    #[must_use]
    pub fn with_base_url(base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        Self {
            auth_url: format!("{base}/authenticate.do"),
            auth_referer_url: format!("{base}/enterworkflow.do?flowId=registration.wizard&c_id=mlb"),
            login_check_url: format!("{base}/enterworkflow.do?flowId=registration.newsletter&c_id=mlb"),
            api_key_url: format!("{base}/tv/g490865/"),
            token_url: format!("{base}/jwt"),
            access_token_url: format!("{base}/token"),
        }
    }
}

/// Authenticated MLB.tv session.
///
/// Owns the HTTP client (whose cookie provider is the persistent jar), the
/// durable stores, and the cached credential state. Collaborators that need
/// authenticated requests beyond the token chain use [`Session::get`] /
/// [`Session::post`], which attach the same cookies and User-Agent as the
/// login flow.
pub struct Session {
    http: Client,
    jar: Arc<PersistentJar>,
    store: SessionStore,
    endpoints: Endpoints,
    credentials: Credentials,
    state: Mutex<SessionState>,
}

impl Session {
    /// Creates a session against the production endpoints, loading any
    /// previously persisted state and cookies from `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Store`] when existing state or cookie files
    /// cannot be read.
    pub fn new(
        credentials: Credentials,
        dir: impl AsRef<Path> + std::fmt::Debug,
    ) -> Result<Self, SessionError> {
        Self::with_endpoints(credentials, dir, Endpoints::default())
    }

    /// Creates a session with explicit endpoints (mock servers in tests).
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Store`] when existing state or cookie files
    /// cannot be read.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails with the static
    /// configuration. This should never happen in practice.
    #[allow(clippy::expect_used)]
    #[instrument(level = "debug", skip(credentials), fields(username = %credentials.username()))]
    pub fn with_endpoints(
        credentials: Credentials,
        dir: impl AsRef<Path> + std::fmt::Debug,
        endpoints: Endpoints,
    ) -> Result<Self, SessionError> {
        let store = SessionStore::new(dir.as_ref());
        let jar = Arc::new(PersistentJar::load(&store.cookie_path())?);
        let state = store.load()?;
        debug!(cookies = jar.len(), "session state loaded");

        let http = Client::builder()
            .user_agent(USER_AGENT)
            .gzip(true)
            .cookie_provider(Arc::clone(&jar))
            .build()
            .expect("failed to build HTTP client with static configuration");

        Ok(Self {
            http,
            jar,
            store,
            endpoints,
            credentials,
            state: Mutex::new(state),
        })
    }

    /// Creates a session and logs in immediately.
    ///
    /// # Errors
    ///
    /// Returns any [`SessionError`] from construction or from
    /// [`Session::login`].
    pub async fn connect(
        credentials: Credentials,
        dir: impl AsRef<Path> + std::fmt::Debug,
    ) -> Result<Self, SessionError> {
        let session = Self::new(credentials, dir)?;
        session.login().await?;
        Ok(session)
    }

    /// Clears both persisted stores and the in-memory cache. A session
    /// constructed afterwards over the same directory starts from scratch;
    /// used for forced re-authentication.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Store`] when an existing file cannot be
    /// removed.
    #[instrument(level = "debug", skip(self))]
    pub async fn destroy(&self) -> Result<(), SessionError> {
        let mut state = self.state.lock().await;
        self.jar.clear();
        self.store.reset()?;
        *state = SessionState::default();
        debug!("session destroyed");
        Ok(())
    }

    /// Starts an authenticated GET request through the session's client.
    #[must_use]
    pub fn get(&self, url: &str) -> RequestBuilder {
        self.http.get(url)
    }

    /// Starts an authenticated POST request through the session's client.
    #[must_use]
    pub fn post(&self, url: &str) -> RequestBuilder {
        self.http.post(url)
    }

    /// Returns a reference to the underlying HTTP client.
    ///
    /// This can be used for verbs not covered by the narrow facade surface.
    #[must_use]
    pub fn http(&self) -> &Client {
        &self.http
    }

    /// Snapshot of the cached state, for status display.
    pub async fn state(&self) -> SessionState {
        self.state.lock().await.clone()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("credentials", &self.credentials)
            .field("endpoints", &self.endpoints)
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_endpoints_are_production() {
        let endpoints = Endpoints::default();
        assert!(endpoints.auth_url.contains("securea.mlb.com"));
        assert!(endpoints.token_url.contains("media-entitlement.mlb.com"));
        assert!(endpoints.access_token_url.contains("edge.bamgrid.com"));
    }

    #[test]
    fn test_with_base_url_roots_every_endpoint() {
        let endpoints = Endpoints::with_base_url("http://127.0.0.1:9999/");
        for url in [
            &endpoints.auth_url,
            &endpoints.auth_referer_url,
            &endpoints.login_check_url,
            &endpoints.api_key_url,
            &endpoints.token_url,
            &endpoints.access_token_url,
        ] {
            assert!(
                url.starts_with("http://127.0.0.1:9999/"),
                "not rooted: {url}"
            );
            assert!(!url.contains("//authenticate"), "double slash: {url}");
        }
    }

    #[test]
    fn test_credentials_debug_redacts_password() {
        let credentials = Credentials::new("user@example.com", "hunter2");
        let debug = format!("{credentials:?}");
        assert!(!debug.contains("hunter2"), "must not leak password: {debug}");
        assert!(debug.contains("[REDACTED]"));
        assert!(debug.contains("user@example.com"));
    }
}

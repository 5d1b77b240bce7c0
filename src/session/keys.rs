//! API key scraping: the second stage of the credential chain.
//!
//! The landing page embeds both keys as string literals inside inline
//! `<script>` blocks. Extraction is regex-based: scan every script block and
//! take the first occurrence of each literal. Keys are cached in the session
//! state and only re-scraped after an explicit invalidation.

use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info, instrument};

use super::{Session, SessionError};
use crate::store::SessionState;

#[allow(clippy::expect_used)]
static SCRIPT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<script[^>]*>(.*?)</script>").expect("script regex is valid")
});

#[allow(clippy::expect_used)]
static API_KEY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""apiKey":"([^"]+)""#).expect("apiKey regex is valid"));

#[allow(clippy::expect_used)]
static CLIENT_API_KEY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""clientApiKey":"([^"]+)""#).expect("clientApiKey regex is valid")
});

impl Session {
    /// Returns the cached API key pair, scraping the landing page first when
    /// either key is missing.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::KeyExtraction`] when a key literal is absent
    /// from every script block, [`SessionError::Network`] on transport
    /// failure, and [`SessionError::Store`] when persisting fails.
    pub async fn api_keys(&self) -> Result<(String, String), SessionError> {
        let mut state = self.state.lock().await;
        self.ensure_api_keys(&mut state).await
    }

    /// Re-scrapes the landing page unconditionally, replacing any cached
    /// keys. Needs no login state.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`Session::api_keys`].
    pub async fn update_api_keys(&self) -> Result<(String, String), SessionError> {
        let mut state = self.state.lock().await;
        let (api_key, client_api_key) = self.fetch_api_keys().await?;
        state.api_key = Some(api_key.clone());
        state.client_api_key = Some(client_api_key.clone());
        self.store.save(&state)?;
        Ok((api_key, client_api_key))
    }

    /// Ensures both keys are present in `state`, fetching and persisting
    /// when needed. Callers already hold the state lock.
    pub(super) async fn ensure_api_keys(
        &self,
        state: &mut SessionState,
    ) -> Result<(String, String), SessionError> {
        if let (Some(api_key), Some(client_api_key)) = (&state.api_key, &state.client_api_key) {
            debug!("using cached API keys");
            return Ok((api_key.clone(), client_api_key.clone()));
        }

        let (api_key, client_api_key) = self.fetch_api_keys().await?;
        state.api_key = Some(api_key.clone());
        state.client_api_key = Some(client_api_key.clone());
        self.store.save(state)?;
        Ok((api_key, client_api_key))
    }

    /// Fetches the landing page and extracts both keys from its scripts.
    #[instrument(level = "debug", skip(self))]
    async fn fetch_api_keys(&self) -> Result<(String, String), SessionError> {
        let url = &self.endpoints.api_key_url;
        info!(url, "scraping API keys from landing page");
        let body = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| SessionError::network(url, e))?
            .text()
            .await
            .map_err(|e| SessionError::network(url, e))?;

        let keys = extract_api_keys(&body)?;
        debug!("extracted both API keys");
        Ok(keys)
    }
}

/// Scans every inline script block for the `apiKey` and `clientApiKey`
/// string literals, returning the first occurrence of each.
fn extract_api_keys(html: &str) -> Result<(String, String), SessionError> {
    let mut api_key = None;
    let mut client_api_key = None;

    for script in SCRIPT_RE.captures_iter(html) {
        let body = &script[1];
        if api_key.is_none() {
            if let Some(caps) = API_KEY_RE.captures(body) {
                api_key = Some(caps[1].to_string());
            }
        }
        if client_api_key.is_none() {
            if let Some(caps) = CLIENT_API_KEY_RE.captures(body) {
                client_api_key = Some(caps[1].to_string());
            }
        }
        if api_key.is_some() && client_api_key.is_some() {
            break;
        }
    }

    let api_key = api_key.ok_or_else(|| SessionError::key_extraction("apiKey"))?;
    let client_api_key =
        client_api_key.ok_or_else(|| SessionError::key_extraction("clientApiKey"))?;
    Ok((api_key, client_api_key))
}

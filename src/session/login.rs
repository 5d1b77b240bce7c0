//! Cookie login: the first stage of the credential chain.
//!
//! Posts the account credentials to the identity endpoint and verifies that
//! the response set the `ipid` and `fprt` cookies. Login is idempotent: when
//! the persisted cookies still authenticate an account page, the form POST
//! is skipped entirely.

use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info, instrument, warn};

use super::{Session, SessionError};

#[allow(clippy::expect_used)]
static TITLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<title[^>]*>(.*?)</title>").expect("title regex is valid")
});

/// Marker title of the unauthenticated registration page.
const LOGIN_PAGE_TITLE: &str = "Login/Register";

impl Session {
    /// Logs in with the session's credentials, skipping the form POST when
    /// the persisted cookies are still accepted upstream.
    ///
    /// On a fresh login, verifies that the identity cookies (`ipid`, `fprt`)
    /// were set, then persists the jar and state.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Authentication`] when the credentials are
    /// rejected or the identity cookies are missing from the response,
    /// [`SessionError::Network`] on transport failure, and
    /// [`SessionError::Store`] when persisting fails.
    #[instrument(level = "debug", skip(self))]
    pub async fn login(&self) -> Result<(), SessionError> {
        let state = self.state.lock().await;

        if self.is_logged_in().await? {
            debug!("already logged in, skipping authentication");
            return Ok(());
        }

        info!(username = %self.credentials.username(), "logging in");
        let response = self
            .http
            .post(&self.endpoints.auth_url)
            .header(reqwest::header::REFERER, &self.endpoints.auth_referer_url)
            .form(&[
                ("uri", "/account/login_register.jsp"),
                ("registrationAction", "identify"),
                ("emailAddress", self.credentials.username()),
                ("password", self.credentials.password.as_str()),
                ("submitButton", ""),
            ])
            .send()
            .await
            .map_err(|e| SessionError::network(&self.endpoints.auth_url, e))?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = %status, "authentication endpoint rejected the request");
            return Err(SessionError::authentication(format!(
                "authentication endpoint returned HTTP {}",
                status.as_u16()
            )));
        }

        for cookie in ["ipid", "fprt"] {
            if self.jar.value(cookie).is_none() {
                return Err(SessionError::authentication(format!(
                    "no {cookie} cookie after login, check username and password"
                )));
            }
        }

        self.jar.save(&self.store.cookie_path())?;
        self.store.save(&state)?;
        info!("login succeeded");
        Ok(())
    }

    /// Checks whether the persisted cookies still authenticate by fetching a
    /// page that only renders for logged-in accounts.
    ///
    /// A non-success status or a page titled with the login marker both mean
    /// "not logged in"; neither is an error.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Network`] on transport failure.
    #[instrument(level = "debug", skip(self))]
    pub async fn is_logged_in(&self) -> Result<bool, SessionError> {
        let url = &self.endpoints.login_check_url;
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| SessionError::network(url, e))?;

        if !response.status().is_success() {
            debug!(status = %response.status(), "login check page unavailable");
            return Ok(false);
        }

        let body = response
            .text()
            .await
            .map_err(|e| SessionError::network(url, e))?;
        let logged_in = match page_title(&body) {
            Some(title) => !title.contains(LOGIN_PAGE_TITLE),
            None => false,
        };
        debug!(logged_in, "login check complete");
        Ok(logged_in)
    }
}

/// Extracts the first `<title>` text from an HTML document.
fn page_title(html: &str) -> Option<&str> {
    TITLE_RE
        .captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
}

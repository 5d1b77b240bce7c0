//! Token stages of the credential chain: the subject (identity) token and
//! the bearer access token derived from it.
//!
//! The bearer exchange has exactly one built-in retry. When the exchange is
//! rejected with an HTTP error status, the cached subject token is assumed
//! stale, cleared, re-derived, and the exchange is attempted once more. A
//! second rejection surfaces as [`SessionError::AccessToken`]. Transport
//! errors are never retried here.

use chrono::{DateTime, Duration, Utc};
use reqwest::header::{ACCEPT, AUTHORIZATION, ORIGIN};
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use super::{Session, SessionError};
use crate::constants::{APP_NAME, BAM_SDK_VERSION, ORIGIN as ORIGIN_URL, PLATFORM};
use crate::store::SessionState;

/// Successful bearer exchange response body.
#[derive(Debug, Deserialize)]
struct AccessTokenResponse {
    access_token: String,
    expires_in: i64,
}

/// Outcome of one bearer exchange attempt. Only a status rejection triggers
/// the subject token refresh; everything else propagates immediately.
enum ExchangeFailure {
    Status(u16),
    Fatal(SessionError),
}

impl Session {
    /// Returns the subject token, deriving and persisting it when no cached
    /// value exists.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::TokenExchange`] when the token endpoint
    /// rejects the request, plus any error from the API key stage.
    pub async fn subject_token(&self) -> Result<String, SessionError> {
        let mut state = self.state.lock().await;
        self.ensure_subject_token(&mut state).await
    }

    /// Returns a valid bearer access token and its expiry, running as much
    /// of the chain as needed and retrying the exchange once after a subject
    /// token refresh.
    ///
    /// A cached token is returned without any network traffic while its
    /// expiry is in the future.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::AccessToken`] when the exchange is rejected
    /// twice, plus any error from the earlier stages.
    #[instrument(level = "debug", skip(self))]
    pub async fn access_token(&self) -> Result<(String, DateTime<Utc>), SessionError> {
        let mut state = self.state.lock().await;

        if state.has_valid_access_token(Utc::now()) {
            if let (Some(token), Some(expiry)) = (&state.access_token, state.access_token_expiry) {
                debug!("using cached access token");
                return Ok((token.clone(), expiry));
            }
        }

        let subject_token = self.ensure_subject_token(&mut state).await?;
        let client_api_key = self.ensure_api_keys(&mut state).await?.1;

        let first = self
            .request_access_token(&client_api_key, &subject_token)
            .await;
        let response = match first {
            Ok(response) => response,
            Err(ExchangeFailure::Fatal(error)) => return Err(error),
            Err(ExchangeFailure::Status(status)) => {
                warn!(status, "access token rejected, refreshing subject token");
                state.token = None;
                let subject_token = self.ensure_subject_token(&mut state).await?;
                match self
                    .request_access_token(&client_api_key, &subject_token)
                    .await
                {
                    Ok(response) => response,
                    Err(ExchangeFailure::Fatal(error)) => return Err(error),
                    Err(ExchangeFailure::Status(status)) => {
                        return Err(SessionError::access_token(status));
                    }
                }
            }
        };

        let expiry = Utc::now() + Duration::seconds(response.expires_in);
        state.access_token = Some(response.access_token.clone());
        state.access_token_expiry = Some(expiry);
        self.jar.save(&self.store.cookie_path())?;
        self.store.save(&state)?;
        info!(expiry = %expiry, "access token obtained");
        Ok((response.access_token, expiry))
    }

    /// Ensures a subject token is present in `state`, deriving one from the
    /// identity cookies and the API key when needed. Callers already hold
    /// the state lock.
    pub(super) async fn ensure_subject_token(
        &self,
        state: &mut SessionState,
    ) -> Result<String, SessionError> {
        if let Some(token) = &state.token {
            debug!("using cached subject token");
            return Ok(token.clone());
        }

        let api_key = self.ensure_api_keys(state).await?.0;

        let ipid = self
            .jar
            .value("ipid")
            .ok_or_else(|| SessionError::authentication("no ipid cookie, log in first"))?;
        let fprt = self
            .jar
            .value("fprt")
            .ok_or_else(|| SessionError::authentication("no fprt cookie, log in first"))?;

        // The fingerprint is sent with literal `==` padding appended, exactly
        // as the upstream endpoint expects it.
        let url = format!(
            "{}?ipid={ipid}&fingerprint={fprt}==&os={PLATFORM}&appname={APP_NAME}",
            self.endpoints.token_url
        );
        info!("requesting subject token");
        let response = self
            .http
            .get(&url)
            .header("x-api-key", &api_key)
            .send()
            .await
            .map_err(|e| SessionError::network(&self.endpoints.token_url, e))?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = %status, "subject token request rejected");
            return Err(SessionError::token_exchange(status.as_u16()));
        }

        let token = response
            .text()
            .await
            .map_err(|e| SessionError::network(&self.endpoints.token_url, e))?;
        state.token = Some(token.clone());
        self.store.save(state)?;
        debug!("subject token cached");
        Ok(token)
    }

    /// One bearer exchange attempt. Status rejections are reported separately
    /// from fatal errors so the caller can decide whether to retry.
    #[instrument(level = "debug", skip_all)]
    async fn request_access_token(
        &self,
        client_api_key: &str,
        subject_token: &str,
    ) -> Result<AccessTokenResponse, ExchangeFailure> {
        let url = &self.endpoints.access_token_url;
        let response = self
            .http
            .post(url)
            .header(AUTHORIZATION, format!("Bearer {client_api_key}"))
            .header(ACCEPT, "application/vnd.media-service+json; version=1")
            .header("x-bamsdk-version", BAM_SDK_VERSION)
            .header("x-bamsdk-platform", PLATFORM)
            .header(ORIGIN, ORIGIN_URL)
            .form(&[
                (
                    "grant_type",
                    "urn:ietf:params:oauth:grant-type:token-exchange",
                ),
                ("platform", "browser"),
                ("setCookie", "false"),
                ("subject_token", subject_token),
                (
                    "subject_token_type",
                    "urn:ietf:params:oauth:token-type:jwt",
                ),
            ])
            .send()
            .await
            .map_err(|e| ExchangeFailure::Fatal(SessionError::network(url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExchangeFailure::Status(status.as_u16()));
        }

        response
            .json::<AccessTokenResponse>()
            .await
            .map_err(|e| ExchangeFailure::Fatal(SessionError::network(url, e)))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_access_token_response_deserializes() {
        let body = r#"{"access_token":"bearer-abc","expires_in":86400,"token_type":"Bearer"}"#;
        let parsed: AccessTokenResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.access_token, "bearer-abc");
        assert_eq!(parsed.expires_in, 86400);
    }

    #[test]
    fn test_access_token_response_rejects_missing_expiry() {
        let body = r#"{"access_token":"bearer-abc"}"#;
        assert!(serde_json::from_str::<AccessTokenResponse>(body).is_err());
    }
}

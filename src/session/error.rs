//! Error taxonomy for the credential chain.
//!
//! Every stage fails with its own inspectable variant so callers can tell a
//! credentials problem from an upstream page change from a token rejection.
//! Nothing here is retried silently; the single bearer-exchange retry is
//! orchestrated in the session itself, and its exhaustion surfaces as
//! [`SessionError::AccessToken`].

use thiserror::Error;

use crate::store::StoreError;

/// Errors produced by the session credential chain.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Login failed: bad credentials, or the authentication endpoint did not
    /// set the identity cookies. Fatal: resubmitting the same credentials
    /// will not help.
    #[error("authentication failed: {reason}")]
    Authentication {
        /// What was missing or rejected.
        reason: String,
    },

    /// The landing page no longer carries an expected API key literal,
    /// which means the upstream page structure changed.
    #[error("API key extraction failed: {key} not found in any landing page script")]
    KeyExtraction {
        /// Name of the missing key literal (`apiKey` or `clientApiKey`).
        key: &'static str,
    },

    /// The subject token endpoint returned a non-success status.
    #[error("subject token request failed with HTTP {status}")]
    TokenExchange {
        /// The HTTP status code returned.
        status: u16,
    },

    /// The bearer exchange was rejected twice: once with the cached subject
    /// token and once with a freshly derived one.
    #[error("access token exchange failed with HTTP {status} after subject token refresh")]
    AccessToken {
        /// Status code of the final attempt.
        status: u16,
    },

    /// Transport-level error (DNS, connection reset, TLS, malformed body).
    /// Not retried at this layer; whole-session retry is the caller's call.
    #[error("network error requesting {url}: {source}")]
    Network {
        /// The URL that failed.
        url: String,
        /// The underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },

    /// Persistent storage failed; state is required for correct operation.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl SessionError {
    /// Creates an authentication failure.
    pub fn authentication(reason: impl Into<String>) -> Self {
        Self::Authentication {
            reason: reason.into(),
        }
    }

    /// Creates a key extraction failure for the named key literal.
    #[must_use]
    pub fn key_extraction(key: &'static str) -> Self {
        Self::KeyExtraction { key }
    }

    /// Creates a subject token exchange failure.
    #[must_use]
    pub fn token_exchange(status: u16) -> Self {
        Self::TokenExchange { status }
    }

    /// Creates a bearer exchange failure (after the single retry).
    #[must_use]
    pub fn access_token(status: u16) -> Self {
        Self::AccessToken { status }
    }

    /// Creates a network error with URL context.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            source,
        }
    }
}

// No `From<reqwest::Error>`: the Network variant requires URL context that
// the source error does not reliably carry, so call sites go through
// `SessionError::network` instead.

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authentication_display() {
        let error = SessionError::authentication("missing ipid cookie");
        let msg = error.to_string();
        assert!(msg.contains("authentication failed"), "got: {msg}");
        assert!(msg.contains("missing ipid cookie"), "got: {msg}");
    }

    #[test]
    fn test_key_extraction_display_names_key() {
        let error = SessionError::key_extraction("clientApiKey");
        let msg = error.to_string();
        assert!(msg.contains("clientApiKey"), "got: {msg}");
    }

    #[test]
    fn test_token_exchange_display_includes_status() {
        let error = SessionError::token_exchange(503);
        assert!(error.to_string().contains("503"));
    }

    #[test]
    fn test_access_token_display_mentions_retry() {
        let error = SessionError::access_token(401);
        let msg = error.to_string();
        assert!(msg.contains("401"), "got: {msg}");
        assert!(msg.contains("refresh"), "got: {msg}");
    }

    #[test]
    fn test_store_error_is_transparent() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let error = SessionError::from(StoreError::io("/tmp/session.json", io));
        assert!(error.to_string().contains("/tmp/session.json"));
    }
}

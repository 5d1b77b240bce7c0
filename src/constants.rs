//! Upstream protocol constants shared across the session chain.
//!
//! These mirror what the MLB.tv web player sends. Changing any of them is
//! likely to break token issuance, so they live in one place.

/// Browser User-Agent sent on every request in the chain.
///
/// The identity endpoints fingerprint the client; this UA is known to be
/// accepted for the web login flow.
pub const USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.12; rv:56.0) Gecko/20100101 Firefox/56.0.4";

/// Platform string passed as the `os` query parameter and BAM SDK platform header.
pub const PLATFORM: &str = "macintosh";

/// BAM SDK version advertised during the bearer token exchange.
pub const BAM_SDK_VERSION: &str = "3.0";

/// Application name the entitlement endpoint expects for web clients.
pub const APP_NAME: &str = "mlbtv_web";

/// Origin header required by the bearer token exchange endpoint.
pub const ORIGIN: &str = "https://www.mlb.com";

/// Credential submission endpoint (form POST).
pub const DEFAULT_AUTH_URL: &str = "https://securea.mlb.com/authenticate.do";

/// Referer the authentication endpoint expects: the registration wizard page.
pub const DEFAULT_AUTH_REFERER_URL: &str =
    "https://secure.mlb.com/enterworkflow.do?flowId=registration.wizard&c_id=mlb";

/// Authenticated-only page whose title reveals login state.
pub const DEFAULT_LOGIN_CHECK_URL: &str =
    "https://web-secure.mlb.com/enterworkflow.do?flowId=registration.newsletter&c_id=mlb";

/// Landing page carrying the `apiKey` / `clientApiKey` literals in inline scripts.
pub const DEFAULT_API_KEY_URL: &str = "https://www.mlb.com/tv/g490865/";

/// Subject (identity) token endpoint; query parameters are appended at call time.
pub const DEFAULT_TOKEN_URL: &str = "https://media-entitlement.mlb.com/jwt";

/// Bearer access token exchange endpoint.
pub const DEFAULT_ACCESS_TOKEN_URL: &str = "https://edge.bamgrid.com/token";

/// File name of the persisted session state, under the storage directory.
pub const SESSION_FILE: &str = "session.json";

/// File name of the persisted Netscape-format cookie jar.
pub const COOKIE_FILE: &str = "cookies";

//! Durable session storage: the JSON state record and the cookie jar.
//!
//! Both files live under one explicit directory passed in by the caller;
//! there is no hidden global configuration. State is saved after every
//! successful mutation of the credential chain.

mod cookies;
mod error;
mod state;

pub use cookies::{CookieRecord, PersistentJar};
pub use error::StoreError;
pub use state::{SessionState, SessionStore};

//! MLB.tv Session Library
//!
//! This library manages the credential lifecycle for the MLB.tv streaming
//! service: cookie-based login, API key scraping, subject token issuance,
//! and the bearer access token exchange that protected media requests need.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`session`] - The session facade and the four credential stages
//! - [`store`] - Durable JSON state and the Netscape-format cookie jar
//! - [`constants`] - Upstream endpoints and protocol constants
//!
//! Every credential is derived lazily and cached persistently, so a second
//! process run reuses disk state instead of repeating network round trips.

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod constants;
pub mod session;
pub mod store;

// Re-export commonly used types
pub use session::{Credentials, Endpoints, Session, SessionError};
pub use store::{PersistentJar, SessionState, SessionStore, StoreError};

//! Error types for persistent session storage.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while loading or saving session state and cookies.
///
/// Storage is required for correct operation, so these are fatal to the
/// caller; there is no silent fallback to an in-memory-only session.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem error reading or writing a store file.
    #[error("IO error accessing {path}: {source}")]
    Io {
        /// The file path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The session state file exists but does not parse as valid state.
    #[error("corrupt session state in {path}: {source}")]
    Corrupt {
        /// Path of the unreadable state file.
        path: PathBuf,
        /// The underlying deserialization error.
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    /// Creates an IO error with file context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates a corrupt-state error.
    pub fn corrupt(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Corrupt {
            path: path.into(),
            source,
        }
    }
}

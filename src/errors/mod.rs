//! Error types for lookup operations.

use thiserror::Error;

/// Result type for lookup operations.
pub type Result<T> = std::result::Result<T, LookupError>;

/// Errors that can occur while resolving a configuration key.
///
/// Only [`LookupError::Configuration`] ever escapes a lookup: bad option
/// values, a store that cannot be configured, or a sealed store abort the
/// current key's resolution. Connection and store errors are recovered per
/// mount inside the search loop and surface solely through the diagnostic
/// channel.
#[derive(Error, Debug)]
pub enum LookupError {
    /// Invalid option values, store misconfiguration, or a sealed store.
    /// Fatal for the current lookup.
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// Failed to reach the secret store (DNS, TLS, connrefused).
    #[error("connection to secret store failed: {message}")]
    Connection { message: String },

    /// The store answered with an error (non-404 HTTP status).
    #[error("secret store request failed: {message}")]
    Store { message: String },
}

impl LookupError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration { message: message.into() }
    }

    /// Create a connection error.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection { message: message.into() }
    }

    /// Create a store error.
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store { message: message.into() }
    }

    /// Whether this error aborts the current lookup (as opposed to being
    /// recoverable per mount).
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Configuration { .. })
    }
}

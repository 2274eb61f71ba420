//! Error types for zone synchronization
//!
//! This module defines all error types used throughout the crate.

use crate::sync::SyncOperation;
use thiserror::Error;

/// Result type alias for synchronization operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for zone synchronization
#[derive(Error, Debug)]
pub enum Error {
    /// The lease for an operation is held by someone else
    #[error("Cannot acquire lock for {0} synchronization")]
    LockAcquisition(SyncOperation),

    /// Bidirectional sync was asked for a mode it does not know
    #[error("Unsupported synchronization mode: {0}")]
    UnsupportedMode(String),

    /// The account's credential descriptor cannot produce a client
    #[error("Unsupported credentials type: {0}")]
    UnsupportedCredentials(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Remote provider errors
    #[error("Provider error ({provider}): {message}")]
    Provider {
        /// Provider name
        provider: String,
        /// Error message
        message: String,
    },

    /// Authentication errors
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Rate limiting errors
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Entity or remote resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Local store errors
    #[error("Store error: {0}")]
    Store(String),

    /// Lock store errors
    #[error("Lock store error: {0}")]
    LockStore(String),

    /// Uniqueness violation or illegal state transition
    #[error("Conflict: {0}")]
    Conflict(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a provider-specific error
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create a rate limit error
    pub fn rate_limited(msg: impl Into<String>) -> Self {
        Self::RateLimited(msg.into())
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a store error
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// Create a lock store error
    pub fn lock_store(msg: impl Into<String>) -> Self {
        Self::LockStore(msg.into())
    }

    /// Create a conflict error
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    /// Create an unsupported credentials error
    pub fn unsupported_credentials(kind: impl Into<String>) -> Self {
        Self::UnsupportedCredentials(kind.into())
    }

    /// Whether this error belongs to the configuration class
    ///
    /// Configuration errors are fatal and never worth retrying.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::Config(_) | Self::UnsupportedMode(_) | Self::UnsupportedCredentials(_)
        )
    }

    /// Whether this error is a lock contention failure
    pub fn is_lock_contention(&self) -> bool {
        matches!(self, Self::LockAcquisition(_))
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}

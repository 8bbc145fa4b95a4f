//! Error types for Navex synchronization
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

/// Result type alias for synchronization operations
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of an [`Error`]
///
/// Callers (request handlers, the reconciler) branch on the kind rather
/// than on the message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotConfigured,
    Transport,
    Api,
    NotReady,
    NotFound,
    Validation,
    Store,
    Config,
    Other,
}

/// Core error type for the synchronization system
#[derive(Error, Debug)]
pub enum Error {
    /// Carrier endpoint or credentials are missing; no network call was made
    #[error("Carrier API is not configured: {0}")]
    NotConfigured(String),

    /// Network or timeout failure talking to the carrier
    #[error("Transport error: {0}")]
    Transport(String),

    /// Carrier answered with a failure (non-2xx status or unusable body)
    #[error("{0}")]
    Api(String),

    /// The operation needs a tracking code the order does not have yet
    #[error("Not ready: {0}")]
    NotReady(String),

    /// Referenced order does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid caller input
    #[error("Validation error: {0}")]
    Validation(String),

    /// Host metadata / order persistence failure
    #[error("Store error: {0}")]
    Store(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Filesystem errors from file-backed stores
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a "not configured" error
    pub fn not_configured(msg: impl Into<String>) -> Self {
        Self::NotConfigured(msg.into())
    }

    /// Create a transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create a carrier API error
    pub fn api(msg: impl Into<String>) -> Self {
        Self::Api(msg.into())
    }

    /// Create a "not ready" error
    pub fn not_ready(msg: impl Into<String>) -> Self {
        Self::NotReady(msg.into())
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a store error
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotConfigured(_) => ErrorKind::NotConfigured,
            Self::Transport(_) => ErrorKind::Transport,
            Self::Api(_) => ErrorKind::Api,
            Self::NotReady(_) => ErrorKind::NotReady,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Validation(_) => ErrorKind::Validation,
            Self::Store(_) | Self::Io(_) => ErrorKind::Store,
            Self::Config(_) => ErrorKind::Config,
            Self::Json(_) | Self::Other(_) => ErrorKind::Other,
        }
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}

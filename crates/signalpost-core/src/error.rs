//! Unified error types for SignalPost.

use thiserror::Error;

/// Result type alias using SignalPostError.
pub type Result<T> = std::result::Result<T, SignalPostError>;

#[derive(Error, Debug)]
pub enum SignalPostError {
    // A non-administrator invoked an admin-only transition.
    #[error("Access denied: {0}")]
    Authorization(String),

    // Malformed caller input; no state was changed.
    #[error("Invalid input: {0}")]
    Validation(String),

    // The message transport (Bot API) failed. Never retried automatically.
    #[error("Transport error: {0}")]
    Transport(String),

    // A transactional store write failed; the operation rolled back fully.
    #[error("Store error: {0}")]
    Store(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl SignalPostError {
    pub fn authorization(msg: impl Into<String>) -> Self {
        Self::Authorization(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

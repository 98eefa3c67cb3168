//! Error types for Thunder

use thiserror::Error;

use crate::BackendError;

/// Core error type for Thunder operations
#[derive(Error, Debug)]
pub enum ThunderError {
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Staged row index {index} is out of range ({len} pending rows)")]
    StaleIndex { index: usize, len: usize },

    #[error("No active connection")]
    NoActiveConnection,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ThunderError {
    /// Whether this error came back from the backend envelope
    pub fn is_backend(&self) -> bool {
        matches!(self, ThunderError::Backend(_))
    }
}

/// Result type alias for Thunder operations
pub type Result<T> = std::result::Result<T, ThunderError>;

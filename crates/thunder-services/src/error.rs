use thiserror::Error;
use thunder_core::ThunderError;

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Service-level errors with user-friendly messages
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("No active connection")]
    NoActiveConnection,

    #[error("No table is bound to the active tab")]
    NoActiveTable,

    #[error("Schema loading failed: {0}")]
    SchemaLoadFailed(String),

    #[error("Edits were staged on connection {staged} but {active} is active")]
    ConnectionMismatch { staged: String, active: String },

    #[error("Commit failed: {0}")]
    CommitFailed(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Backend error: {0}")]
    Backend(String),
}

impl From<ThunderError> for ServiceError {
    fn from(err: ThunderError) -> Self {
        match err {
            ThunderError::Backend(err) => ServiceError::Backend(err.to_string()),
            ThunderError::Validation(msg) => ServiceError::Validation(msg),
            ThunderError::NoActiveConnection => ServiceError::NoActiveConnection,
            other => ServiceError::Backend(other.to_string()),
        }
    }
}

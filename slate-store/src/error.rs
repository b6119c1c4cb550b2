//! Error types for the storage layer.

use thiserror::Error;

/// Result type for storage operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in storage operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A persisted row failed to decode back into its typed form.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Message not found.
    #[error("message not found: {0}")]
    NotFound(i64),
}

impl From<slate_types::Error> for StoreError {
    fn from(err: slate_types::Error) -> Self {
        match err {
            slate_types::Error::Serialization(e) => StoreError::Serialization(e),
            other => StoreError::InvalidData(other.to_string()),
        }
    }
}

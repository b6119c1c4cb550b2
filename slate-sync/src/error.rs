//! Error types for the sync layer.
//!
//! The taxonomy drives retry policy: network trouble and server overload are
//! retryable with backoff; server rejections and malformed payloads are
//! permanent. Clock skew is deliberately *not* here — it is a warning, never
//! an error, and must not drop messages.

use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur in sync operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Transient network failure (timeout, connection loss). Retryable.
    #[error("network error: {0}")]
    Network(String),

    /// Server overloaded or throttling (408, 429, 5xx). Retryable.
    #[error("server overloaded: {0}")]
    Overloaded(String),

    /// Server rejected the request (other 4xx). Not retryable.
    #[error("server rejected request: {0}")]
    Rejected(String),

    /// Payload could not be (de)serialized. Not retryable.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Local storage failure.
    #[error("storage error: {0}")]
    Storage(#[from] slate_store::StoreError),

    /// Entity encoding failure from the types layer.
    #[error("encoding error: {0}")]
    Encoding(#[from] slate_types::Error),

    /// The device has no confirmed registration yet.
    #[error("device not registered")]
    NotRegistered,

    /// No signed-in user; sync cannot run.
    #[error("no active session")]
    NoSession,

    /// Protocol error (unexpected response shape).
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl SyncError {
    /// Whether backing off and retrying can plausibly succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, SyncError::Network(_) | SyncError::Overloaded(_))
    }

    /// Classifies an HTTP response status into the error taxonomy.
    pub(crate) fn from_status(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        match status {
            408 | 429 => SyncError::Overloaded(format!("status {status}: {body}")),
            500..=599 => SyncError::Overloaded(format!("status {status}: {body}")),
            400..=499 => SyncError::Rejected(format!("status {status}: {body}")),
            other => SyncError::Protocol(format!("unexpected status {other}: {body}")),
        }
    }
}

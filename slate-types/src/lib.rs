//! Core type definitions for the Slate sync engine.
//!
//! This crate defines the fundamental, storage-agnostic types shared by the
//! sync core:
//! - Node, device, and CRDT-key identifiers
//! - Hybrid Logical Clock timestamps and the process-wide clock
//! - Sync messages (the unit of replication) and their wire DTOs
//! - The `SyncEntity` capability trait every synchronizable type implements
//!
//! Domain-specific types (courses, schedule entries, profiles) live in the
//! host application, not here. The sync core only ever sees the capability
//! set exposed by `SyncEntity`.

mod clock;
mod entity;
mod ids;
mod message;
mod timestamp;

pub use clock::HlcClock;
pub use entity::{EntityKind, OperationKind, SyncEntity};
pub use ids::{CrdtKey, DeviceId, NodeId};
pub use message::{SyncMessage, SyncMessageDto, SyncStatus};
pub use timestamp::HlcTimestamp;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("unknown entity kind: {0}")]
    UnknownKind(String),

    #[error("unknown operation kind: {0}")]
    UnknownOperation(String),

    #[error("unknown sync status: {0}")]
    UnknownStatus(String),
}

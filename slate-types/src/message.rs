//! Sync messages — the unit of replication.
//!
//! Every local mutation appends one message to the outbox; every remote
//! mutation arrives as one message in the inbox. A message is immutable once
//! created except for its sync status, last attempt time, and error text.
//! `(crdt_key, timestamp)` uniquely identifies a causal version of an entity
//! across the whole system.

use crate::{CrdtKey, DeviceId, EntityKind, HlcTimestamp, OperationKind};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Upload lifecycle of an outbox message.
///
/// `Pending → Uploading → Synced` on the happy path, or `→ Failed` and back
/// to eligible-for-upload on retryable failures. `Synced` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SyncStatus {
    Pending,
    Uploading,
    Synced,
    Failed,
}

impl SyncStatus {
    /// The name persisted in message rows.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Pending => "PENDING",
            SyncStatus::Uploading => "UPLOADING",
            SyncStatus::Synced => "SYNCED",
            SyncStatus::Failed => "FAILED",
        }
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncStatus {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s {
            "PENDING" => Ok(SyncStatus::Pending),
            "UPLOADING" => Ok(SyncStatus::Uploading),
            "SYNCED" => Ok(SyncStatus::Synced),
            "FAILED" => Ok(SyncStatus::Failed),
            other => Err(crate::Error::UnknownStatus(other.to_string())),
        }
    }
}

/// A durable sync message as stored in the outbox/inbox log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncMessage {
    /// Auto-increment local row id. `None` until persisted; never transmitted.
    pub local_id: Option<i64>,

    /// Stable cross-device key of the entity this message mutates.
    pub crdt_key: CrdtKey,

    /// The entity kind.
    pub kind: EntityKind,

    /// The mutation carried by this message.
    pub operation: OperationKind,

    /// The device that authored the mutation.
    pub device_id: DeviceId,

    /// HLC timestamp stamped when the mutation was enqueued.
    pub timestamp: HlcTimestamp,

    /// Serialized entity snapshot.
    pub payload: String,

    /// The user owning this data.
    pub user_id: String,

    /// Upload lifecycle status.
    pub status: SyncStatus,

    /// Last upload attempt (ms since epoch), if any.
    pub last_sync_attempt: Option<u64>,

    /// Error text from the last failed attempt, if any.
    pub sync_error: Option<String>,
}

impl SyncMessage {
    /// Creates a fresh, not-yet-persisted pending message.
    #[must_use]
    pub fn new(
        crdt_key: CrdtKey,
        kind: EntityKind,
        operation: OperationKind,
        device_id: DeviceId,
        timestamp: HlcTimestamp,
        payload: String,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            local_id: None,
            crdt_key,
            kind,
            operation,
            device_id,
            timestamp,
            payload,
            user_id: user_id.into(),
            status: SyncStatus::Pending,
            last_sync_attempt: None,
            sync_error: None,
        }
    }

    /// The wire form of this message. Local-only fields (row id, status,
    /// attempt bookkeeping) are dropped.
    #[must_use]
    pub fn to_dto(&self) -> SyncMessageDto {
        SyncMessageDto {
            crdt_key: self.crdt_key.clone(),
            entity_type: self.kind,
            operation_type: self.operation,
            device_id: self.device_id.clone(),
            timestamp: self.timestamp.clone(),
            payload: self.payload.clone(),
            user_id: self.user_id.clone(),
        }
    }
}

/// The wire representation of a sync message (JSON, camelCase).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncMessageDto {
    pub crdt_key: CrdtKey,
    pub entity_type: EntityKind,
    pub operation_type: OperationKind,
    pub device_id: DeviceId,
    pub timestamp: HlcTimestamp,
    pub payload: String,
    pub user_id: String,
}

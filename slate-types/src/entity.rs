//! The capability contract for synchronizable domain objects.
//!
//! The outbox and merge engine depend only on this trait, never on concrete
//! domain types — a new synchronizable kind is added by implementing
//! `SyncEntity` (and extending [`EntityKind`]) with no change to the engine.

use crate::{CrdtKey, HlcTimestamp, NodeId, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The kinds of entities the schedule manager replicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    /// A course definition (title, instructor, location, ...).
    Course,
    /// A recurring or one-off schedule entry.
    Schedule,
    /// The user's profile/settings record.
    Profile,
}

impl EntityKind {
    /// All kinds, in the order per-type downloads iterate them.
    pub const ALL: [EntityKind; 3] = [EntityKind::Course, EntityKind::Schedule, EntityKind::Profile];

    /// The wire name used in endpoint paths and message rows.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Course => "course",
            EntityKind::Schedule => "schedule",
            EntityKind::Profile => "profile",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "course" => Ok(EntityKind::Course),
            "schedule" => Ok(EntityKind::Schedule),
            "profile" => Ok(EntityKind::Profile),
            other => Err(crate::Error::UnknownKind(other.to_string())),
        }
    }
}

/// The mutation a sync message carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OperationKind {
    Create,
    Update,
    Delete,
}

impl OperationKind {
    /// The wire name used in message rows.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Create => "CREATE",
            OperationKind::Update => "UPDATE",
            OperationKind::Delete => "DELETE",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationKind {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "CREATE" => Ok(OperationKind::Create),
            "UPDATE" => Ok(OperationKind::Update),
            "DELETE" => Ok(OperationKind::Delete),
            other => Err(crate::Error::UnknownOperation(other.to_string())),
        }
    }
}

/// Capability set every synchronizable domain object implements.
///
/// Deletions are tombstones: `is_deleted` flips to true and the record keeps
/// existing, so delete-vs-update conflicts stay resolvable. Local database
/// primary keys are deliberately absent — nothing local-only crosses this
/// boundary.
pub trait SyncEntity {
    /// Stable cross-device key for this logical entity.
    fn crdt_key(&self) -> CrdtKey;

    /// When this entity was first created.
    fn created_at(&self) -> HlcTimestamp;

    /// The version of the current state.
    fn updated_at(&self) -> HlcTimestamp;

    /// Whether this entity is tombstoned.
    fn is_deleted(&self) -> bool;

    /// The node that created this entity.
    fn node_id(&self) -> NodeId;

    /// The entity kind, routing the message to the right endpoint.
    fn kind(&self) -> EntityKind;

    /// Serializes the full entity snapshot for transport.
    fn to_payload(&self) -> Result<String>;
}

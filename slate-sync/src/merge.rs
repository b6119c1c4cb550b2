//! The merge engine — last-writer-wins conflict resolution.
//!
//! For two versions of the same `crdt_key`, the later HLC timestamp wins at
//! whole-record granularity; bit-identical timestamps tie-break on node id
//! (higher byte order wins — the node id is the final component of the
//! timestamp's total order, so plain comparison covers it). Tombstones
//! compete on equal footing with live updates: a later delete overrides an
//! update and vice versa.
//!
//! Merge is commutative, associative, and idempotent — applying the same set
//! of versions in any order, any number of times, converges to the same
//! state. That property, not locking, is what keeps devices consistent.

use crate::error::{SyncError, SyncResult};
use serde::{Deserialize, Serialize};
use slate_types::{CrdtKey, EntityKind, HlcTimestamp, OperationKind, SyncMessageDto};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// A materialized entity version as the merge engine sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitySnapshot {
    /// Stable cross-device key.
    pub crdt_key: CrdtKey,
    /// The entity kind.
    pub kind: EntityKind,
    /// The full entity state as JSON. `Null` for bare tombstones.
    pub data: serde_json::Value,
    /// The HLC version of this state.
    pub version: HlcTimestamp,
    /// Tombstone flag — deletions are flagged, never physically removed.
    pub is_deleted: bool,
}

impl EntitySnapshot {
    /// Builds the incoming version carried by a sync message.
    pub fn from_message(dto: &SyncMessageDto) -> SyncResult<Self> {
        let data = if dto.payload.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_str(&dto.payload)?
        };
        let tombstoned = data
            .get("isDeleted")
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false);
        Ok(Self {
            crdt_key: dto.crdt_key.clone(),
            kind: dto.entity_type,
            data,
            version: dto.timestamp.clone(),
            is_deleted: dto.operation_type == OperationKind::Delete || tombstoned,
        })
    }
}

/// What happened when a message was handed to the merge engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// The incoming version won and was written to the entity store.
    Applied,
    /// The local version was newer; the incoming one was discarded.
    Stale,
}

/// The local materialized-entity store collaborator.
///
/// Owned by the host's relational layer. The merge engine is the only
/// component permitted to write merged state through this interface.
pub trait EntityStore: Send + Sync {
    /// Writes (or overwrites) an entity version.
    fn upsert(&self, snapshot: EntitySnapshot) -> SyncResult<()>;

    /// Reads the current version for a key, tombstones included.
    fn get_by_key(&self, key: &CrdtKey) -> SyncResult<Option<EntitySnapshot>>;
}

/// Resolves incoming versions against local state and writes the winners.
///
/// Holds no persistent state beyond the in-flight comparison.
pub struct MergeEngine {
    store: Arc<dyn EntityStore>,
}

impl MergeEngine {
    /// Creates a merge engine writing through the given entity store.
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }

    /// Applies one inbound message. Returns whether the incoming version won.
    pub fn apply(&self, dto: &SyncMessageDto) -> SyncResult<MergeOutcome> {
        let incoming = EntitySnapshot::from_message(dto)?;
        match self.store.get_by_key(&incoming.crdt_key)? {
            Some(local) if local.version >= incoming.version => {
                debug!(
                    "discarding stale version {} for {} (local is {})",
                    incoming.version, incoming.crdt_key, local.version
                );
                Ok(MergeOutcome::Stale)
            }
            _ => {
                debug!("applying version {} for {}", incoming.version, incoming.crdt_key);
                self.store.upsert(incoming)?;
                Ok(MergeOutcome::Applied)
            }
        }
    }
}

/// In-memory entity store, for tests and hosts without a relational layer.
#[derive(Default)]
pub struct MemoryEntityStore {
    entities: Mutex<HashMap<CrdtKey, EntitySnapshot>>,
}

impl MemoryEntityStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entities, tombstones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.lock().unwrap().len()
    }

    /// Whether the store holds no entities.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clones the current state of one entity.
    #[must_use]
    pub fn snapshot(&self, key: &CrdtKey) -> Option<EntitySnapshot> {
        self.entities.lock().unwrap().get(key).cloned()
    }
}

impl EntityStore for MemoryEntityStore {
    fn upsert(&self, snapshot: EntitySnapshot) -> SyncResult<()> {
        self.entities
            .lock()
            .map_err(|_| SyncError::Protocol("entity store mutex poisoned".to_string()))?
            .insert(snapshot.crdt_key.clone(), snapshot);
        Ok(())
    }

    fn get_by_key(&self, key: &CrdtKey) -> SyncResult<Option<EntitySnapshot>> {
        Ok(self.entities.lock().unwrap().get(key).cloned())
    }
}

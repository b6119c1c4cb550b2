//! The durable outbox/inbox log.
//!
//! One SQLite file holds two append-only tables: `outbox` (locally authored
//! mutations awaiting upload) and `inbox` (mutations received from other
//! devices). Rows are never deleted — the log supports replay and audit.
//! Writes are serialized through the connection mutex; the store is the
//! single shared mutable resource of the sync core.

use crate::error::{StoreError, StoreResult};
use rusqlite::{Connection, params};
use slate_types::{
    CrdtKey, DeviceId, EntityKind, HlcClock, HlcTimestamp, NodeId, OperationKind, SyncEntity,
    SyncMessage, SyncMessageDto, SyncStatus,
};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info};

/// Outcome of recording an inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboundOutcome {
    /// First time this `(crdt_key, timestamp)` version was seen.
    Applied {
        /// Row id of the stored inbox message.
        local_id: i64,
    },
    /// Already recorded — at-least-once redelivery, safely ignored.
    DuplicateIgnored,
}

/// Per-status row counts, for the UI sync indicator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub pending: usize,
    pub uploading: usize,
    pub synced: usize,
    pub failed: usize,
}

/// The durable sync message store.
pub struct OutboxStore {
    conn: Arc<Mutex<Connection>>,
}

impl OutboxStore {
    /// Opens (or creates) the message store at the given path.
    ///
    /// Recovery runs on every open: messages caught mid-upload by a crash
    /// revert to PENDING, since the upload may not have completed and the
    /// server dedups replays by `(crdt_key, timestamp)`.
    pub fn new(path: &Path) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// Opens an in-memory store (for testing).
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> StoreResult<Self> {
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        let recovered = store.recover_in_flight()?;
        if recovered > 0 {
            info!("recovered {recovered} in-flight outbox messages to PENDING");
        }
        Ok(store)
    }

    fn init_schema(&self) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS outbox (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                crdt_key TEXT NOT NULL,
                entity_kind TEXT NOT NULL,
                operation TEXT NOT NULL,
                device_id TEXT NOT NULL,
                wall_ms INTEGER NOT NULL,
                counter INTEGER NOT NULL,
                node_id TEXT NOT NULL,
                payload TEXT NOT NULL,
                user_id TEXT NOT NULL,
                sync_status TEXT NOT NULL,
                permanent INTEGER NOT NULL DEFAULT 0,
                last_sync_attempt INTEGER,
                sync_error TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_outbox_crdt_key ON outbox(crdt_key);
            CREATE INDEX IF NOT EXISTS idx_outbox_kind ON outbox(entity_kind);
            CREATE INDEX IF NOT EXISTS idx_outbox_status ON outbox(sync_status);

            CREATE TABLE IF NOT EXISTS inbox (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                crdt_key TEXT NOT NULL,
                entity_kind TEXT NOT NULL,
                operation TEXT NOT NULL,
                device_id TEXT NOT NULL,
                wall_ms INTEGER NOT NULL,
                counter INTEGER NOT NULL,
                node_id TEXT NOT NULL,
                payload TEXT NOT NULL,
                user_id TEXT NOT NULL,
                processed INTEGER NOT NULL DEFAULT 0,
                UNIQUE(crdt_key, wall_ms, counter, node_id)
            );
            CREATE INDEX IF NOT EXISTS idx_inbox_crdt_key ON inbox(crdt_key);
            CREATE INDEX IF NOT EXISTS idx_inbox_kind ON inbox(entity_kind);
            ",
        )?;
        Ok(())
    }

    // ── Outbox ───────────────────────────────────────────────────

    /// Appends a mutation to the outbox with a freshly stamped HLC timestamp.
    ///
    /// The returned message carries its assigned row id and PENDING status.
    /// Local mutations always succeed regardless of sync health.
    pub fn enqueue(
        &self,
        entity: &dyn SyncEntity,
        operation: OperationKind,
        clock: &HlcClock,
        device_id: &DeviceId,
        user_id: &str,
    ) -> StoreResult<SyncMessage> {
        let timestamp = clock.now();
        let payload = entity.to_payload()?;
        let mut message = SyncMessage::new(
            entity.crdt_key(),
            entity.kind(),
            operation,
            device_id.clone(),
            timestamp,
            payload,
            user_id,
        );

        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO outbox (crdt_key, entity_kind, operation, device_id, wall_ms, counter,
                                 node_id, payload, user_id, sync_status)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                message.crdt_key.as_str(),
                message.kind.as_str(),
                message.operation.as_str(),
                message.device_id.as_str(),
                message.timestamp.wall_ms() as i64,
                message.timestamp.counter() as i64,
                message.timestamp.node().as_str(),
                message.payload,
                message.user_id,
                message.status.as_str(),
            ],
        )?;
        message.local_id = Some(conn.last_insert_rowid());

        debug!(
            "enqueued {} {} at {}",
            message.operation, message.crdt_key, message.timestamp
        );
        Ok(message)
    }

    /// Returns messages eligible for upload, oldest timestamp first.
    ///
    /// Covers PENDING rows and FAILED rows whose failure was retryable.
    /// Permanently failed messages (server rejection, malformed payload)
    /// never re-enter the batch.
    pub fn pending_for_upload(&self, limit: usize) -> StoreResult<Vec<SyncMessage>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, crdt_key, entity_kind, operation, device_id, wall_ms, counter,
                    node_id, payload, user_id, sync_status, last_sync_attempt, sync_error
             FROM outbox
             WHERE sync_status = 'PENDING' OR (sync_status = 'FAILED' AND permanent = 0)
             ORDER BY wall_ms ASC, counter ASC, node_id ASC
             LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], row_to_message)?;

        let mut result = Vec::new();
        for row in rows {
            result.push(row??);
        }
        Ok(result)
    }

    /// Transitions the given messages to a new status.
    ///
    /// Idempotent: SYNCED rows are never demoted — re-marking them is a
    /// no-op, not an error. Any transition out of PENDING records the
    /// attempt time.
    pub fn mark_status(
        &self,
        local_ids: &[i64],
        status: SyncStatus,
        error: Option<&str>,
    ) -> StoreResult<usize> {
        let attempt = if status == SyncStatus::Pending {
            None
        } else {
            Some(now_ms() as i64)
        };
        let conn = self.conn.lock().unwrap();
        let mut changed = 0;
        for id in local_ids {
            changed += conn.execute(
                "UPDATE outbox
                 SET sync_status = ?1, sync_error = ?2, permanent = 0,
                     last_sync_attempt = COALESCE(?3, last_sync_attempt)
                 WHERE id = ?4 AND sync_status != 'SYNCED'",
                params![status.as_str(), error, attempt, id],
            )?;
        }
        Ok(changed)
    }

    /// Marks messages FAILED with no retry eligibility (non-retryable
    /// failures: server rejection, malformed payload).
    pub fn mark_failed_permanent(&self, local_ids: &[i64], error: &str) -> StoreResult<usize> {
        let attempt = now_ms() as i64;
        let conn = self.conn.lock().unwrap();
        let mut changed = 0;
        for id in local_ids {
            changed += conn.execute(
                "UPDATE outbox
                 SET sync_status = 'FAILED', sync_error = ?1, permanent = 1,
                     last_sync_attempt = ?2
                 WHERE id = ?3 AND sync_status != 'SYNCED'",
                params![error, attempt, id],
            )?;
        }
        Ok(changed)
    }

    /// Loads a single outbox message by row id.
    pub fn get(&self, local_id: i64) -> StoreResult<SyncMessage> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, crdt_key, entity_kind, operation, device_id, wall_ms, counter,
                    node_id, payload, user_id, sync_status, last_sync_attempt, sync_error
             FROM outbox WHERE id = ?1",
        )?;
        let mut rows = stmt.query_map(params![local_id], row_to_message)?;
        match rows.next() {
            Some(row) => Ok(row??),
            None => Err(StoreError::NotFound(local_id)),
        }
    }

    /// Reverts UPLOADING rows to PENDING. Called on open; safe to call any
    /// time no upload is in flight.
    pub fn recover_in_flight(&self) -> StoreResult<usize> {
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute(
            "UPDATE outbox SET sync_status = 'PENDING' WHERE sync_status = 'UPLOADING'",
            [],
        )?;
        Ok(changed)
    }

    /// Per-status outbox counts.
    pub fn message_counts(&self) -> StoreResult<StatusCounts> {
        let conn = self.conn.lock().unwrap();
        let mut stmt =
            conn.prepare("SELECT sync_status, COUNT(*) FROM outbox GROUP BY sync_status")?;
        let rows = stmt.query_map([], |row| {
            let status: String = row.get(0)?;
            let count: i64 = row.get(1)?;
            Ok((status, count))
        })?;

        let mut counts = StatusCounts::default();
        for row in rows {
            let (status, count) = row?;
            match status.as_str() {
                "PENDING" => counts.pending = count as usize,
                "UPLOADING" => counts.uploading = count as usize,
                "SYNCED" => counts.synced = count as usize,
                "FAILED" => counts.failed = count as usize,
                other => return Err(StoreError::InvalidData(format!("sync_status: {other}"))),
            }
        }
        Ok(counts)
    }

    // ── Inbox ────────────────────────────────────────────────────

    /// Records an inbound message, deduplicating by `(crdt_key, timestamp)`.
    ///
    /// At-least-once delivery means the same message can arrive twice; the
    /// second arrival is a no-op.
    pub fn record_inbound(&self, dto: &SyncMessageDto) -> StoreResult<InboundOutcome> {
        let conn = self.conn.lock().unwrap();
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO inbox (crdt_key, entity_kind, operation, device_id,
                                          wall_ms, counter, node_id, payload, user_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                dto.crdt_key.as_str(),
                dto.entity_type.as_str(),
                dto.operation_type.as_str(),
                dto.device_id.as_str(),
                dto.timestamp.wall_ms() as i64,
                dto.timestamp.counter() as i64,
                dto.timestamp.node().as_str(),
                dto.payload,
                dto.user_id,
            ],
        )?;
        if inserted == 0 {
            debug!("duplicate inbound message for {}", dto.crdt_key);
            return Ok(InboundOutcome::DuplicateIgnored);
        }
        Ok(InboundOutcome::Applied {
            local_id: conn.last_insert_rowid(),
        })
    }

    /// Inbound messages recorded but not yet handed to the merge engine —
    /// the crash window between `record_inbound` and `mark_inbound_processed`.
    pub fn unprocessed_inbound(&self) -> StoreResult<Vec<(i64, SyncMessageDto)>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, crdt_key, entity_kind, operation, device_id, wall_ms, counter,
                    node_id, payload, user_id
             FROM inbox WHERE processed = 0
             ORDER BY id ASC",
        )?;
        let rows = stmt.query_map([], row_to_inbound)?;

        let mut result = Vec::new();
        for row in rows {
            result.push(row??);
        }
        Ok(result)
    }

    /// Marks an inbox message as merged into local state. Idempotent.
    pub fn mark_inbound_processed(&self, local_id: i64) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE inbox SET processed = 1 WHERE id = ?1",
            params![local_id],
        )?;
        Ok(())
    }

    /// Total number of recorded inbound messages.
    pub fn inbox_len(&self) -> StoreResult<usize> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM inbox", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

type RawMessageRow = (
    i64,
    String,
    String,
    String,
    String,
    i64,
    i64,
    String,
    String,
    String,
    String,
    Option<i64>,
    Option<String>,
);

fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<StoreResult<SyncMessage>> {
    let raw: RawMessageRow = (
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
        row.get(8)?,
        row.get(9)?,
        row.get(10)?,
        row.get(11)?,
        row.get(12)?,
    );
    Ok(decode_message(raw))
}

fn decode_message(raw: RawMessageRow) -> StoreResult<SyncMessage> {
    let (
        id,
        crdt_key,
        kind,
        operation,
        device_id,
        wall_ms,
        counter,
        node_id,
        payload,
        user_id,
        status,
        last_sync_attempt,
        sync_error,
    ) = raw;
    Ok(SyncMessage {
        local_id: Some(id),
        crdt_key: CrdtKey::new(crdt_key),
        kind: kind.parse::<EntityKind>()?,
        operation: operation.parse::<OperationKind>()?,
        device_id: DeviceId::new(device_id),
        timestamp: HlcTimestamp::new(wall_ms as u64, counter as u32, NodeId::new(node_id)),
        payload,
        user_id,
        status: status.parse::<SyncStatus>()?,
        last_sync_attempt: last_sync_attempt.map(|v| v as u64),
        sync_error,
    })
}

fn row_to_inbound(row: &rusqlite::Row<'_>) -> rusqlite::Result<StoreResult<(i64, SyncMessageDto)>> {
    let id: i64 = row.get(0)?;
    let crdt_key: String = row.get(1)?;
    let kind: String = row.get(2)?;
    let operation: String = row.get(3)?;
    let device_id: String = row.get(4)?;
    let wall_ms: i64 = row.get(5)?;
    let counter: i64 = row.get(6)?;
    let node_id: String = row.get(7)?;
    let payload: String = row.get(8)?;
    let user_id: String = row.get(9)?;

    Ok((|| {
        Ok((
            id,
            SyncMessageDto {
                crdt_key: CrdtKey::new(crdt_key),
                entity_type: kind.parse::<EntityKind>()?,
                operation_type: operation.parse::<OperationKind>()?,
                device_id: DeviceId::new(device_id),
                timestamp: HlcTimestamp::new(wall_ms as u64, counter as u32, NodeId::new(node_id)),
                payload,
                user_id,
            },
        ))
    })())
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

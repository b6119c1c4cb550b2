//! Persistent device registration state.
//!
//! One row per install: the stable device id, the owning user, and whether
//! the remote coordinator has confirmed the registration. The sync
//! orchestrator refuses to exchange messages until `confirmed` is set.

use crate::error::StoreResult;
use rusqlite::{Connection, OptionalExtension, params};
use slate_types::DeviceId;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::info;

/// This device's registration record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceRegistration {
    /// Stable per-install device identifier.
    pub device_id: DeviceId,
    /// The user this device was registered under.
    pub user_id: String,
    /// When the local record was created (ms since epoch).
    pub registered_at: u64,
    /// Whether the remote coordinator has acknowledged the registration.
    pub confirmed: bool,
}

/// SQLite-backed store for the device registration row.
pub struct RegistryStore {
    conn: Arc<Mutex<Connection>>,
}

impl RegistryStore {
    /// Opens (or creates) the registry at the given path.
    pub fn new(path: &Path) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// Opens an in-memory registry (for testing).
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> StoreResult<Self> {
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS device_registration (
                device_id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                registered_at INTEGER NOT NULL,
                confirmed INTEGER NOT NULL DEFAULT 0
            );
            ",
        )?;
        Ok(())
    }

    /// Returns the registration row, if this install has one.
    pub fn load(&self) -> StoreResult<Option<DeviceRegistration>> {
        let conn = self.conn.lock().unwrap();
        let row = conn
            .query_row(
                "SELECT device_id, user_id, registered_at, confirmed FROM device_registration",
                [],
                |row| {
                    let device_id: String = row.get(0)?;
                    let user_id: String = row.get(1)?;
                    let registered_at: i64 = row.get(2)?;
                    let confirmed: bool = row.get(3)?;
                    Ok(DeviceRegistration {
                        device_id: DeviceId::new(device_id),
                        user_id,
                        registered_at: registered_at as u64,
                        confirmed,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }

    /// Loads the registration row, creating one with a fresh device id on
    /// first run. Idempotent — later calls return the same device id.
    pub fn ensure_device(&self, user_id: &str) -> StoreResult<DeviceRegistration> {
        if let Some(existing) = self.load()? {
            return Ok(existing);
        }

        let registration = DeviceRegistration {
            device_id: DeviceId::generate(),
            user_id: user_id.to_string(),
            registered_at: now_ms(),
            confirmed: false,
        };
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO device_registration (device_id, user_id, registered_at, confirmed)
             VALUES (?1, ?2, ?3, 0)",
            params![
                registration.device_id.as_str(),
                registration.user_id,
                registration.registered_at as i64,
            ],
        )?;
        info!("generated device id {}", registration.device_id);
        Ok(registration)
    }

    /// Records that the remote coordinator acknowledged this device.
    pub fn mark_confirmed(&self, device_id: &DeviceId) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE device_registration SET confirmed = 1 WHERE device_id = ?1",
            params![device_id.as_str()],
        )?;
        Ok(())
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

//! Device registration against the sync relay.
//!
//! The local half (stable device id) is created eagerly and never changes;
//! the remote half (relay confirmation) can lag behind network availability.
//! `ensure_registered` is idempotent and safe to call on every app start and
//! at the top of every sync cycle.

use crate::error::SyncResult;
use crate::transport::{RegistrationInfo, SyncTransport};
use slate_store::RegistryStore;
use slate_types::DeviceId;
use std::sync::Arc;
use tracing::info;

/// Establishes and confirms this device's identity with the relay.
pub struct DeviceRegistrar {
    registry: Arc<RegistryStore>,
    transport: Arc<dyn SyncTransport>,
    device_info: String,
}

impl DeviceRegistrar {
    /// Creates a registrar. `device_info` is the free-form description sent
    /// to the relay (platform, app version).
    pub fn new(
        registry: Arc<RegistryStore>,
        transport: Arc<dyn SyncTransport>,
        device_info: impl Into<String>,
    ) -> Self {
        Self {
            registry,
            transport,
            device_info: device_info.into(),
        }
    }

    /// Ensures this device is registered with the relay, returning its
    /// stable id.
    ///
    /// Generates and persists the id on first run, then registers remotely.
    /// Once confirmed, later calls return without touching the network.
    /// A network failure leaves the local id intact and the registration
    /// unconfirmed — the caller retries with its usual backoff.
    pub async fn ensure_registered(&self, user_id: &str) -> SyncResult<DeviceId> {
        let registration = self.registry.ensure_device(user_id)?;
        if registration.confirmed {
            return Ok(registration.device_id);
        }

        let info = RegistrationInfo {
            user_id: user_id.to_string(),
            device_info: self.device_info.clone(),
        };
        let receipt = self
            .transport
            .register(&registration.device_id, &info)
            .await?;
        self.registry.mark_confirmed(&registration.device_id)?;
        info!(
            "device {} registered with relay at {}",
            registration.device_id, receipt.registered_at
        );
        Ok(registration.device_id)
    }

    /// The locally persisted device id, if one exists yet.
    pub fn device_id(&self) -> SyncResult<Option<DeviceId>> {
        Ok(self.registry.load()?.map(|r| r.device_id))
    }
}

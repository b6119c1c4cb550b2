//! Transport layer abstraction.
//!
//! The wire contract for talking to the sync relay. All operations are
//! stateless request/response and safe to repeat — the relay dedups by
//! `(crdtKey, timestamp)`, so an upload replayed after a lost response is
//! harmless.

use crate::error::SyncResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use slate_types::{CrdtKey, DeviceId, EntityKind, SyncMessageDto};

/// Request body for device registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationInfo {
    /// The user this device belongs to.
    pub user_id: String,
    /// Free-form device description (platform, app version).
    pub device_info: String,
}

/// The relay's acknowledgement of a device registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationReceipt {
    /// The device id as recorded by the relay.
    pub device_id: DeviceId,
    /// Server-side registration time (ms since epoch).
    pub registered_at: u64,
}

/// The relay's response to an upload batch.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UploadReceipt {
    /// How many messages the relay accepted.
    pub accepted_count: usize,
    /// Keys of messages the relay rejected (partial acceptance).
    pub rejected_keys: Vec<CrdtKey>,
}

/// A stateless sync relay client.
#[async_trait]
pub trait SyncTransport: Send + Sync {
    /// Registers this device with the relay. Idempotent.
    async fn register(
        &self,
        device_id: &DeviceId,
        info: &RegistrationInfo,
    ) -> SyncResult<RegistrationReceipt>;

    /// Uploads a batch of messages of one entity kind.
    async fn upload(
        &self,
        device_id: &DeviceId,
        kind: EntityKind,
        messages: &[SyncMessageDto],
    ) -> SyncResult<UploadReceipt>;

    /// Downloads messages of all kinds, optionally excluding this device's
    /// own origin (avoids reprocessing self-authored data).
    async fn download_all(
        &self,
        device_id: &DeviceId,
        exclude_origin: bool,
    ) -> SyncResult<Vec<SyncMessageDto>>;

    /// Downloads messages of one kind.
    async fn download_by_kind(
        &self,
        device_id: &DeviceId,
        kind: EntityKind,
        exclude_origin: bool,
    ) -> SyncResult<Vec<SyncMessageDto>>;
}

/// A scriptable in-memory transport for testing.
pub mod mock {
    use super::*;
    use crate::error::SyncError;
    use std::collections::HashSet;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Mock relay: records uploads, serves scripted inbound messages, and
    /// fails the next N calls on demand.
    #[derive(Default)]
    pub struct MockTransport {
        fail_registrations: AtomicUsize,
        fail_uploads: AtomicUsize,
        fail_downloads: AtomicUsize,
        register_calls: AtomicUsize,
        reject_keys: Mutex<HashSet<CrdtKey>>,
        inbound: Mutex<Vec<SyncMessageDto>>,
        uploaded: Mutex<Vec<SyncMessageDto>>,
    }

    impl MockTransport {
        /// Creates a mock transport that succeeds at everything.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Fails the next `n` register calls with a network error.
        pub fn fail_next_registrations(&self, n: usize) {
            self.fail_registrations.store(n, Ordering::SeqCst);
        }

        /// Fails the next `n` upload calls with a network error.
        pub fn fail_next_uploads(&self, n: usize) {
            self.fail_uploads.store(n, Ordering::SeqCst);
        }

        /// Fails the next `n` download calls with a network error.
        pub fn fail_next_downloads(&self, n: usize) {
            self.fail_downloads.store(n, Ordering::SeqCst);
        }

        /// Rejects any uploaded message with this key (partial acceptance).
        pub fn reject_key(&self, key: CrdtKey) {
            self.reject_keys.lock().unwrap().insert(key);
        }

        /// Queues a message to be served by downloads.
        pub fn push_inbound(&self, dto: SyncMessageDto) {
            self.inbound.lock().unwrap().push(dto);
        }

        /// Messages accepted by this relay so far, in upload order.
        #[must_use]
        pub fn uploaded(&self) -> Vec<SyncMessageDto> {
            self.uploaded.lock().unwrap().clone()
        }

        /// How many register calls succeeded.
        #[must_use]
        pub fn register_calls(&self) -> usize {
            self.register_calls.load(Ordering::SeqCst)
        }

        fn consume(counter: &AtomicUsize) -> bool {
            counter
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
        }
    }

    #[async_trait]
    impl SyncTransport for MockTransport {
        async fn register(
            &self,
            device_id: &DeviceId,
            _info: &RegistrationInfo,
        ) -> SyncResult<RegistrationReceipt> {
            if Self::consume(&self.fail_registrations) {
                return Err(SyncError::Network("mock: register failed".into()));
            }
            self.register_calls.fetch_add(1, Ordering::SeqCst);
            Ok(RegistrationReceipt {
                device_id: device_id.clone(),
                registered_at: 1,
            })
        }

        async fn upload(
            &self,
            _device_id: &DeviceId,
            _kind: EntityKind,
            messages: &[SyncMessageDto],
        ) -> SyncResult<UploadReceipt> {
            if Self::consume(&self.fail_uploads) {
                return Err(SyncError::Network("mock: upload failed".into()));
            }
            let reject = self.reject_keys.lock().unwrap();
            let mut receipt = UploadReceipt::default();
            let mut uploaded = self.uploaded.lock().unwrap();
            for message in messages {
                if reject.contains(&message.crdt_key) {
                    receipt.rejected_keys.push(message.crdt_key.clone());
                } else {
                    receipt.accepted_count += 1;
                    uploaded.push(message.clone());
                }
            }
            Ok(receipt)
        }

        async fn download_all(
            &self,
            device_id: &DeviceId,
            exclude_origin: bool,
        ) -> SyncResult<Vec<SyncMessageDto>> {
            if Self::consume(&self.fail_downloads) {
                return Err(SyncError::Network("mock: download failed".into()));
            }
            Ok(self
                .inbound
                .lock()
                .unwrap()
                .iter()
                .filter(|dto| !exclude_origin || dto.device_id != *device_id)
                .cloned()
                .collect())
        }

        async fn download_by_kind(
            &self,
            device_id: &DeviceId,
            kind: EntityKind,
            exclude_origin: bool,
        ) -> SyncResult<Vec<SyncMessageDto>> {
            let all = self.download_all(device_id, exclude_origin).await?;
            Ok(all
                .into_iter()
                .filter(|dto| dto.entity_type == kind)
                .collect())
        }
    }
}

#![allow(dead_code)]

use slate_store::{OutboxStore, RegistryStore};
use slate_sync::transport::mock::MockTransport;
use slate_sync::{
    DeviceRegistrar, MemoryEntityStore, StaticSession, SyncConfig, SyncOrchestrator, SyncTransport,
};
use slate_types::{
    CrdtKey, DeviceId, EntityKind, HlcClock, HlcTimestamp, NodeId, OperationKind, SyncEntity,
    SyncMessageDto,
};
use std::sync::Arc;
use std::time::Duration;

/// A minimal synchronizable course for sync tests.
pub struct TestCourse {
    pub key: String,
    pub title: String,
    pub deleted: bool,
    pub node: String,
}

impl TestCourse {
    pub fn new(key: &str, title: &str) -> Self {
        Self {
            key: key.to_string(),
            title: title.to_string(),
            deleted: false,
            node: "test-node".to_string(),
        }
    }
}

impl SyncEntity for TestCourse {
    fn crdt_key(&self) -> CrdtKey {
        CrdtKey::new(self.key.clone())
    }

    fn created_at(&self) -> HlcTimestamp {
        HlcTimestamp::new(1, 0, NodeId::new(self.node.clone()))
    }

    fn updated_at(&self) -> HlcTimestamp {
        HlcTimestamp::new(2, 0, NodeId::new(self.node.clone()))
    }

    fn is_deleted(&self) -> bool {
        self.deleted
    }

    fn node_id(&self) -> NodeId {
        NodeId::new(self.node.clone())
    }

    fn kind(&self) -> EntityKind {
        EntityKind::Course
    }

    fn to_payload(&self) -> slate_types::Result<String> {
        Ok(serde_json::json!({
            "crdtKey": self.key,
            "title": self.title,
            "isDeleted": self.deleted,
            "nodeId": self.node,
        })
        .to_string())
    }
}

/// Builds an update message as another device would author it.
pub fn remote_update(key: &str, title: &str, wall: u64, counter: u32, node: &str) -> SyncMessageDto {
    SyncMessageDto {
        crdt_key: CrdtKey::new(key),
        entity_type: EntityKind::Course,
        operation_type: OperationKind::Update,
        device_id: DeviceId::new(node),
        timestamp: HlcTimestamp::new(wall, counter, NodeId::new(node)),
        payload: serde_json::json!({ "crdtKey": key, "title": title, "isDeleted": false })
            .to_string(),
        user_id: "user-1".to_string(),
    }
}

/// Builds a tombstone message as another device would author it.
pub fn remote_delete(key: &str, wall: u64, counter: u32, node: &str) -> SyncMessageDto {
    SyncMessageDto {
        crdt_key: CrdtKey::new(key),
        entity_type: EntityKind::Course,
        operation_type: OperationKind::Delete,
        device_id: DeviceId::new(node),
        timestamp: HlcTimestamp::new(wall, counter, NodeId::new(node)),
        payload: String::new(),
        user_id: "user-1".to_string(),
    }
}

/// A fully wired orchestrator over in-memory stores and the mock relay.
pub struct Harness {
    pub clock: Arc<HlcClock>,
    pub outbox: Arc<OutboxStore>,
    pub transport: Arc<MockTransport>,
    pub entities: Arc<MemoryEntityStore>,
    pub session: Arc<StaticSession>,
    pub device: DeviceId,
    pub orchestrator: SyncOrchestrator,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: SyncConfig) -> Self {
        let transport = Arc::new(MockTransport::new());
        Self::build(config, transport.clone(), transport)
    }

    /// Wires the orchestrator over `transport` while keeping direct access
    /// to the `mock` behind it (for wrapper transports).
    pub fn build(
        config: SyncConfig,
        transport: Arc<dyn SyncTransport>,
        mock: Arc<MockTransport>,
    ) -> Self {
        let device = DeviceId::new("device-a");
        let clock = Arc::new(HlcClock::new(device.as_node()));
        let outbox = Arc::new(OutboxStore::open_in_memory().unwrap());
        let registry = Arc::new(RegistryStore::open_in_memory().unwrap());
        let entities = Arc::new(MemoryEntityStore::new());
        let session = Arc::new(StaticSession::signed_in("user-1"));

        let registrar = DeviceRegistrar::new(registry, transport.clone(), "test-device");
        let orchestrator = SyncOrchestrator::new(
            config,
            clock.clone(),
            outbox.clone(),
            registrar,
            transport,
            entities.clone(),
            session.clone(),
        );

        Self {
            clock,
            outbox,
            transport: mock,
            entities,
            session,
            device,
            orchestrator,
        }
    }

    /// Appends a local course update to the outbox.
    pub fn enqueue_update(&self, key: &str, title: &str) -> i64 {
        self.outbox
            .enqueue(
                &TestCourse::new(key, title),
                OperationKind::Update,
                &self.clock,
                &self.device,
                "user-1",
            )
            .unwrap()
            .local_id
            .unwrap()
    }
}

/// Opt-in tracing output for debugging a test run
/// (`RUST_LOG=slate_sync=debug cargo test`).
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

/// A config with backoff trimmed down for tests.
pub fn test_config() -> SyncConfig {
    SyncConfig {
        backoff_base: Duration::from_millis(1),
        backoff_cap: Duration::from_millis(10),
        ..SyncConfig::default()
    }
}

use slate_types::{
    CrdtKey, DeviceId, EntityKind, HlcTimestamp, NodeId, OperationKind, SyncMessage,
    SyncMessageDto, SyncStatus,
};

fn message() -> SyncMessage {
    SyncMessage::new(
        CrdtKey::new("course-1"),
        EntityKind::Course,
        OperationKind::Update,
        DeviceId::new("device-a"),
        HlcTimestamp::new(1000, 2, NodeId::new("device-a")),
        r#"{"title":"Math"}"#.to_string(),
        "user-1",
    )
}

// ── Construction ─────────────────────────────────────────────────

#[test]
fn new_message_is_pending_and_unpersisted() {
    let m = message();
    assert_eq!(m.status, SyncStatus::Pending);
    assert_eq!(m.local_id, None);
    assert_eq!(m.last_sync_attempt, None);
    assert_eq!(m.sync_error, None);
}

// ── Wire conversion ──────────────────────────────────────────────

#[test]
fn to_dto_drops_local_fields() {
    let mut m = message();
    m.local_id = Some(17);
    m.status = SyncStatus::Failed;
    m.sync_error = Some("boom".to_string());

    let dto = m.to_dto();
    let json = serde_json::to_value(&dto).unwrap();
    assert!(json.get("localId").is_none());
    assert!(json.get("syncStatus").is_none());
    assert!(json.get("syncError").is_none());
    assert_eq!(json["crdtKey"], "course-1");
}

#[test]
fn dto_wire_field_names() {
    let json = serde_json::to_value(message().to_dto()).unwrap();
    assert_eq!(json["crdtKey"], "course-1");
    assert_eq!(json["entityType"], "course");
    assert_eq!(json["operationType"], "UPDATE");
    assert_eq!(json["deviceId"], "device-a");
    assert_eq!(json["userId"], "user-1");
    assert_eq!(json["timestamp"]["wallClockTime"], 1000);
    assert_eq!(json["timestamp"]["logicalTime"], 2);
    assert_eq!(json["timestamp"]["nodeId"], "device-a");
}

#[test]
fn dto_roundtrip() {
    let dto = message().to_dto();
    let json = serde_json::to_string(&dto).unwrap();
    let back: SyncMessageDto = serde_json::from_str(&json).unwrap();
    assert_eq!(dto, back);
}

// ── Enums ────────────────────────────────────────────────────────

#[test]
fn status_parse_roundtrip() {
    for status in [
        SyncStatus::Pending,
        SyncStatus::Uploading,
        SyncStatus::Synced,
        SyncStatus::Failed,
    ] {
        assert_eq!(status.as_str().parse::<SyncStatus>().unwrap(), status);
    }
}

#[test]
fn status_parse_rejects_unknown() {
    assert!("DONE".parse::<SyncStatus>().is_err());
}

#[test]
fn entity_kind_parse_roundtrip() {
    for kind in EntityKind::ALL {
        assert_eq!(kind.as_str().parse::<EntityKind>().unwrap(), kind);
    }
}

#[test]
fn entity_kind_rejects_unknown() {
    assert!("lecture".parse::<EntityKind>().is_err());
}

#[test]
fn operation_parse_roundtrip() {
    for op in [
        OperationKind::Create,
        OperationKind::Update,
        OperationKind::Delete,
    ] {
        assert_eq!(op.as_str().parse::<OperationKind>().unwrap(), op);
    }
}

// ── Ids ──────────────────────────────────────────────────────────

#[test]
fn device_id_generation_is_unique() {
    assert_ne!(DeviceId::generate(), DeviceId::generate());
}

#[test]
fn device_id_as_node_preserves_value() {
    let device = DeviceId::new("dev-1");
    assert_eq!(device.as_node().as_str(), "dev-1");
}

#[test]
fn node_id_orders_by_bytes() {
    assert!(NodeId::new("A") < NodeId::new("B"));
    assert!(NodeId::new("b") > NodeId::new("B"));
}

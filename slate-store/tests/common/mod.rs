use slate_types::{CrdtKey, EntityKind, HlcTimestamp, NodeId, SyncEntity};

/// A minimal synchronizable course for store tests.
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

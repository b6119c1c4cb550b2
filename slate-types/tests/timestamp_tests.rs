use slate_types::{HlcTimestamp, NodeId};

fn ts(wall: u64, counter: u32, node: &str) -> HlcTimestamp {
    HlcTimestamp::new(wall, counter, NodeId::new(node))
}

// ── Construction ─────────────────────────────────────────────────

#[test]
fn new_from_components() {
    let t = ts(42, 7, "device-a");
    assert_eq!(t.wall_ms(), 42);
    assert_eq!(t.counter(), 7);
    assert_eq!(t.node().as_str(), "device-a");
}

#[test]
fn display_format() {
    let t = ts(1000, 3, "n1");
    assert_eq!(t.to_string(), "1000:3@n1");
}

// ── Ordering ─────────────────────────────────────────────────────

#[test]
fn ordering_by_wall_time() {
    assert!(ts(100, 5, "z") < ts(200, 0, "a"));
}

#[test]
fn ordering_by_counter_when_wall_equal() {
    assert!(ts(100, 0, "z") < ts(100, 1, "a"));
}

#[test]
fn ordering_by_node_when_wall_and_counter_equal() {
    assert!(ts(100, 0, "A") < ts(100, 0, "B"));
    assert!(ts(100, 0, "B") > ts(100, 0, "A"));
}

#[test]
fn equal_timestamps() {
    let a = ts(100, 5, "n");
    let b = ts(100, 5, "n");
    assert_eq!(a, b);
    assert!(!(a < b));
    assert!(!(a > b));
}

#[test]
fn distinct_nodes_never_compare_equal() {
    let a = ts(100, 5, "a");
    let b = ts(100, 5, "b");
    assert_ne!(a, b);
    assert!(a < b || b < a);
}

#[test]
fn partial_ord_consistent_with_ord() {
    let a = ts(50, 1, "x");
    let b = ts(50, 2, "x");
    assert_eq!(a.partial_cmp(&b), Some(std::cmp::Ordering::Less));
}

// ── is_before / is_after ─────────────────────────────────────────

#[test]
fn is_before_and_after() {
    let a = ts(1, 0, "n");
    let b = ts(2, 0, "n");
    assert!(a.is_before(&b));
    assert!(b.is_after(&a));
    assert!(!b.is_before(&a));
    assert!(!a.is_after(&b));
}

// ── Wire format ──────────────────────────────────────────────────

#[test]
fn serde_uses_wire_field_names() {
    let t = ts(1700000000000, 4, "device-a");
    let json = serde_json::to_value(&t).unwrap();
    assert_eq!(json["wallClockTime"], 1700000000000u64);
    assert_eq!(json["logicalTime"], 4);
    assert_eq!(json["nodeId"], "device-a");
}

#[test]
fn serde_roundtrip() {
    let t = ts(123, 456, "node-9");
    let json = serde_json::to_string(&t).unwrap();
    let back: HlcTimestamp = serde_json::from_str(&json).unwrap();
    assert_eq!(t, back);
}

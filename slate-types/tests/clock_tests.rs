use proptest::prelude::*;
use slate_types::{HlcClock, HlcTimestamp, NodeId};

fn clock(node: &str) -> HlcClock {
    HlcClock::new(NodeId::new(node))
}

// ── now ──────────────────────────────────────────────────────────

#[test]
fn now_is_strictly_increasing() {
    let c = clock("a");
    let mut prev = c.now();
    for _ in 0..1000 {
        let next = c.now();
        assert!(next > prev);
        prev = next;
    }
}

#[test]
fn now_carries_node_identity() {
    let c = clock("device-7");
    assert_eq!(c.now().node().as_str(), "device-7");
    assert_eq!(c.node().as_str(), "device-7");
}

// ── observe ──────────────────────────────────────────────────────

#[test]
fn observe_advances_past_remote_future() {
    let c = clock("a");
    let far_future = u64::MAX / 2;
    let remote = HlcTimestamp::new(far_future, 9, NodeId::new("b"));

    let advanced = c.observe(&remote);
    assert!(advanced > remote);
    assert_eq!(advanced.wall_ms(), far_future);
    assert_eq!(advanced.counter(), 10);
}

#[test]
fn observe_result_is_local_node() {
    let c = clock("a");
    let remote = HlcTimestamp::new(u64::MAX / 2, 0, NodeId::new("b"));
    assert_eq!(c.observe(&remote).node().as_str(), "a");
}

#[test]
fn observe_equal_walls_takes_max_counter() {
    let c = clock("a");
    let wall = u64::MAX / 2;
    // First observe pins the local wall to the remote's.
    let first = c.observe(&HlcTimestamp::new(wall, 3, NodeId::new("b")));
    assert_eq!((first.wall_ms(), first.counter()), (wall, 4));

    // Same wall on both sides now: counter goes past both.
    let second = c.observe(&HlcTimestamp::new(wall, 20, NodeId::new("b")));
    assert_eq!((second.wall_ms(), second.counter()), (wall, 21));

    // Remote behind: local side wins the counter race.
    let third = c.observe(&HlcTimestamp::new(wall, 0, NodeId::new("b")));
    assert_eq!((third.wall_ms(), third.counter()), (wall, 22));
}

#[test]
fn observe_of_stale_remote_still_advances() {
    let c = clock("a");
    let old = HlcTimestamp::new(1, 0, NodeId::new("b"));
    let before = c.now();
    let advanced = c.observe(&old);
    assert!(advanced > before);
    assert!(advanced > old);
}

#[test]
fn now_after_observe_is_causally_after_remote() {
    let c = clock("a");
    let remote = HlcTimestamp::new(u64::MAX / 2, 100, NodeId::new("b"));
    let _ = c.observe(&remote);
    assert!(c.now() > remote);
}

// ── skew ─────────────────────────────────────────────────────────

#[test]
fn skew_ahead_for_future_timestamp() {
    let remote = HlcTimestamp::new(u64::MAX / 2, 0, NodeId::new("b"));
    assert!(HlcClock::skew_ahead_ms(&remote) > 0);
}

#[test]
fn skew_zero_for_past_timestamp() {
    let remote = HlcTimestamp::new(1, 0, NodeId::new("b"));
    assert_eq!(HlcClock::skew_ahead_ms(&remote), 0);
}

// ── Monotonicity under interleaving ──────────────────────────────

proptest! {
    /// Any interleaving of local ticks and remote observations yields a
    /// strictly increasing timestamp sequence.
    #[test]
    fn interleaved_now_and_observe_is_monotonic(
        ops in prop::collection::vec((any::<bool>(), 0u64..2_000_000_000_000, 0u32..100), 1..50),
    ) {
        let c = clock("local");
        let mut prev = c.now();
        for (is_observe, wall, counter) in ops {
            let next = if is_observe {
                c.observe(&HlcTimestamp::new(wall, counter, NodeId::new("remote")))
            } else {
                c.now()
            };
            prop_assert!(next > prev);
            prev = next;
        }
    }
}

//! The process-wide Hybrid Logical Clock.
//!
//! One clock exists per device. `now()` issues timestamps for local
//! mutations; `observe()` folds in a remote timestamp so everything issued
//! afterwards is causally after it. Pure computation over `SystemTime` —
//! the clock never blocks and never fails.

use crate::{HlcTimestamp, NodeId};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

/// A Hybrid Logical Clock bound to one node identity.
///
/// Shareable across tasks; the wall/counter state sits behind a mutex held
/// only for the few instructions of the HLC recurrence.
#[derive(Debug)]
pub struct HlcClock {
    node: NodeId,
    last: Mutex<(u64, u32)>,
}

impl HlcClock {
    /// Creates a clock for the given node.
    #[must_use]
    pub fn new(node: NodeId) -> Self {
        Self {
            node,
            last: Mutex::new((0, 0)),
        }
    }

    /// Returns this clock's node identity.
    #[must_use]
    pub fn node(&self) -> &NodeId {
        &self.node
    }

    /// Issues a timestamp strictly greater than any previously issued or
    /// observed by this clock.
    #[must_use]
    pub fn now(&self) -> HlcTimestamp {
        let physical = Self::physical_now_ms();
        let mut last = self.last.lock().unwrap();
        let (wall, counter) = if physical > last.0 {
            (physical, 0)
        } else {
            (last.0, last.1.saturating_add(1))
        };
        *last = (wall, counter);
        HlcTimestamp::new(wall, counter, self.node.clone())
    }

    /// Merges a received timestamp into the clock and returns the advanced
    /// local timestamp.
    ///
    /// Implements the HLC receive recurrence: the new wall time is the max of
    /// local, remote, and physical time; equal-wall cases advance the counter
    /// past the winning side(s), and a fresh physical time resets it to 0.
    #[must_use]
    pub fn observe(&self, remote: &HlcTimestamp) -> HlcTimestamp {
        let physical = Self::physical_now_ms();
        let mut last = self.last.lock().unwrap();
        let (local_wall, local_counter) = *last;
        let remote_wall = remote.wall_ms();
        let remote_counter = remote.counter();

        let wall = physical.max(local_wall).max(remote_wall);
        let counter = if wall == local_wall && wall == remote_wall {
            local_counter.max(remote_counter).saturating_add(1)
        } else if wall == local_wall {
            local_counter.saturating_add(1)
        } else if wall == remote_wall {
            remote_counter.saturating_add(1)
        } else {
            0
        };

        *last = (wall, counter);
        HlcTimestamp::new(wall, counter, self.node.clone())
    }

    /// How far ahead of this device's physical clock a remote timestamp is,
    /// in milliseconds. Zero when the remote is not ahead.
    #[must_use]
    pub fn skew_ahead_ms(remote: &HlcTimestamp) -> u64 {
        remote.wall_ms().saturating_sub(Self::physical_now_ms())
    }

    fn physical_now_ms() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before Unix epoch")
            .as_millis() as u64
    }
}

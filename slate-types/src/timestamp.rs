//! Hybrid Logical Clock timestamps for causal ordering.
//!
//! Combines physical time with a logical counter and the authoring node so
//! that:
//! - timestamps from one node are strictly increasing
//! - if A happens-before B, then ts(A) < ts(B)
//! - any two distinct timestamps in the system are totally ordered
//!
//! Based on the HLC algorithm from "Logical Physical Clocks" (Kulkarni et al.).

use crate::NodeId;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// A Hybrid Logical Clock timestamp.
///
/// Totally ordered lexicographically by `(wall_ms, counter, node)`. The node
/// component makes the order total: two devices can produce the same
/// wall/counter pair, but never the same node id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HlcTimestamp {
    /// Physical time component (milliseconds since Unix epoch).
    #[serde(rename = "wallClockTime")]
    wall_ms: u64,
    /// Logical counter for events sharing the same wall time.
    #[serde(rename = "logicalTime")]
    counter: u32,
    /// The node that issued this timestamp.
    #[serde(rename = "nodeId")]
    node: NodeId,
}

impl HlcTimestamp {
    /// Creates a timestamp from components.
    #[must_use]
    pub fn new(wall_ms: u64, counter: u32, node: NodeId) -> Self {
        Self {
            wall_ms,
            counter,
            node,
        }
    }

    /// Returns the wall clock component in milliseconds since epoch.
    #[must_use]
    pub const fn wall_ms(&self) -> u64 {
        self.wall_ms
    }

    /// Returns the logical counter.
    #[must_use]
    pub const fn counter(&self) -> u32 {
        self.counter
    }

    /// Returns the issuing node.
    #[must_use]
    pub fn node(&self) -> &NodeId {
        &self.node
    }

    /// Returns true if this timestamp is causally before the other.
    #[must_use]
    pub fn is_before(&self, other: &Self) -> bool {
        self < other
    }

    /// Returns true if this timestamp is causally after the other.
    #[must_use]
    pub fn is_after(&self, other: &Self) -> bool {
        self > other
    }
}

impl PartialOrd for HlcTimestamp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HlcTimestamp {
    fn cmp(&self, other: &Self) -> Ordering {
        self.wall_ms
            .cmp(&other.wall_ms)
            .then_with(|| self.counter.cmp(&other.counter))
            .then_with(|| self.node.cmp(&other.node))
    }
}

impl fmt::Display for HlcTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}@{}", self.wall_ms, self.counter, self.node)
    }
}

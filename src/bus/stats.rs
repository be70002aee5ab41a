//! # Read-only bus statistics.
//!
//! [`BusStats`] is the observability contract: a point-in-time snapshot
//! with no side effects, cheap enough to expose to an operational probe on
//! every poll.

use serde::Serialize;

/// Point-in-time snapshot of bus occupancy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct BusStats {
    /// Number of currently active subscribers.
    pub subscriber_count: usize,
    /// Number of events currently held for replay.
    pub buffer_size: usize,
    /// Maximum number of events the replay buffer retains.
    pub buffer_capacity: usize,
}

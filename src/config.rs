//! # Global bus configuration.
//!
//! Provides [`BusConfig`] centralized settings for the event bus runtime.
//!
//! Config is consumed once at bus creation: `EventBus::new(config)`.
//!
//! ## Sentinel values
//! - `heartbeat = 0s` → heartbeat emission disabled
//! - `buffer_capacity` and `queue_capacity` are clamped to a minimum of 1

use std::time::Duration;

use crate::policies::OverflowPolicy;

/// Global configuration for the event bus.
///
/// Defines:
/// - **Replay**: ring buffer capacity for late-joining subscribers
/// - **Backpressure**: per-subscriber queue capacity and overflow policy
/// - **Liveness**: heartbeat interval and the server identity it carries
///
/// ## Field semantics
/// - `buffer_capacity`: events retained for replay (min 1; clamped)
/// - `queue_capacity`: per-subscriber outbound queue depth (min 1; clamped)
/// - `heartbeat`: interval between liveness events (`0s` = disabled)
/// - `server_id`: identity stamped into heartbeat payloads
/// - `overflow`: behavior when a subscriber's queue is full
#[derive(Clone, Debug)]
pub struct BusConfig {
    /// Number of recent non-heartbeat events retained for replay.
    ///
    /// A `replay=true` subscription receives up to this many buffered
    /// events, oldest first, before any live event.
    pub buffer_capacity: usize,

    /// Capacity of each subscriber's outbound queue.
    ///
    /// When a queue is full, [`BusConfig::overflow`] decides what happens.
    /// Should be at least `buffer_capacity` if replay batches must never
    /// trigger the overflow policy on a fresh subscription.
    pub queue_capacity: usize,

    /// Interval between heartbeat events.
    ///
    /// - `Duration::ZERO` = heartbeats disabled
    /// - `> 0` = one heartbeat per interval while subscribers are connected
    pub heartbeat: Duration,

    /// Server identity carried in heartbeat payloads.
    pub server_id: String,

    /// Backpressure policy applied when a subscriber's queue is full.
    pub overflow: OverflowPolicy,
}

impl BusConfig {
    /// Returns the heartbeat interval as an `Option`.
    ///
    /// - `None` → heartbeats disabled
    /// - `Some(d)` → emit one heartbeat per `d`
    #[inline]
    pub fn heartbeat_interval(&self) -> Option<Duration> {
        if self.heartbeat == Duration::ZERO {
            None
        } else {
            Some(self.heartbeat)
        }
    }

    /// Returns the ring buffer capacity clamped to a minimum of 1.
    #[inline]
    pub fn buffer_capacity_clamped(&self) -> usize {
        self.buffer_capacity.max(1)
    }

    /// Returns the per-subscriber queue capacity clamped to a minimum of 1.
    #[inline]
    pub fn queue_capacity_clamped(&self) -> usize {
        self.queue_capacity.max(1)
    }
}

impl Default for BusConfig {
    /// Default configuration:
    ///
    /// - `buffer_capacity = 100` (replay window)
    /// - `queue_capacity = 256` (covers a full replay batch plus live burst)
    /// - `heartbeat = 30s`
    /// - `server_id = "pipebus"`
    /// - `overflow = OverflowPolicy::DropOldest`
    fn default() -> Self {
        Self {
            buffer_capacity: 100,
            queue_capacity: 256,
            heartbeat: Duration::from_secs(30),
            server_id: "pipebus".to_string(),
            overflow: OverflowPolicy::default(),
        }
    }
}

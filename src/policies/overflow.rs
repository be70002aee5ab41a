//! # Overflow policy for full subscriber queues.
//!
//! [`OverflowPolicy`] controls what the bus does when an event must be
//! enqueued onto a subscriber whose queue is already at capacity. Whatever
//! the choice, the publisher itself is never blocked and never sees an
//! error; the consequences land on the affected subscriber only.

/// Behavior when a subscriber's bounded queue is full.
///
/// ## Semantics
/// - [`OverflowPolicy::DropOldest`]: evict that subscriber's single oldest
///   queued event, increment its drop counter, enqueue the new one. Fresh
///   events stay live at the cost of stale backlog; the loss is observable
///   via the subscriber's `dropped_count`.
/// - [`OverflowPolicy::Disconnect`]: close the subscriber instead of
///   shedding events. Its delivery pump observes the terminal signal and the
///   consumer is expected to reconnect (optionally with replay).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OverflowPolicy {
    /// Evict the oldest queued event and count the drop.
    #[default]
    DropOldest,
    /// Close the subscriber on overflow.
    Disconnect,
}

impl OverflowPolicy {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            OverflowPolicy::DropOldest => "drop_oldest",
            OverflowPolicy::Disconnect => "disconnect",
        }
    }
}

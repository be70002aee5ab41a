//! Backpressure policies for subscriber delivery.
//!
//! A publisher must never wait on a slow consumer, so when a subscriber's
//! bounded queue is full something has to give. [`OverflowPolicy`] selects
//! what: shed the subscriber's stale backlog, or disconnect the subscriber.

mod overflow;

pub use overflow::OverflowPolicy;

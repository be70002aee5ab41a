//! # Per-connection subscribers and their delivery queues.
//!
//! Each connected observer is represented by a subscriber: an identity, an
//! optional correlation filter, a bounded outbound queue written by the bus,
//! and a [`Subscription`] handle drained by exactly one delivery pump.
//!
//! ## Architecture
//! ```text
//! publish(event)
//!     │
//!     ├──► [queue S1] ──► Subscription::next() ──► delivery pump 1
//!     │    (bounded)
//!     ├──► [queue S2] ──► Subscription::next() ──► delivery pump 2
//!     └──► [queue SN] ──► Subscription::next() ──► delivery pump N
//!          (bounded)
//! ```
//!
//! ## Rules
//! - **SPSC discipline**: the bus is the sole writer of a queue, the pump
//!   its sole reader; no other party touches it.
//! - **Isolation**: a slow or disconnected subscriber never delays the
//!   publisher or other subscribers.
//! - **Per-subscriber FIFO**: each subscriber sees matching events in
//!   publish order.
//! - **Close wakes the pump**: a pump suspended on an empty queue observes
//!   the terminal signal instead of blocking forever.

mod queue;
mod subscriber;

pub(crate) use queue::{DeliveryQueue, Enqueue};
pub(crate) use subscriber::SubscriberSlot;
pub use subscriber::{SubscriberId, SubscriberState, Subscription};

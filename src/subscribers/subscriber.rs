//! # Subscriber identity, lifecycle, and the consumer-side handle.
//!
//! A subscriber is created by `EventBus::subscribe` and lives in the bus
//! registry as a [`SubscriberSlot`] (bus-side write half) while the caller
//! holds a [`Subscription`] (pump-side read half). Both halves share one
//! [`DeliveryQueue`](crate::subscribers::DeliveryQueue).
//!
//! ## Lifecycle
//! ```text
//! Connecting ──registration──► Active ──┬─ explicit unsubscribe ─┐
//!                                       ├─ handle dropped        ├──► Closed
//!                                       ├─ overflow disconnect   │   (terminal)
//!                                       └─ bus shutdown ─────────┘
//! ```
//! Closed is terminal; a double-close is a no-op, not an error.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::Stream;
use uuid::Uuid;

use crate::events::Event;
use crate::subscribers::DeliveryQueue;

/// Unique identity of a subscriber connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriberId(Uuid);

impl SubscriberId {
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Lifecycle state of a subscriber.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubscriberState {
    /// Being set up inside the subscribe critical section.
    Connecting,
    /// Registered; receiving matching events.
    Active,
    /// Terminal. The pump observes end-of-stream.
    Closed,
}

impl SubscriberState {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            SubscriberState::Connecting => "connecting",
            SubscriberState::Active => "active",
            SubscriberState::Closed => "closed",
        }
    }
}

/// Bus-side registry entry: the write half of a subscriber.
pub(crate) struct SubscriberSlot {
    pub(crate) id: SubscriberId,
    pub(crate) filter: Option<String>,
    pub(crate) queue: Arc<DeliveryQueue>,
    pub(crate) connected_at: DateTime<Utc>,
}

/// Consumer-side handle: the read half of a subscriber.
///
/// Exactly one delivery pump drains a subscription; `next` therefore takes
/// `&mut self`. Dropping the handle closes the subscriber (detected
/// consumer disconnect) — the bus reaps the registry entry on its next
/// publish.
pub struct Subscription {
    id: SubscriberId,
    filter: Option<String>,
    connected_at: DateTime<Utc>,
    queue: Arc<DeliveryQueue>,
}

impl Subscription {
    pub(crate) fn new(
        id: SubscriberId,
        filter: Option<String>,
        connected_at: DateTime<Utc>,
        queue: Arc<DeliveryQueue>,
    ) -> Self {
        Self {
            id,
            filter,
            connected_at,
            queue,
        }
    }

    /// Takes the next delivered event.
    ///
    /// Suspends while the queue is empty and the subscriber is active;
    /// resumes when an event is enqueued or the subscriber is closed.
    /// Returns `None` once closed — the terminal signal.
    pub async fn next(&mut self) -> Option<Arc<Event>> {
        self.queue.next().await
    }

    /// Adapts this handle into a [`futures::Stream`] of events.
    ///
    /// The stream ends when the subscriber is closed. Dropping the stream
    /// closes the subscriber, same as dropping the handle.
    pub fn into_stream(self) -> impl Stream<Item = Arc<Event>> + Send {
        futures::stream::unfold(self, |mut sub| async move {
            sub.next().await.map(|event| (event, sub))
        })
    }

    /// Identity of this subscriber.
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Correlation filter this subscriber was registered with.
    pub fn filter(&self) -> Option<&str> {
        self.filter.as_deref()
    }

    /// When this subscriber was registered.
    pub fn connected_at(&self) -> DateTime<Utc> {
        self.connected_at
    }

    /// Events dropped from this subscriber's queue so far. Monotonic;
    /// the only signal that delivery loss occurred.
    pub fn dropped_count(&self) -> u64 {
        self.queue.dropped_count()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SubscriberState {
        self.queue.state()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.queue.close();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("filter", &self.filter)
            .field("state", &self.state())
            .field("dropped", &self.dropped_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_drop_closes_queue() {
        let queue = Arc::new(DeliveryQueue::new(4));
        queue.activate();
        let sub = Subscription::new(SubscriberId::new(), None, Utc::now(), Arc::clone(&queue));
        assert_eq!(sub.state(), SubscriberState::Active);
        drop(sub);
        assert!(queue.is_closed());
        assert_eq!(queue.state(), SubscriberState::Closed);
    }

    #[tokio::test]
    async fn test_next_returns_none_after_close() {
        let queue = Arc::new(DeliveryQueue::new(4));
        queue.activate();
        let mut sub =
            Subscription::new(SubscriberId::new(), None, Utc::now(), Arc::clone(&queue));
        queue.close();
        assert!(sub.next().await.is_none());
    }

    #[tokio::test]
    async fn test_into_stream_yields_until_close() {
        use crate::events::EventKind;
        use futures::StreamExt;
        use serde_json::json;

        let queue = Arc::new(DeliveryQueue::new(4));
        queue.activate();
        for id in 1..=2 {
            queue
                .push(Arc::new(Event::stamped(id, EventKind::StepLog, json!({}), None)))
                .await;
        }

        let sub = Subscription::new(SubscriberId::new(), None, Utc::now(), Arc::clone(&queue));
        let stream = sub.into_stream();
        futures::pin_mut!(stream);
        assert_eq!(stream.next().await.map(|e| e.id), Some(1));
        assert_eq!(stream.next().await.map(|e| e.id), Some(2));
        queue.close();
        assert!(stream.next().await.is_none());
    }
}

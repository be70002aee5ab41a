//! # Bounded delivery queue with non-blocking enqueue.
//!
//! [`DeliveryQueue`] is the single-producer/single-consumer channel between
//! the bus and one subscriber's delivery pump. Enqueue never suspends on a
//! full queue: the caller picks [`DeliveryQueue::push`] (drop-oldest) or
//! [`DeliveryQueue::try_push`] (report `Full`, used by the disconnect
//! policy). The pump side suspends on an empty queue and is woken by either
//! a new event or close.
//!
//! ## Rules
//! - The queue lock is held only to mutate the deque, never across a wait.
//! - `close()` is idempotent and wakes a suspended pump immediately.
//! - Enqueue onto a closed queue is silently discarded (`Discarded`);
//!   the publish/close race is expected and harmless.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};

use tokio::sync::{Mutex, Notify};
use tokio_util::sync::CancellationToken;

use crate::events::Event;
use crate::subscribers::SubscriberState;

const STATE_CONNECTING: u8 = 0;
const STATE_ACTIVE: u8 = 1;
const STATE_CLOSED: u8 = 2;

/// Outcome of an enqueue attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Enqueue {
    /// Event enqueued; queue had room.
    Delivered,
    /// Event enqueued after evicting the oldest entry (drop counted).
    DroppedOldest,
    /// Queue full and nothing evicted (only from `try_push`).
    Full,
    /// Queue already closed; event discarded.
    Discarded,
}

/// Bounded FIFO written by the bus and drained by one delivery pump.
pub(crate) struct DeliveryQueue {
    capacity: usize,
    items: Mutex<VecDeque<Arc<Event>>>,
    notify: Notify,
    closed: CancellationToken,
    dropped: AtomicU64,
    state: AtomicU8,
}

impl DeliveryQueue {
    /// Creates an empty queue in the `Connecting` state.
    pub(crate) fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            items: Mutex::new(VecDeque::with_capacity(capacity)),
            notify: Notify::new(),
            closed: CancellationToken::new(),
            dropped: AtomicU64::new(0),
            state: AtomicU8::new(STATE_CONNECTING),
        }
    }

    /// Marks the subscriber `Active`. A no-op unless currently `Connecting`,
    /// so a close racing with registration is never resurrected.
    pub(crate) fn activate(&self) {
        let _ = self.state.compare_exchange(
            STATE_CONNECTING,
            STATE_ACTIVE,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }

    /// Current lifecycle state.
    pub(crate) fn state(&self) -> SubscriberState {
        match self.state.load(Ordering::Acquire) {
            STATE_CONNECTING => SubscriberState::Connecting,
            STATE_ACTIVE => SubscriberState::Active,
            _ => SubscriberState::Closed,
        }
    }

    /// Transitions to `Closed` and wakes a suspended pump. Idempotent.
    pub(crate) fn close(&self) {
        self.state.store(STATE_CLOSED, Ordering::Release);
        self.closed.cancel();
    }

    /// True once `close()` has run.
    pub(crate) fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    /// Total events dropped from this queue so far. Monotonic.
    pub(crate) fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Acquire)
    }

    /// Enqueues with the drop-oldest policy: at capacity, the oldest queued
    /// event is evicted and counted before the new one goes in.
    pub(crate) async fn push(&self, event: Arc<Event>) -> Enqueue {
        if self.is_closed() {
            return Enqueue::Discarded;
        }
        let mut items = self.items.lock().await;
        let outcome = if items.len() == self.capacity {
            items.pop_front();
            self.dropped.fetch_add(1, Ordering::AcqRel);
            Enqueue::DroppedOldest
        } else {
            Enqueue::Delivered
        };
        items.push_back(event);
        drop(items);
        self.notify.notify_one();
        outcome
    }

    /// Enqueues only if there is room; reports `Full` otherwise without
    /// evicting anything. Used by the disconnect-on-overflow policy.
    pub(crate) async fn try_push(&self, event: Arc<Event>) -> Enqueue {
        if self.is_closed() {
            return Enqueue::Discarded;
        }
        let mut items = self.items.lock().await;
        if items.len() == self.capacity {
            return Enqueue::Full;
        }
        items.push_back(event);
        drop(items);
        self.notify.notify_one();
        Enqueue::Delivered
    }

    /// Takes the next event, suspending while the queue is empty.
    ///
    /// Returns `None` once the queue is closed; events still queued at
    /// close time are released, not drained.
    pub(crate) async fn next(&self) -> Option<Arc<Event>> {
        loop {
            let wake = self.notify.notified();
            if self.is_closed() {
                return None;
            }
            if let Some(event) = self.items.lock().await.pop_front() {
                return Some(event);
            }
            tokio::select! {
                _ = wake => {}
                _ = self.closed.cancelled() => return None,
            }
        }
    }

    /// Number of events currently queued.
    #[cfg(test)]
    pub(crate) async fn len(&self) -> usize {
        self.items.lock().await.len()
    }
}

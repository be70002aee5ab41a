//! # Bounded replay buffer for recent events.
//!
//! [`RingBuffer`] keeps the most recent non-heartbeat events in arrival
//! order so late-joining subscribers can catch up. It is a plain in-memory
//! structure with no failure modes; the bus mutates it only inside its
//! critical section.
//!
//! ## Rules
//! - Insertion order = arrival order; snapshots are oldest-first.
//! - At capacity, inserting evicts the single oldest entry.
//! - Heartbeats are never stored here (the bus skips them), so they never
//!   appear in a snapshot.
//! - Entries are `Arc<Event>`: a snapshot clones pointers, not payloads.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::events::Event;

/// Fixed-capacity ordered store of recent events.
pub(crate) struct RingBuffer {
    capacity: usize,
    slots: VecDeque<Arc<Event>>,
}

impl RingBuffer {
    /// Creates an empty buffer holding at most `capacity` events.
    pub(crate) fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            slots: VecDeque::with_capacity(capacity),
        }
    }

    /// Appends an event, evicting the oldest entry when at capacity. O(1).
    pub(crate) fn append(&mut self, event: Arc<Event>) {
        if self.slots.len() == self.capacity {
            self.slots.pop_front();
        }
        self.slots.push_back(event);
    }

    /// Returns the current contents oldest-first, restricted to events
    /// matching `filter` (all events when `filter` is `None`).
    pub(crate) fn snapshot(&self, filter: Option<&str>) -> Vec<Arc<Event>> {
        self.slots
            .iter()
            .filter(|ev| ev.matches(filter))
            .cloned()
            .collect()
    }

    /// Number of events currently buffered.
    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    /// Maximum number of events this buffer retains.
    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    /// Empties the buffer.
    pub(crate) fn clear(&mut self) {
        self.slots.clear();
    }
}

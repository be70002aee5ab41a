//! # Event bus: id assignment, replay buffer, registry, fan-out.
//!
//! [`EventBus`] owns the replay [`RingBuffer`] and the subscriber registry
//! and serializes every mutation of them. It decouples producers from
//! consumers: publishing never waits on a subscriber, subscribing
//! atomically combines replay with registration, and a slow consumer's
//! backlog is shed by the configured [`OverflowPolicy`] instead of ever
//! back-pressuring the producer.
//!
//! ## High-level architecture
//! ```text
//! Producers (many):                        Subscribers (many):
//!   pipeline executor ──┐                      ┌──► [queue S1] ──► pump 1
//!   approval service  ──┼──► publish ──────────┼──► [queue S2] ──► pump 2
//!   heartbeat emitter ──┘        │             └──► [queue SN] ──► pump N
//!                                ▼
//!                          RingBuffer (replay)
//!
//! subscribe(filter, replay):
//!   └─ under the same critical section as publish:
//!        snapshot buffer → pre-fill queue → register Active
//! ```
//!
//! ## Rules
//! - **Linearizable**: publish / subscribe / unsubscribe / stats / shutdown
//!   all acquire the single bus lock; for any A published before B, every
//!   subscriber receiving both sees A before B.
//! - **Lock discipline**: the lock is held to mutate shared structures and
//!   enqueue copies; never across a consumer wait.
//! - **No producer-visible failure**: publish always returns the assigned
//!   id; delivery loss surfaces only on the affected subscriber's drop
//!   counter.
//! - **Lazy reaping**: a subscriber closed by handle drop is removed from
//!   the registry on the next publish.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::bus::heartbeat::{self, HeartbeatHandle};
use crate::bus::stats::BusStats;
use crate::config::BusConfig;
use crate::error::BusError;
use crate::events::{
    ApprovalRequested, ApprovalResolved, ErrorPayload, Event, EventKind, Heartbeat,
    PipelineCompleted, PipelineCreated, PipelineUpdated, RingBuffer, StepCompleted, StepLog,
    StepStarted,
};
use crate::policies::OverflowPolicy;
use crate::subscribers::{DeliveryQueue, Enqueue, SubscriberId, SubscriberSlot, Subscription};

/// Bus lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum BusState {
    Running,
    ShutDown,
}

/// State mutated only inside the bus critical section.
struct Inner {
    next_id: u64,
    buffer: RingBuffer,
    subscribers: HashMap<SubscriberId, SubscriberSlot>,
    state: BusState,
    heartbeat: Option<HeartbeatHandle>,
}

/// In-memory pub/sub bus for pipeline execution events.
///
/// Cheap to clone (internally `Arc`-backed); every producer and the
/// heartbeat emitter share one instance. While the heartbeat emitter is
/// running it holds a clone of the bus, so the bus stays alive until
/// [`EventBus::shutdown`].
///
/// ## Example
/// ```no_run
/// use pipebus::{BusConfig, EventBus, EventKind};
/// use serde_json::json;
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() {
///     let bus = EventBus::new(BusConfig::default());
///     bus.start_heartbeat().await;
///
///     let mut sub = bus
///         .subscribe(Some("pipeline-1"), true)
///         .await
///         .expect("bus is running");
///
///     bus.publish(
///         EventKind::StepLog,
///         json!({ "line": "compiling..." }),
///         Some("pipeline-1".to_string()),
///     )
///     .await;
///
///     let event = sub.next().await.expect("delivered");
///     println!("{} {}", event.id, event.kind);
///
///     bus.shutdown().await;
///     assert!(sub.next().await.is_none());
/// }
/// ```
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<Mutex<Inner>>,
    cfg: Arc<BusConfig>,
}

impl EventBus {
    /// Creates a running bus with an empty buffer and registry.
    pub fn new(cfg: BusConfig) -> Self {
        let buffer = RingBuffer::new(cfg.buffer_capacity_clamped());
        Self {
            inner: Arc::new(Mutex::new(Inner {
                next_id: 1,
                buffer,
                subscribers: HashMap::new(),
                state: BusState::Running,
                heartbeat: None,
            })),
            cfg: Arc::new(cfg),
        }
    }

    /// Publishes an event to every matching active subscriber.
    ///
    /// Assigns the next sequence id, appends the event to the replay
    /// buffer (heartbeats are skipped), then enqueues an `Arc` copy onto
    /// each matching subscriber's queue. Never blocks on a consumer: a
    /// full queue is handled by the configured [`OverflowPolicy`], and a
    /// write to an already-closed queue is silently discarded.
    ///
    /// Always succeeds from the caller's perspective and returns the
    /// assigned id.
    pub async fn publish(
        &self,
        kind: EventKind,
        data: Value,
        correlation: Option<String>,
    ) -> u64 {
        let mut inner = self.inner.lock().await;

        let id = inner.next_id;
        inner.next_id += 1;
        let event = Arc::new(Event::stamped(id, kind, data, correlation));

        if !event.kind.is_heartbeat() {
            inner.buffer.append(Arc::clone(&event));
        }

        let mut reap: Vec<SubscriberId> = Vec::new();
        for slot in inner.subscribers.values() {
            if slot.queue.is_closed() {
                reap.push(slot.id);
                continue;
            }
            if !event.matches(slot.filter.as_deref()) {
                continue;
            }
            match self.cfg.overflow {
                OverflowPolicy::DropOldest => match slot.queue.push(Arc::clone(&event)).await {
                    Enqueue::DroppedOldest => {
                        warn!(subscriber = %slot.id, "queue full, dropped oldest event");
                    }
                    Enqueue::Discarded => reap.push(slot.id),
                    _ => {}
                },
                OverflowPolicy::Disconnect => {
                    match slot.queue.try_push(Arc::clone(&event)).await {
                        Enqueue::Full => {
                            warn!(subscriber = %slot.id, "queue full, disconnecting subscriber");
                            slot.queue.close();
                            reap.push(slot.id);
                        }
                        Enqueue::Discarded => reap.push(slot.id),
                        _ => {}
                    }
                }
            }
        }
        for id in reap {
            if inner.subscribers.remove(&id).is_some() {
                info!(subscriber = %id, "subscriber reaped");
            }
        }

        debug!(id, kind = %event.kind, "event published");
        id
    }

    /// Registers a new subscriber and returns its [`Subscription`] handle.
    ///
    /// Atomically, under the same critical section as publish:
    /// 1. if `replay` is true, the replay buffer is snapshotted through
    ///    `filter` and pre-fills the new queue, oldest first;
    /// 2. the subscriber is registered as active.
    ///
    /// No event is both replayed and re-delivered live, and no event
    /// published after this call is missed.
    ///
    /// # Errors
    /// [`BusError::ShutDown`] once the bus has been shut down. Terminal;
    /// not worth retrying.
    pub async fn subscribe(
        &self,
        filter: Option<&str>,
        replay: bool,
    ) -> Result<Subscription, BusError> {
        let mut inner = self.inner.lock().await;
        if inner.state == BusState::ShutDown {
            return Err(BusError::ShutDown);
        }

        let id = SubscriberId::new();
        let connected_at = Utc::now();
        let queue = Arc::new(DeliveryQueue::new(self.cfg.queue_capacity_clamped()));

        if replay {
            for event in inner.buffer.snapshot(filter) {
                queue.push(event).await;
            }
        }
        queue.activate();

        inner.subscribers.insert(
            id,
            SubscriberSlot {
                id,
                filter: filter.map(str::to_string),
                queue: Arc::clone(&queue),
                connected_at,
            },
        );
        info!(subscriber = %id, ?filter, replay, "subscriber connected");

        Ok(Subscription::new(
            id,
            filter.map(str::to_string),
            connected_at,
            queue,
        ))
    }

    /// Closes a subscriber and removes it from the registry.
    ///
    /// Wakes a pump suspended on the subscriber's queue. Idempotent:
    /// unknown or already-closed ids are a no-op.
    pub async fn unsubscribe(&self, id: SubscriberId) {
        let mut inner = self.inner.lock().await;
        if let Some(slot) = inner.subscribers.remove(&id) {
            slot.queue.close();
            info!(subscriber = %id, connected_at = %slot.connected_at, "subscriber disconnected");
        }
    }

    /// Point-in-time occupancy snapshot. No side effects.
    ///
    /// Counts active subscribers only; entries already closed but not yet
    /// reaped are excluded.
    pub async fn stats(&self) -> BusStats {
        let inner = self.inner.lock().await;
        BusStats {
            subscriber_count: inner
                .subscribers
                .values()
                .filter(|slot| !slot.queue.is_closed())
                .count(),
            buffer_size: inner.buffer.len(),
            buffer_capacity: inner.buffer.capacity(),
        }
    }

    /// Empties the replay buffer. Live delivery is unaffected.
    pub async fn clear_buffer(&self) {
        let mut inner = self.inner.lock().await;
        inner.buffer.clear();
    }

    /// Starts the periodic heartbeat emitter owned by this bus.
    ///
    /// A no-op when heartbeats are disabled in the config, when the
    /// emitter is already running, or after shutdown. Stopped by
    /// [`EventBus::shutdown`].
    pub async fn start_heartbeat(&self) {
        let Some(period) = self.cfg.heartbeat_interval() else {
            return;
        };
        let mut inner = self.inner.lock().await;
        if inner.state == BusState::ShutDown || inner.heartbeat.is_some() {
            return;
        }
        inner.heartbeat = Some(heartbeat::spawn(self.clone(), period));
    }

    /// Shuts the bus down: stops the heartbeat emitter, rejects new
    /// subscriptions, closes and wakes every subscriber, and clears the
    /// registry. Idempotent.
    pub async fn shutdown(&self) {
        let heartbeat = {
            let mut inner = self.inner.lock().await;
            if inner.state == BusState::ShutDown {
                return;
            }
            inner.state = BusState::ShutDown;
            for (_, slot) in inner.subscribers.drain() {
                slot.queue.close();
            }
            inner.heartbeat.take()
        };
        // Join the emitter outside the lock: its in-flight publish may be
        // waiting on it.
        if let Some(handle) = heartbeat {
            handle.stop().await;
        }
        info!("event bus shut down");
    }

    /// True once [`EventBus::shutdown`] has run.
    pub async fn is_shut_down(&self) -> bool {
        self.inner.lock().await.state == BusState::ShutDown
    }

    /// Server identity stamped into heartbeat payloads.
    pub fn server_id(&self) -> &str {
        &self.cfg.server_id
    }

    // --- Typed publish helpers (producer contract) ---

    /// Publishes `pipeline.created`, correlated to the pipeline id.
    pub async fn publish_pipeline_created(&self, payload: PipelineCreated) -> u64 {
        let correlation = Some(payload.id.clone());
        self.publish(EventKind::PipelineCreated, to_value(payload), correlation)
            .await
    }

    /// Publishes `pipeline.updated`, correlated to the pipeline id.
    pub async fn publish_pipeline_updated(&self, payload: PipelineUpdated) -> u64 {
        let correlation = Some(payload.id.clone());
        self.publish(EventKind::PipelineUpdated, to_value(payload), correlation)
            .await
    }

    /// Publishes `pipeline.completed`, correlated to the pipeline id.
    pub async fn publish_pipeline_completed(&self, payload: PipelineCompleted) -> u64 {
        let correlation = Some(payload.id.clone());
        self.publish(EventKind::PipelineCompleted, to_value(payload), correlation)
            .await
    }

    /// Publishes `step.started`, correlated to the owning pipeline.
    pub async fn publish_step_started(&self, payload: StepStarted) -> u64 {
        let correlation = Some(payload.pipeline_id.clone());
        self.publish(EventKind::StepStarted, to_value(payload), correlation)
            .await
    }

    /// Publishes `step.completed`, correlated to the owning pipeline.
    pub async fn publish_step_completed(&self, payload: StepCompleted) -> u64 {
        let correlation = Some(payload.pipeline_id.clone());
        self.publish(EventKind::StepCompleted, to_value(payload), correlation)
            .await
    }

    /// Publishes `step.log`, correlated to the owning pipeline.
    pub async fn publish_step_log(&self, payload: StepLog) -> u64 {
        let correlation = Some(payload.pipeline_id.clone());
        self.publish(EventKind::StepLog, to_value(payload), correlation)
            .await
    }

    /// Publishes `approval.requested`, correlated to the owning pipeline.
    pub async fn publish_approval_requested(&self, payload: ApprovalRequested) -> u64 {
        let correlation = Some(payload.pipeline_id.clone());
        self.publish(EventKind::ApprovalRequested, to_value(payload), correlation)
            .await
    }

    /// Publishes `approval.resolved`, correlated to the owning pipeline.
    pub async fn publish_approval_resolved(&self, payload: ApprovalResolved) -> u64 {
        let correlation = Some(payload.pipeline_id.clone());
        self.publish(EventKind::ApprovalResolved, to_value(payload), correlation)
            .await
    }

    /// Publishes an `error` notice. Uncorrelated; reaches every subscriber.
    pub async fn publish_error(&self, payload: ErrorPayload) -> u64 {
        self.publish(EventKind::Error, to_value(payload), None).await
    }

    /// Publishes a `heartbeat`. Uncorrelated; reaches every subscriber,
    /// never enters the replay buffer.
    pub async fn publish_heartbeat(&self) -> u64 {
        let payload = Heartbeat::now(self.cfg.server_id.clone());
        self.publish(EventKind::Heartbeat, to_value(payload), None)
            .await
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(BusConfig::default())
    }
}

/// Serializes a typed payload into the envelope's opaque data field.
///
/// The fixed payload shapes cannot fail to serialize; if one ever does the
/// producer still must not see an error, so the payload degrades to null.
fn to_value<T: Serialize>(payload: T) -> Value {
    match serde_json::to_value(payload) {
        Ok(value) => value,
        Err(err) => {
            warn!(%err, "payload serialization failed, publishing null");
            Value::Null
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subscribers::SubscriberState;
    use serde_json::json;
    use std::time::Duration;

    fn quiet_config() -> BusConfig {
        BusConfig {
            heartbeat: Duration::ZERO,
            ..BusConfig::default()
        }
    }

    fn quiet_bus() -> EventBus {
        EventBus::new(quiet_config())
    }

    async fn publish_log(bus: &EventBus, correlation: Option<&str>) -> u64 {
        bus.publish(
            EventKind::StepLog,
            json!({ "line": "x" }),
            correlation.map(str::to_string),
        )
        .await
    }

    async fn recv(sub: &mut Subscription) -> Arc<Event> {
        tokio::time::timeout(Duration::from_secs(1), sub.next())
            .await
            .expect("timed out waiting for event")
            .expect("subscription closed unexpectedly")
    }

    #[tokio::test]
    async fn test_publish_assigns_strictly_increasing_ids() {
        let bus = quiet_bus();
        assert_eq!(publish_log(&bus, None).await, 1);
        assert_eq!(publish_log(&bus, None).await, 2);
        assert_eq!(publish_log(&bus, None).await, 3);
    }

    #[tokio::test]
    async fn test_subscriber_receives_events_in_publish_order() {
        let bus = quiet_bus();
        let mut sub = bus.subscribe(None, false).await.unwrap();
        for _ in 0..20 {
            publish_log(&bus, None).await;
        }
        let mut last = 0;
        for _ in 0..20 {
            let event = recv(&mut sub).await;
            assert!(event.id > last, "ids must be strictly increasing");
            last = event.id;
        }
        assert_eq!(last, 20);
    }

    #[tokio::test]
    async fn test_multiple_subscribers_receive_same_event() {
        let bus = quiet_bus();
        let mut one = bus.subscribe(None, false).await.unwrap();
        let mut two = bus.subscribe(None, false).await.unwrap();
        let id = publish_log(&bus, None).await;
        assert_eq!(recv(&mut one).await.id, id);
        assert_eq!(recv(&mut two).await.id, id);
    }

    #[tokio::test]
    async fn test_filter_excludes_other_topics() {
        let bus = quiet_bus();
        let mut sub = bus.subscribe(Some("p1"), false).await.unwrap();
        let matching = publish_log(&bus, Some("p1")).await;
        publish_log(&bus, Some("p2")).await;
        let uncorrelated = publish_log(&bus, None).await;

        assert_eq!(recv(&mut sub).await.id, matching);
        assert_eq!(recv(&mut sub).await.id, uncorrelated);
    }

    #[tokio::test]
    async fn test_replay_delivers_buffered_events_before_live() {
        let bus = quiet_bus();
        for _ in 0..3 {
            publish_log(&bus, None).await;
        }
        let mut sub = bus.subscribe(None, true).await.unwrap();
        let live = publish_log(&bus, None).await;

        for expected in 1..=3 {
            assert_eq!(recv(&mut sub).await.id, expected);
        }
        assert_eq!(recv(&mut sub).await.id, live);
    }

    #[tokio::test]
    async fn test_replay_excludes_evicted_events() {
        let bus = EventBus::new(BusConfig {
            buffer_capacity: 2,
            ..quiet_config()
        });
        publish_log(&bus, None).await;
        publish_log(&bus, None).await;
        publish_log(&bus, None).await;

        let mut sub = bus.subscribe(None, true).await.unwrap();
        assert_eq!(recv(&mut sub).await.id, 2);
        assert_eq!(recv(&mut sub).await.id, 3);
    }

    #[tokio::test]
    async fn test_filtered_replay_scenario() {
        let bus = quiet_bus();
        let a = bus
            .publish(EventKind::StepStarted, json!({}), Some("p1".to_string()))
            .await;
        bus.publish(EventKind::StepStarted, json!({}), Some("p2".to_string()))
            .await;
        let c = bus
            .publish(EventKind::PipelineCompleted, json!({}), None)
            .await;

        let mut sub = bus.subscribe(Some("p1"), true).await.unwrap();
        let first = recv(&mut sub).await;
        let second = recv(&mut sub).await;
        assert_eq!(first.id, a);
        assert_eq!(first.kind, EventKind::StepStarted);
        assert_eq!(second.id, c);
        assert_eq!(second.kind, EventKind::PipelineCompleted);
    }

    #[tokio::test]
    async fn test_slow_consumer_is_isolated() {
        let bus = EventBus::new(BusConfig {
            queue_capacity: 2,
            ..quiet_config()
        });
        let mut slow = bus.subscribe(None, false).await.unwrap();
        let mut fast = bus.subscribe(None, false).await.unwrap();

        for _ in 0..5 {
            publish_log(&bus, None).await;
        }
        // fast subscriber sees the full ordered sequence
        for expected in 1..=5 {
            assert_eq!(recv(&mut fast).await.id, expected);
        }
        // slow subscriber shed its oldest backlog, newest events retained
        assert_eq!(slow.dropped_count(), 3);
        assert_eq!(recv(&mut slow).await.id, 4);
        assert_eq!(recv(&mut slow).await.id, 5);
    }

    #[tokio::test]
    async fn test_disconnect_policy_closes_on_overflow() {
        let bus = EventBus::new(BusConfig {
            queue_capacity: 1,
            overflow: OverflowPolicy::Disconnect,
            ..quiet_config()
        });
        let mut slow = bus.subscribe(None, false).await.unwrap();
        publish_log(&bus, None).await;
        publish_log(&bus, None).await;

        assert_eq!(slow.state(), SubscriberState::Closed);
        assert!(slow.next().await.is_none());
        assert_eq!(bus.stats().await.subscriber_count, 0);
    }

    #[tokio::test]
    async fn test_unsubscribe_is_idempotent() {
        let bus = quiet_bus();
        let mut sub = bus.subscribe(None, false).await.unwrap();
        let id = sub.id();

        bus.unsubscribe(id).await;
        bus.unsubscribe(id).await;
        assert!(sub.next().await.is_none());
        assert_eq!(bus.stats().await.subscriber_count, 0);
    }

    #[tokio::test]
    async fn test_subscribe_after_shutdown_fails() {
        let bus = quiet_bus();
        bus.shutdown().await;
        let err = bus.subscribe(None, false).await.unwrap_err();
        assert_eq!(err.as_label(), "bus_shut_down");
        assert!(bus.is_shut_down().await);
    }

    #[tokio::test]
    async fn test_shutdown_closes_subscribers_and_is_idempotent() {
        let bus = quiet_bus();
        let mut sub = bus.subscribe(None, false).await.unwrap();
        bus.shutdown().await;
        bus.shutdown().await;

        assert!(sub.next().await.is_none());
        assert_eq!(sub.state(), SubscriberState::Closed);
        assert_eq!(bus.stats().await.subscriber_count, 0);
    }

    #[tokio::test]
    async fn test_stats_reports_occupancy() {
        let bus = EventBus::new(BusConfig {
            buffer_capacity: 10,
            ..quiet_config()
        });
        let _sub = bus.subscribe(None, false).await.unwrap();
        for _ in 0..3 {
            publish_log(&bus, None).await;
        }
        let stats = bus.stats().await;
        assert_eq!(stats.subscriber_count, 1);
        assert_eq!(stats.buffer_size, 3);
        assert_eq!(stats.buffer_capacity, 10);
    }

    #[tokio::test]
    async fn test_dropped_subscription_is_reaped_on_publish() {
        let bus = quiet_bus();
        let sub = bus.subscribe(None, false).await.unwrap();
        drop(sub);
        assert_eq!(bus.stats().await.subscriber_count, 0);
        // publish removes the dead registry entry and still succeeds
        let id = publish_log(&bus, None).await;
        assert_eq!(id, 1);
        let inner = bus.inner.lock().await;
        assert!(inner.subscribers.is_empty());
    }

    #[tokio::test]
    async fn test_publish_with_no_subscribers_succeeds() {
        let bus = quiet_bus();
        assert_eq!(publish_log(&bus, None).await, 1);
    }

    #[tokio::test]
    async fn test_heartbeat_is_never_buffered() {
        let bus = quiet_bus();
        bus.publish_heartbeat().await;
        bus.publish_heartbeat().await;
        assert_eq!(bus.stats().await.buffer_size, 0);

        // a replaying subscriber sees only the live event that follows
        let mut sub = bus.subscribe(None, true).await.unwrap();
        let live = publish_log(&bus, None).await;
        assert_eq!(recv(&mut sub).await.id, live);
    }

    #[tokio::test]
    async fn test_heartbeat_bypasses_filter_live() {
        let bus = quiet_bus();
        let mut sub = bus.subscribe(Some("p1"), false).await.unwrap();
        bus.publish_heartbeat().await;
        let event = recv(&mut sub).await;
        assert_eq!(event.kind, EventKind::Heartbeat);
        assert_eq!(event.data["server_id"], "pipebus");
    }

    #[tokio::test]
    async fn test_typed_helper_sets_correlation() {
        let bus = quiet_bus();
        let mut sub = bus.subscribe(Some("pipeline-1"), false).await.unwrap();
        bus.publish_step_started(StepStarted {
            pipeline_id: "pipeline-1".to_string(),
            step_id: "step-1".to_string(),
            name: "lint".to_string(),
            stage: "validate".to_string(),
        })
        .await;

        let event = recv(&mut sub).await;
        assert_eq!(event.kind, EventKind::StepStarted);
        assert_eq!(event.correlation.as_deref(), Some("pipeline-1"));
        assert_eq!(event.data["name"], "lint");
        assert_eq!(event.data["stage"], "validate");
    }

    #[tokio::test]
    async fn test_clear_buffer_empties_replay_window() {
        let bus = quiet_bus();
        publish_log(&bus, None).await;
        publish_log(&bus, None).await;
        bus.clear_buffer().await;
        assert_eq!(bus.stats().await.buffer_size, 0);
    }
}

//! # pipebus
//!
//! **Pipebus** is an in-memory async event bus for streaming pipeline
//! execution events to many concurrently connected observers.
//!
//! It decouples backend producers (pipeline execution, approval handling)
//! from delivery-layer consumers (SSE/WebSocket handlers): the bus assigns
//! event identity, retains a bounded recent history for replay, fans events
//! out with optional topic filtering, and emits periodic liveness signals —
//! without ever blocking a producer on a slow or disconnected consumer.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   ┌────────────────┐  ┌────────────────┐  ┌────────────────┐
//!   │ pipeline       │  │ approval       │  │ heartbeat      │
//!   │ executor       │  │ service        │  │ emitter        │
//!   └───────┬────────┘  └───────┬────────┘  └───────┬────────┘
//!           │ publish()         │ publish()         │ publish()
//!           ▼                   ▼                   ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  EventBus (single critical section)                               │
//! │  - id counter (monotonic, never reused)                           │
//! │  - RingBuffer (bounded replay window, no heartbeats)              │
//! │  - subscriber registry (filter + bounded queue per connection)    │
//! └──────┬─────────────────────┬─────────────────────┬───────────────┘
//!        ▼                     ▼                     ▼
//!   [queue S1]            [queue S2]            [queue SN]
//!   (bounded,             (bounded,             (bounded,
//!    drop-oldest)          drop-oldest)          drop-oldest)
//!        │                     │                     │
//!  Subscription::next()  Subscription::next()  Subscription::next()
//!        │                     │                     │
//!        ▼                     ▼                     ▼
//!   delivery pump 1       delivery pump 2       delivery pump N
//! ```
//!
//! ### Lifecycle
//! ```text
//! EventBus::new(cfg) ──► running ──► shutdown()
//!
//! subscribe(filter, replay):
//!   ├─► reject when shut down (BusError::ShutDown)
//!   ├─► replay? snapshot buffer through filter, pre-fill queue
//!   └─► register Active, return Subscription handle
//!
//! publish(kind, data, correlation):
//!   ├─► assign next id
//!   ├─► append to RingBuffer (unless heartbeat)
//!   └─► for each matching Active subscriber:
//!         enqueue copy; on full queue apply OverflowPolicy
//!
//! shutdown():
//!   ├─► stop heartbeat emitter
//!   ├─► reject new subscribes
//!   └─► close + wake every subscriber (pumps observe end-of-stream)
//! ```
//!
//! ## Guarantees
//! | Property        | Description                                                           |
//! |-----------------|-----------------------------------------------------------------------|
//! | **Ordering**    | Ids are globally ordered; every subscriber sees matching events in id order. |
//! | **Replay**      | A `replay=true` subscription gets the buffered history exactly once, before any live event. |
//! | **Filtering**   | A filtered subscriber never sees an event correlated to a different topic. |
//! | **Liveness**    | Heartbeats reach every subscriber live and are never buffered or replayed. |
//! | **Isolation**   | A slow consumer loses its own stale backlog (counted), never delays anyone else. |
//!
//! ## Example
//! ```no_run
//! use pipebus::{BusConfig, EventBus, StepLog};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let bus = EventBus::new(BusConfig::default());
//!     bus.start_heartbeat().await;
//!
//!     // consumer side: one delivery pump per connection
//!     let mut sub = bus
//!         .subscribe(Some("pipeline-1"), true)
//!         .await
//!         .expect("bus is running");
//!     tokio::spawn(async move {
//!         while let Some(event) = sub.next().await {
//!             println!("{} {} {}", event.id, event.kind, event.data);
//!         }
//!     });
//!
//!     // producer side: typed helpers stamp correlation keys
//!     bus.publish_step_log(StepLog {
//!         pipeline_id: "pipeline-1".to_string(),
//!         step_id: "step-1".to_string(),
//!         line: "compiling...".to_string(),
//!         timestamp: chrono::Utc::now(),
//!     })
//!     .await;
//!
//!     bus.shutdown().await;
//! }
//! ```

mod bus;
mod config;
mod error;
mod events;
mod policies;
mod subscribers;

// ---- Public re-exports ----

pub use bus::{BusStats, EventBus};
pub use config::BusConfig;
pub use error::BusError;
pub use events::{
    ApprovalRequested, ApprovalResolved, ErrorPayload, Event, EventKind, Heartbeat,
    PipelineCompleted, PipelineCreated, PipelineUpdated, StepCompleted, StepLog, StepStarted,
};
pub use policies::OverflowPolicy;
pub use subscribers::{SubscriberId, SubscriberState, Subscription};

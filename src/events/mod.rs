//! Event data model: kinds, envelopes, typed payloads, replay buffer.
//!
//! This module groups the event **wire contract** and the **ring buffer**
//! that retains recent events for late-joining subscribers.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and envelope
//! - typed payload structs for every enumerated kind
//! - [`RingBuffer`] bounded replay store (crate-internal)
//!
//! ## Quick reference
//! - **Producers**: pipeline execution and approval components build typed
//!   payloads; the bus stamps identity and timestamps.
//! - **Consumers**: the delivery layer reads `{id, type, data}` from the
//!   envelope and frames it for its transport.

mod event;
mod payload;
mod ring;

pub use event::{Event, EventKind};
pub use payload::{
    ApprovalRequested, ApprovalResolved, ErrorPayload, Heartbeat, PipelineCompleted,
    PipelineCreated, PipelineUpdated, StepCompleted, StepLog, StepStarted,
};
pub(crate) use ring::RingBuffer;

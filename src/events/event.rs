//! # Event envelope and classification.
//!
//! [`EventKind`] enumerates the wire-level event types across three
//! categories:
//! - **Pipeline events**: lifecycle of a pipeline run (created, updated, completed)
//! - **Step events**: per-step progress and log output
//! - **Approval events**: manual gates (requested, resolved)
//!
//! plus two **system kinds** (`heartbeat`, `error`) that bypass correlation
//! filtering, and an opaque catch-all for names minted after this build.
//!
//! [`Event`] is the envelope the bus stamps and fans out: a monotonically
//! increasing id, the kind, an opaque JSON payload, an optional correlation
//! key (pipeline id), and a wall-clock timestamp.
//!
//! ## Ordering guarantees
//! Ids are assigned by the bus inside its critical section: they are unique,
//! strictly increasing, and never reused. Every subscriber observes matching
//! events in id order.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Classification of streamed events.
///
/// The wire name of each kind (`"pipeline.created"`, `"step.log"`, …) is a
/// fixed, versioned contract. Names unknown to this build round-trip through
/// [`EventKind::Other`] unchanged, so adding a kind on the producer side
/// never breaks consumers compiled against an older set.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventKind {
    /// New pipeline created.
    PipelineCreated,
    /// Pipeline status changed.
    PipelineUpdated,
    /// Pipeline finished (success or failure).
    PipelineCompleted,
    /// Pipeline step started.
    StepStarted,
    /// Pipeline step finished.
    StepCompleted,
    /// Log line emitted by a step.
    StepLog,
    /// Approval gate waiting for a decision.
    ApprovalRequested,
    /// Approval granted or rejected.
    ApprovalResolved,
    /// Keep-alive signal. Delivered live to everyone, never buffered.
    Heartbeat,
    /// Server-side error notice. Delivered to everyone, buffered normally.
    Error,
    /// A wire name this build does not know. Forwarded opaquely.
    Other(String),
}

impl EventKind {
    /// Returns the wire name of this kind.
    pub fn as_str(&self) -> &str {
        match self {
            EventKind::PipelineCreated => "pipeline.created",
            EventKind::PipelineUpdated => "pipeline.updated",
            EventKind::PipelineCompleted => "pipeline.completed",
            EventKind::StepStarted => "step.started",
            EventKind::StepCompleted => "step.completed",
            EventKind::StepLog => "step.log",
            EventKind::ApprovalRequested => "approval.requested",
            EventKind::ApprovalResolved => "approval.resolved",
            EventKind::Heartbeat => "heartbeat",
            EventKind::Error => "error",
            EventKind::Other(name) => name,
        }
    }

    /// True for system kinds (`heartbeat`, `error`) that bypass correlation
    /// filtering and reach every subscriber.
    #[inline]
    pub fn is_system(&self) -> bool {
        matches!(self, EventKind::Heartbeat | EventKind::Error)
    }

    /// True for the liveness kind, which is never stored in the ring buffer.
    #[inline]
    pub fn is_heartbeat(&self) -> bool {
        matches!(self, EventKind::Heartbeat)
    }
}

impl From<&str> for EventKind {
    fn from(name: &str) -> Self {
        match name {
            "pipeline.created" => EventKind::PipelineCreated,
            "pipeline.updated" => EventKind::PipelineUpdated,
            "pipeline.completed" => EventKind::PipelineCompleted,
            "step.started" => EventKind::StepStarted,
            "step.completed" => EventKind::StepCompleted,
            "step.log" => EventKind::StepLog,
            "approval.requested" => EventKind::ApprovalRequested,
            "approval.resolved" => EventKind::ApprovalResolved,
            "heartbeat" => EventKind::Heartbeat,
            "error" => EventKind::Error,
            other => EventKind::Other(other.to_string()),
        }
    }
}

impl From<String> for EventKind {
    fn from(name: String) -> Self {
        match EventKind::from(name.as_str()) {
            EventKind::Other(_) => EventKind::Other(name),
            known => known,
        }
    }
}

impl From<EventKind> for String {
    fn from(kind: EventKind) -> Self {
        match kind {
            EventKind::Other(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Streamed event envelope.
///
/// - `id`: bus-assigned, strictly increasing across the bus lifetime
/// - `kind`: wire-level classification (serialized as `"type"`)
/// - `data`: opaque structured payload
/// - `correlation`: optional topic key (pipeline id) used for filtering
/// - `at`: wall-clock timestamp at publish time
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Event {
    /// Bus-assigned sequence id. Unique, monotonic, never reused.
    pub id: u64,
    /// Event classification.
    #[serde(rename = "type")]
    pub kind: EventKind,
    /// Opaque structured payload.
    pub data: Value,
    /// Optional correlation key (pipeline id) for topic filtering.
    #[serde(
        rename = "correlation_key",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub correlation: Option<String>,
    /// Wall-clock publish timestamp.
    pub at: DateTime<Utc>,
}

impl Event {
    /// Builds an envelope stamped with the given id at the current time.
    ///
    /// Only the bus assigns ids, inside its critical section.
    pub(crate) fn stamped(
        id: u64,
        kind: EventKind,
        data: Value,
        correlation: Option<String>,
    ) -> Self {
        Self {
            id,
            kind,
            data,
            correlation,
            at: Utc::now(),
        }
    }

    /// Checks whether this event should be delivered to a subscriber with
    /// the given filter.
    ///
    /// ### Rules
    /// - no filter → everything matches
    /// - system kinds (`heartbeat`, `error`) always match
    /// - no correlation key on the event → matches any filter
    /// - otherwise the correlation key must equal the filter
    pub fn matches(&self, filter: Option<&str>) -> bool {
        let Some(filter) = filter else {
            return true;
        };
        if self.kind.is_system() {
            return true;
        }
        match &self.correlation {
            None => true,
            Some(key) => key == filter,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(kind: EventKind, correlation: Option<&str>) -> Event {
        Event::stamped(1, kind, json!({}), correlation.map(str::to_string))
    }

    #[test]
    fn test_kind_wire_names_round_trip() {
        let kinds = [
            "pipeline.created",
            "pipeline.updated",
            "pipeline.completed",
            "step.started",
            "step.completed",
            "step.log",
            "approval.requested",
            "approval.resolved",
            "heartbeat",
            "error",
        ];
        for name in kinds {
            let kind = EventKind::from(name);
            assert!(!matches!(kind, EventKind::Other(_)), "{name} parsed as Other");
            assert_eq!(kind.as_str(), name);
        }
    }

    #[test]
    fn test_unknown_kind_forwarded_opaquely() {
        let kind = EventKind::from("deploy.requested");
        assert_eq!(kind, EventKind::Other("deploy.requested".to_string()));
        assert_eq!(kind.as_str(), "deploy.requested");
        assert_eq!(String::from(kind), "deploy.requested");
    }

    #[test]
    fn test_kind_serde_as_string() {
        let json = serde_json::to_string(&EventKind::StepLog).unwrap();
        assert_eq!(json, "\"step.log\"");
        let back: EventKind = serde_json::from_str("\"pipeline.created\"").unwrap();
        assert_eq!(back, EventKind::PipelineCreated);
        let unknown: EventKind = serde_json::from_str("\"cache.evicted\"").unwrap();
        assert_eq!(unknown, EventKind::Other("cache.evicted".to_string()));
    }

    #[test]
    fn test_matches_without_filter() {
        assert!(event(EventKind::StepLog, Some("p1")).matches(None));
        assert!(event(EventKind::StepLog, None).matches(None));
    }

    #[test]
    fn test_matches_correlation_against_filter() {
        let ev = event(EventKind::StepStarted, Some("p1"));
        assert!(ev.matches(Some("p1")));
        assert!(!ev.matches(Some("p2")));
    }

    #[test]
    fn test_matches_no_correlation_passes_any_filter() {
        let ev = event(EventKind::PipelineCompleted, None);
        assert!(ev.matches(Some("p1")));
    }

    #[test]
    fn test_matches_system_kinds_bypass_filter() {
        assert!(event(EventKind::Heartbeat, None).matches(Some("p1")));
        assert!(event(EventKind::Error, None).matches(Some("p1")));
    }

    #[test]
    fn test_envelope_serializes_type_field() {
        let ev = event(EventKind::StepLog, Some("p1"));
        let value = serde_json::to_value(&ev).unwrap();
        assert_eq!(value["type"], "step.log");
        assert_eq!(value["correlation_key"], "p1");
        assert_eq!(value["id"], 1);
    }
}

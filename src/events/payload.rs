//! # Typed payloads for the enumerated event kinds.
//!
//! One struct per wire-level event type. These are the producer-facing
//! contract: pipeline execution and approval components fill them in, the
//! bus serializes them into the envelope's opaque `data` field. Shapes are
//! versioned; fields are only ever added.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Payload for `pipeline.created`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PipelineCreated {
    pub id: String,
    pub repo: String,
    pub version: Option<String>,
    pub status: String,
    pub trigger: String,
    pub created_at: DateTime<Utc>,
}

/// Payload for `pipeline.updated`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PipelineUpdated {
    pub id: String,
    pub status: String,
    pub current_step: Option<String>,
}

/// Payload for `pipeline.completed`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PipelineCompleted {
    pub id: String,
    pub status: String,
    pub duration_seconds: Option<f64>,
}

/// Payload for `step.started`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StepStarted {
    pub pipeline_id: String,
    pub step_id: String,
    pub name: String,
    pub stage: String,
}

/// Payload for `step.completed`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StepCompleted {
    pub pipeline_id: String,
    pub step_id: String,
    pub name: String,
    pub status: String,
    pub duration_seconds: Option<f64>,
    pub error: Option<String>,
}

/// Payload for `step.log`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StepLog {
    pub pipeline_id: String,
    pub step_id: String,
    pub line: String,
    pub timestamp: DateTime<Utc>,
}

/// Payload for `approval.requested`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApprovalRequested {
    pub id: String,
    pub pipeline_id: String,
    pub step_id: String,
    pub step_name: String,
    pub requested_at: DateTime<Utc>,
}

/// Payload for `approval.resolved`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApprovalResolved {
    pub id: String,
    pub pipeline_id: String,
    pub status: String,
    pub responded_by: Option<String>,
    pub responded_at: Option<DateTime<Utc>>,
}

/// Payload for `heartbeat`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Heartbeat {
    pub timestamp: DateTime<Utc>,
    pub server_id: String,
}

impl Heartbeat {
    /// Builds a heartbeat stamped with the current time.
    pub fn now(server_id: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            server_id: server_id.into(),
        }
    }
}

/// Payload for `error`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub message: String,
    pub code: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_log_wire_shape() {
        let payload = StepLog {
            pipeline_id: "pipeline-1".to_string(),
            step_id: "step-1".to_string(),
            line: "compiling...".to_string(),
            timestamp: Utc::now(),
        };
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["pipeline_id"], "pipeline-1");
        assert_eq!(value["step_id"], "step-1");
        assert_eq!(value["line"], "compiling...");
        assert!(value.get("timestamp").is_some());
    }

    #[test]
    fn test_optional_fields_serialize_as_null() {
        let payload = PipelineCompleted {
            id: "p1".to_string(),
            status: "failed".to_string(),
            duration_seconds: None,
        };
        let value = serde_json::to_value(&payload).unwrap();
        assert!(value["duration_seconds"].is_null());
    }

    #[test]
    fn test_heartbeat_carries_server_id() {
        let payload = Heartbeat::now("dashboard");
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["server_id"], "dashboard");
    }
}

//! Error types used by the event bus.
//!
//! The bus has a deliberately small error surface: publishing never fails
//! from the producer's point of view (delivery loss is reported through the
//! affected subscriber's drop counter), and closing a subscriber is always a
//! no-op when repeated. The only fallible operation is subscribing, which is
//! rejected once the bus has been shut down.

use thiserror::Error;

/// # Errors produced by the event bus.
///
/// Shutdown is a deliberate lifecycle transition, not a fault: once the bus
/// is shut down the condition is terminal and callers must surface it to
/// their own clients rather than retry.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum BusError {
    /// The bus has been shut down; new subscriptions are rejected.
    #[error("event bus is shut down; new subscriptions are rejected")]
    ShutDown,
}

impl BusError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use pipebus::BusError;
    ///
    /// assert_eq!(BusError::ShutDown.as_label(), "bus_shut_down");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            BusError::ShutDown => "bus_shut_down",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            BusError::ShutDown => "bus shut down; subscription rejected".to_string(),
        }
    }
}

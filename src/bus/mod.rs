//! Bus runtime: fan-out core, liveness emitter, observability probe.
//!
//! This module contains the serialized heart of the crate. The only public
//! API from this module is [`EventBus`] (plus the [`BusStats`] snapshot it
//! hands to probes); everything else is wiring.
//!
//! Internal modules:
//! - [`core`]: id assignment, replay buffer, subscriber registry, fan-out;
//! - [`heartbeat`]: periodic liveness publisher tied to bus shutdown;
//! - [`stats`]: point-in-time observability snapshot.

mod core;
mod heartbeat;
mod stats;

pub use self::core::EventBus;
pub use stats::BusStats;

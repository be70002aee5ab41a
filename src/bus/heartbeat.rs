//! # Periodic liveness emitter.
//!
//! Spawns a background task that publishes a `heartbeat` event through the
//! shared bus on a fixed interval. Heartbeats carry no correlation key, so
//! they reach every active subscriber regardless of filter, and they are
//! never buffered — their sole purpose is telling connected consumers the
//! stream is alive, not historical record-keeping.
//!
//! ## Rules
//! - Emission is skipped while nobody is subscribed.
//! - The emitter holds a [`CancellationToken`] and stops cooperatively when
//!   the bus shuts down.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::bus::EventBus;

/// Handle to a running heartbeat emitter.
pub(crate) struct HeartbeatHandle {
    token: CancellationToken,
    join: JoinHandle<()>,
}

impl HeartbeatHandle {
    /// Cancels the emitter and waits for it to exit.
    pub(crate) async fn stop(self) {
        self.token.cancel();
        let _ = self.join.await;
    }
}

/// Spawns the emitter loop on the current runtime.
pub(crate) fn spawn(bus: EventBus, period: Duration) -> HeartbeatHandle {
    let token = CancellationToken::new();
    let loop_token = token.clone();

    let join = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // the first tick completes immediately; consume it so the first
        // heartbeat lands one full period after start
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = loop_token.cancelled() => break,
                _ = ticker.tick() => {
                    let stats = bus.stats().await;
                    if stats.subscriber_count == 0 {
                        continue;
                    }
                    bus.publish_heartbeat().await;
                    debug!(subscribers = stats.subscriber_count, "heartbeat sent");
                }
            }
        }
    });

    HeartbeatHandle { token, join }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BusConfig;
    use crate::events::EventKind;

    fn config(heartbeat: Duration) -> BusConfig {
        BusConfig {
            heartbeat,
            ..BusConfig::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_subscriber_still_receives_heartbeat() {
        let bus = EventBus::new(config(Duration::from_secs(30)));
        bus.start_heartbeat().await;
        let mut sub = bus.subscribe(Some("p1"), false).await.unwrap();

        // no application events at all; the paused clock auto-advances
        // through the interval while the pump is suspended
        let event = sub.next().await.expect("heartbeat expected");
        assert_eq!(event.kind, EventKind::Heartbeat);
        bus.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_heartbeat_absent_from_replay() {
        let bus = EventBus::new(config(Duration::from_secs(5)));
        bus.start_heartbeat().await;
        let mut live = bus.subscribe(None, false).await.unwrap();
        // wait until at least one heartbeat went out
        let event = live.next().await.expect("heartbeat expected");
        assert_eq!(event.kind, EventKind::Heartbeat);

        assert_eq!(bus.stats().await.buffer_size, 0);
        let mut replayed = bus.subscribe(None, true).await.unwrap();
        // nothing buffered: the first delivery is the next live heartbeat
        let event = replayed.next().await.expect("live heartbeat expected");
        assert_eq!(event.kind, EventKind::Heartbeat);
        bus.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_emitter() {
        let bus = EventBus::new(config(Duration::from_secs(1)));
        bus.start_heartbeat().await;
        let mut sub = bus.subscribe(None, false).await.unwrap();
        // shutdown joins the emitter; completion proves it exited
        bus.shutdown().await;
        assert!(sub.next().await.is_none());
        assert!(bus.is_shut_down().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_heartbeat_disabled_is_noop() {
        let bus = EventBus::new(config(Duration::ZERO));
        bus.start_heartbeat().await;
        let mut sub = bus.subscribe(None, false).await.unwrap();
        // nothing ever fires: the wait times out instead of yielding a beat
        let waited = tokio::time::timeout(Duration::from_secs(120), sub.next()).await;
        assert!(waited.is_err());
        bus.shutdown().await;
    }
}

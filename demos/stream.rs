//! # Live Streaming Example
//!
//! Runs a bus with two connected observers — one watching everything, one
//! filtered to a single pipeline — while a producer publishes a small
//! pipeline run and the heartbeat emitter keeps connections alive.
//!
//! ## Run
//! ```bash
//! cargo run --example stream
//! ```

use std::time::Duration;

use chrono::Utc;
use pipebus::{BusConfig, EventBus, PipelineCreated, StepCompleted, StepLog, StepStarted};

fn pump(name: &'static str, mut sub: pipebus::Subscription) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = sub.next().await {
            println!("[{name}] #{:<3} {:<20} {}", event.id, event.kind.to_string(), event.data);
        }
        println!("[{name}] stream closed");
    })
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt().with_env_filter("pipebus=info").init();

    let bus = EventBus::new(BusConfig {
        heartbeat: Duration::from_secs(2),
        ..BusConfig::default()
    });
    bus.start_heartbeat().await;

    let firehose = bus.subscribe(None, false).await.expect("bus is running");
    let filtered = bus
        .subscribe(Some("pipeline-1"), false)
        .await
        .expect("bus is running");
    let pumps = vec![pump("firehose", firehose), pump("pipeline-1", filtered)];

    bus.publish_pipeline_created(PipelineCreated {
        id: "pipeline-1".to_string(),
        repo: "solti/pipebus".to_string(),
        version: Some("1.4.2".to_string()),
        status: "pending".to_string(),
        trigger: "push".to_string(),
        created_at: Utc::now(),
    })
    .await;

    for (step, name) in [("step-1", "lint"), ("step-2", "build")] {
        bus.publish_step_started(StepStarted {
            pipeline_id: "pipeline-1".to_string(),
            step_id: step.to_string(),
            name: name.to_string(),
            stage: "validate".to_string(),
        })
        .await;
        bus.publish_step_log(StepLog {
            pipeline_id: "pipeline-1".to_string(),
            step_id: step.to_string(),
            line: format!("{name} running..."),
            timestamp: Utc::now(),
        })
        .await;
        bus.publish_step_completed(StepCompleted {
            pipeline_id: "pipeline-1".to_string(),
            step_id: step.to_string(),
            name: name.to_string(),
            status: "completed".to_string(),
            duration_seconds: Some(0.4),
            error: None,
        })
        .await;
        tokio::time::sleep(Duration::from_millis(300)).await;
    }

    // idle long enough for a heartbeat to go out
    tokio::time::sleep(Duration::from_secs(3)).await;

    let stats = bus.stats().await;
    println!(
        "stats: subscribers={} buffered={}/{}",
        stats.subscriber_count, stats.buffer_size, stats.buffer_capacity
    );

    bus.shutdown().await;
    for pump in pumps {
        let _ = pump.await;
    }
}

//! # Filtered Replay Example
//!
//! Publishes history for two pipelines, then connects a late observer with
//! `replay=true` and a filter: it catches up on exactly its own pipeline's
//! events (plus uncorrelated ones) before seeing anything live.
//!
//! ## Run
//! ```bash
//! cargo run --example filtered_replay
//! ```

use pipebus::{BusConfig, EventBus, PipelineCompleted, StepStarted};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt().with_env_filter("pipebus=info").init();

    let bus = EventBus::new(BusConfig::default());

    // history: interleaved events for two pipelines
    for step in 1..=3 {
        for pipeline in ["pipeline-1", "pipeline-2"] {
            bus.publish_step_started(StepStarted {
                pipeline_id: pipeline.to_string(),
                step_id: format!("step-{step}"),
                name: format!("step {step}"),
                stage: "build".to_string(),
            })
            .await;
        }
    }
    bus.publish_pipeline_completed(PipelineCompleted {
        id: "pipeline-2".to_string(),
        status: "succeeded".to_string(),
        duration_seconds: Some(12.5),
    })
    .await;

    // late joiner: replays only pipeline-1 history, oldest first
    let mut sub = bus
        .subscribe(Some("pipeline-1"), true)
        .await
        .expect("bus is running");

    println!("replaying history for pipeline-1:");
    let mut replayed = 0;
    while replayed < 3 {
        let event = sub.next().await.expect("replay batch");
        println!("  #{:<3} {:<16} {}", event.id, event.kind.to_string(), event.data["step_id"]);
        replayed += 1;
    }

    // live events resume after the batch, ids still globally ordered
    let live_id = bus
        .publish_pipeline_completed(PipelineCompleted {
            id: "pipeline-1".to_string(),
            status: "succeeded".to_string(),
            duration_seconds: Some(3.2),
        })
        .await;
    let event = sub.next().await.expect("live event");
    println!("live: #{} {} (published as #{live_id})", event.id, event.kind);

    bus.shutdown().await;
}

//! S4: a task claimed by an engine that dies is reclaimed by another
//! runner's dead-engine scan once the heartbeat lapses and the stale
//! threshold passes.

use crate::prelude::*;
use dalston_adapters::WorkStreams;
use dalston_core::test_support::{job_created_event, pending_job_with};
use dalston_core::{EngineId, JobParams, JobStatus, Stage};
use dalston_storage::JobStore;
use std::time::Duration;

#[tokio::test]
async fn dead_engines_work_is_reclaimed_and_job_completes() {
    let mut world = World::with_defaults();
    world.start_engine(engine("prep", "prepare"), Script::Succeed);
    world.start_engine(engine("merger", "merge"), Script::Succeed);
    // engine-a is live in the registry but has no runner in the world:
    // it will consume the stream directly and then "crash".
    world.registry.register(transcriber("engine-a", &["en"], true));

    let mut params = JobParams::new("en");
    params.engine = Some("engine-a".into());
    world.store.insert_job(&pending_job_with("job-1", params)).await.unwrap();
    world
        .runtime
        .handle_event(job_created_event("job-1"))
        .await
        .unwrap();
    world.settle().await;

    // prepare is done; the transcribe message waits on the stream.
    assert_eq!(world.streams.len(&Stage::transcribe()), 1);

    // engine-a takes the message and dies without acknowledging.
    world
        .streams
        .read_new(&Stage::transcribe(), "engine-a", Duration::ZERO)
        .await
        .unwrap()
        .unwrap();
    world.registry.remove(&EngineId::new("engine-a"));

    // engine-b starts up and scans for abandoned work.
    world.start_engine(transcriber("engine-b", &["en"], true), Script::Succeed);

    // Within the stale threshold the entry is left alone.
    world.clock.advance(chrono::Duration::minutes(5));
    world.settle().await;
    assert_eq!(world.job("job-1").status, JobStatus::Running);
    let pending = world.streams.pending(&Stage::transcribe()).await.unwrap();
    assert_eq!(pending[0].consumer, "engine-a");
    assert_eq!(pending[0].delivery_count, 1);

    // Past the threshold, engine-b's dead-engine scan claims it.
    world.clock.advance(chrono::Duration::minutes(6));
    world.settle().await;

    assert_eq!(world.job("job-1").status, JobStatus::Completed);
    let transcribe = world.task("job-1", "transcribe");
    assert!(transcribe.output_uri.is_some());
    assert!(world.streams.is_empty(&Stage::transcribe()));
}

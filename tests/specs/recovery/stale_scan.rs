//! B5 end to end: the leader's stale scan turns exhausted deliveries and
//! absolute timeouts into terminal task failures.

use crate::prelude::*;
use dalston_adapters::WorkStreams;
use dalston_core::{ErrorCategory, JobParams, JobStatus, Stage, TaskStatus};
use std::time::Duration;

/// Submit a happy job but let a ghost consumer hold the transcribe
/// message without ever finishing it.
async fn world_with_stuck_transcribe() -> World {
    let mut world = World::with_defaults();
    world.start_engine(engine("prep", "prepare"), Script::Succeed);
    world.start_engine(engine("merger", "merge"), Script::Succeed);
    world.registry.register(transcriber("ghost", &["en"], true));

    world.submit("job-1", JobParams::new("en")).await;
    world
        .streams
        .read_new(&Stage::transcribe(), "ghost", Duration::ZERO)
        .await
        .unwrap()
        .unwrap();
    world
}

#[tokio::test]
async fn timeout_is_enforced_even_for_heartbeating_engines() {
    let mut world = world_with_stuck_transcribe().await;

    // The ghost keeps heartbeating, so no runner may steal its work; the
    // absolute timeout is the backstop.
    world.clock.advance(chrono::Duration::minutes(31));
    assert!(world.scanner.tick().await.unwrap());
    world.settle().await;

    assert_eq!(world.task("job-1", "transcribe").status, TaskStatus::Failed);
    let job = world.job("job-1");
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.error.unwrap().code, ErrorCategory::TaskTimeout);
    // The stream entry was acknowledged away.
    assert!(world.streams.pending(&Stage::transcribe()).await.unwrap().is_empty());
}

#[tokio::test]
async fn exhausted_deliveries_fail_within_one_scan() {
    let mut world = world_with_stuck_transcribe().await;

    // Two more deliveries via idle claims: three in total.
    for _ in 0..2 {
        world.clock.advance(chrono::Duration::minutes(11));
        let pending = world.streams.pending(&Stage::transcribe()).await.unwrap();
        world
            .streams
            .claim(
                &Stage::transcribe(),
                "ghost",
                Duration::ZERO,
                &pending[0].entry_id,
            )
            .await
            .unwrap()
            .unwrap();
    }

    assert!(world.scanner.tick().await.unwrap());
    world.settle().await;

    let job = world.job("job-1");
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.error.unwrap().code, ErrorCategory::MaxRetriesExceeded);
    assert!(world.streams.pending(&Stage::transcribe()).await.unwrap().is_empty());
}

#[tokio::test]
async fn healthy_work_survives_the_scan() {
    let mut world = world_with_stuck_transcribe().await;

    world.clock.advance(chrono::Duration::minutes(5));
    assert!(world.scanner.tick().await.unwrap());
    world.settle().await;

    assert_eq!(world.job("job-1").status, JobStatus::Running);
    assert_eq!(
        world.streams.pending(&Stage::transcribe()).await.unwrap().len(),
        1
    );
}

//! S5 / L1 / L2: duplicated broadcasts and racing controllers never
//! produce a second DAG or a second enqueue.

use crate::prelude::*;
use dalston_adapters::WorkStreams;
use dalston_core::test_support::{job_created_event, pending_job_with, task_completed_event};
use dalston_core::{JobParams, JobStatus, Stage};
use dalston_storage::JobStore;
use std::time::Duration;

#[tokio::test]
async fn duplicated_job_created_produces_one_dag_and_one_dequeue_per_task() {
    let mut world = World::with_defaults();
    world.registry.register(engine("prep", "prepare"));
    world.registry.register(transcriber("parakeet-en", &["en"], true));
    world.registry.register(engine("merger", "merge"));

    world
        .store
        .insert_job(&pending_job_with("job-1", JobParams::new("en")))
        .await
        .unwrap();

    // The same broadcast, delivered five times (duplicated fan-out).
    for _ in 0..5 {
        world
            .runtime
            .handle_event(job_created_event("job-1"))
            .await
            .unwrap();
    }

    assert_eq!(world.stages("job-1").len(), 3);
    assert_eq!(world.streams.len(&Stage::prepare()), 1);

    // Exactly one engine dequeue is possible per task.
    assert!(world
        .streams
        .read_new(&Stage::prepare(), "prep", Duration::ZERO)
        .await
        .unwrap()
        .is_some());
    assert!(world
        .streams
        .read_new(&Stage::prepare(), "prep-2", Duration::ZERO)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn racing_controller_past_the_claim_hits_the_unique_index() {
    let mut world = World::with_defaults();
    world.registry.register(engine("prep", "prepare"));
    world.registry.register(transcriber("parakeet-en", &["en"], true));
    world.registry.register(engine("merger", "merge"));

    let job = pending_job_with("job-1", JobParams::new("en"));
    world.store.insert_job(&job).await.unwrap();
    world
        .runtime
        .handle_event(job_created_event("job-1"))
        .await
        .unwrap();

    // A second controller with a stale PENDING read: reset the row so its
    // claim succeeds, then replay the event. Its insert collides with the
    // unique (job_id, stage) index and the event is dropped.
    world.store.insert_job(&job).await.unwrap();
    world
        .runtime
        .handle_event(job_created_event("job-1"))
        .await
        .unwrap();

    assert_eq!(world.stages("job-1").len(), 3);
    assert_eq!(world.streams.len(&Stage::prepare()), 1);
}

#[tokio::test]
async fn duplicated_task_completed_enqueues_dependents_once() {
    let mut world = World::with_defaults();
    world.registry.register(engine("prep", "prepare"));
    world.registry.register(transcriber("parakeet-en", &["en"], true));
    world.registry.register(engine("merger", "merge"));

    world
        .store
        .insert_job(&pending_job_with("job-1", JobParams::new("en")))
        .await
        .unwrap();
    world
        .runtime
        .handle_event(job_created_event("job-1"))
        .await
        .unwrap();

    let prepare = world.task("job-1", "prepare");
    let event = task_completed_event(prepare.id.as_str(), "job-1");
    for _ in 0..5 {
        world.runtime.handle_event(event.clone()).await.unwrap();
    }

    assert_eq!(world.streams.len(&Stage::transcribe()), 1);
}

#[tokio::test]
async fn full_pipeline_under_duplicated_delivery_still_completes_once() {
    let mut world = World::with_defaults();
    world.start_engine(engine("prep", "prepare"), Script::Succeed);
    world.start_engine(transcriber("parakeet-en", &["en"], true), Script::Succeed);
    world.start_engine(engine("merger", "merge"), Script::Succeed);

    world.submit("job-1", JobParams::new("en")).await;
    assert_eq!(world.job("job-1").status, JobStatus::Completed);

    // Replay every terminal task event after the fact.
    for stage in ["prepare", "transcribe", "merge"] {
        let task = world.task("job-1", stage);
        let event = task_completed_event(task.id.as_str(), "job-1");
        world.runtime.handle_event(event).await.unwrap();
    }
    world.settle().await;

    let job = world.job("job-1");
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(world.bus.published_of_kind("job.completed").len(), 1);
}

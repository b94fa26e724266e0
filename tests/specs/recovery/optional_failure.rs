//! S6: a persistently-failing optional enrichment stage never fails the
//! job; it is skipped and recorded as a pipeline warning.

use crate::prelude::*;
use dalston_core::{JobParams, JobStatus, Stage, TaskStatus};

#[tokio::test]
async fn failing_emotions_engine_leaves_job_completed_with_warning() {
    let mut world = World::with_defaults();
    world.start_engine(engine("prep", "prepare"), Script::Succeed);
    world.start_engine(transcriber("parakeet-en", &["en"], true), Script::Succeed);
    world.start_engine(engine("merger", "merge"), Script::Succeed);
    world.start_engine(
        engine("emo", "detect_emotions"),
        Script::Fail("classifier crashed".to_string()),
    );

    let mut params = JobParams::new("en");
    params.enrichment = vec![Stage::new("detect_emotions")];
    world.submit("job-1", params).await;

    // The emotions engine failed through its whole retry budget and the
    // task was skipped.
    let emotions = world.task("job-1", "detect_emotions");
    assert_eq!(emotions.status, TaskStatus::Skipped);
    assert_eq!(emotions.retries, emotions.max_retries);

    let job = world.job("job-1");
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.warnings.len(), 1);
    assert_eq!(job.warnings[0].stage, "detect_emotions");
    assert_eq!(job.warnings[0].status, "failed");
    assert!(job.warnings[0].error.contains("classifier crashed"));
}

#[tokio::test]
async fn transiently_failing_optional_stage_recovers() {
    let mut world = World::with_defaults();
    world.start_engine(engine("prep", "prepare"), Script::Succeed);
    world.start_engine(transcriber("parakeet-en", &["en"], true), Script::Succeed);
    world.start_engine(engine("merger", "merge"), Script::Succeed);
    world.start_engine(engine("emo", "detect_emotions"), Script::fail_times(2));

    let mut params = JobParams::new("en");
    params.enrichment = vec![Stage::new("detect_emotions")];
    world.submit("job-1", params).await;

    let emotions = world.task("job-1", "detect_emotions");
    assert_eq!(emotions.status, TaskStatus::Completed);
    assert_eq!(emotions.retries, 2);

    let job = world.job("job-1");
    assert_eq!(job.status, JobStatus::Completed);
    assert!(job.warnings.is_empty());
}

#[tokio::test]
async fn required_stage_with_same_failure_fails_the_job() {
    let mut world = World::with_defaults();
    world.start_engine(engine("prep", "prepare"), Script::Succeed);
    world.start_engine(
        transcriber("parakeet-en", &["en"], true),
        Script::Fail("decode failed".to_string()),
    );
    world.start_engine(engine("merger", "merge"), Script::Succeed);

    world.submit("job-1", JobParams::new("en")).await;

    let job = world.job("job-1");
    assert_eq!(job.status, JobStatus::Failed);
    let error = job.error.unwrap();
    assert!(error.message.contains("transcribe"), "{}", error.message);
    assert_eq!(world.task("job-1", "transcribe").status, TaskStatus::Failed);
    // merge never ran.
    assert_eq!(world.task("job-1", "merge").status, TaskStatus::Pending);
}

//! S1: a short English clip with a native-timestamp transcriber live
//! runs `prepare → transcribe → merge` and completes.

use crate::prelude::*;
use dalston_core::{JobParams, JobStatus, TaskStatus};

#[tokio::test]
async fn thirty_second_english_clip_completes() {
    let mut world = World::with_defaults();
    world.start_engine(engine("prep", "prepare"), Script::Succeed);
    world.start_engine(transcriber("parakeet-en", &["en"], true), Script::Succeed);
    world.start_engine(engine("merger", "merge"), Script::Succeed);

    let mut params = JobParams::new("en");
    params.audio_duration_secs = Some(30.0);
    world.submit("job-1", params).await;

    // No align (native timestamps), no diarize (none requested).
    assert_eq!(world.stages("job-1"), ["merge", "prepare", "transcribe"]);

    let job = world.job("job-1");
    assert_eq!(job.status, JobStatus::Completed);
    assert!(job.completed_at.is_some());
    assert!(job.warnings.is_empty());

    // Every task succeeded and the merged artifact exists.
    for stage in ["prepare", "transcribe", "merge"] {
        let task = world.task("job-1", stage);
        assert_eq!(task.status, TaskStatus::Completed, "stage {stage}");
        assert!(task.output_uri.is_some(), "stage {stage} has no artifact");
    }
    let merged = world.task("job-1", "merge").output_uri.unwrap();
    assert!(!merged.is_empty());

    // Observers saw the terminal event, and no queue debris remains.
    assert_eq!(world.bus.published_of_kind("job.completed").len(), 1);
    for stage in ["prepare", "transcribe", "merge"] {
        assert!(world.streams.is_empty(&dalston_core::Stage::new(stage)));
    }
}

#[tokio::test]
async fn tasks_execute_in_dependency_order() {
    let mut world = World::with_defaults();
    world.start_engine(engine("prep", "prepare"), Script::Succeed);
    world.start_engine(transcriber("parakeet-en", &["en"], true), Script::Succeed);
    world.start_engine(engine("merger", "merge"), Script::Succeed);

    world.submit("job-1", JobParams::new("en")).await;

    let prepare = world.task("job-1", "prepare");
    let transcribe = world.task("job-1", "transcribe");
    let merge = world.task("job-1", "merge");
    assert!(prepare.completed_at.unwrap() <= transcribe.completed_at.unwrap());
    assert!(transcribe.completed_at.unwrap() <= merge.completed_at.unwrap());
    assert_eq!(transcribe.dependencies, vec![prepare.id]);
    assert_eq!(merge.dependencies, vec![transcribe.id]);
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tests for the `task.completed` handler: dependency advance, the
//! PENDING→READY enqueue guard, and job completion.

use super::*;
use dalston_core::test_support::task_completed_event;
use dalston_core::{JobStatus, SpeakerDetection, TaskStatus};

#[tokio::test]
async fn completing_prepare_enqueues_transcribe() {
    let ctx = setup();
    ctx.register_core_engines();
    ctx.submit("job-1", JobParams::new("en")).await;

    ctx.complete_stage("job-1", "prepare").await;

    assert_eq!(ctx.task("job-1", "prepare").status, TaskStatus::Completed);
    assert_eq!(ctx.task("job-1", "transcribe").status, TaskStatus::Ready);
    assert_eq!(ctx.stream_len("transcribe"), 1);
    // merge still waits on transcribe.
    assert_eq!(ctx.task("job-1", "merge").status, TaskStatus::Pending);
    assert_eq!(ctx.stream_len("merge"), 0);
}

#[tokio::test]
async fn duplicate_completion_enqueues_dependents_once() {
    let ctx = setup();
    ctx.register_core_engines();
    ctx.submit("job-1", JobParams::new("en")).await;

    let prepare = ctx.task("job-1", "prepare");
    let event = task_completed_event(prepare.id.as_str(), "job-1");
    ctx.runtime.handle_event(event.clone()).await.unwrap();
    ctx.runtime.handle_event(event.clone()).await.unwrap();
    ctx.runtime.handle_event(event).await.unwrap();

    assert_eq!(ctx.stream_len("transcribe"), 1);
}

#[tokio::test]
async fn completion_records_output_uri() {
    let ctx = setup();
    ctx.register_core_engines();
    ctx.submit("job-1", JobParams::new("en")).await;

    ctx.complete_stage("job-1", "prepare").await;

    let prepare = ctx.task("job-1", "prepare");
    assert!(prepare.output_uri.is_some());
}

#[tokio::test]
async fn chain_of_completions_completes_the_job() {
    let ctx = setup();
    ctx.register_core_engines();
    ctx.submit("job-1", JobParams::new("en")).await;

    ctx.complete_stage("job-1", "prepare").await;
    ctx.complete_stage("job-1", "transcribe").await;
    ctx.complete_stage("job-1", "merge").await;

    let job = ctx.store.job(&JobId::new("job-1")).unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert!(job.completed_at.is_some());
    assert_eq!(ctx.bus.published_of_kind("job.completed").len(), 1);
}

#[tokio::test]
async fn parallel_branches_join_at_merge() {
    let ctx = setup();
    ctx.register_core_engines();
    ctx.registry.register(caps("pyannote", "diarize"));

    let mut params = JobParams::new("en");
    params.speaker_detection = SpeakerDetection::Auto;
    ctx.submit("job-1", params).await;

    ctx.complete_stage("job-1", "prepare").await;
    // Both branches are live at once.
    assert_eq!(ctx.task("job-1", "transcribe").status, TaskStatus::Ready);
    assert_eq!(ctx.task("job-1", "diarize").status, TaskStatus::Ready);

    ctx.complete_stage("job-1", "transcribe").await;
    // Merge still waits for diarize.
    assert_eq!(ctx.task("job-1", "merge").status, TaskStatus::Pending);

    ctx.complete_stage("job-1", "diarize").await;
    assert_eq!(ctx.task("job-1", "merge").status, TaskStatus::Ready);
    assert_eq!(ctx.stream_len("merge"), 1);
}

#[tokio::test]
async fn job_with_incomplete_required_tasks_stays_running() {
    let ctx = setup();
    ctx.register_core_engines();
    ctx.submit("job-1", JobParams::new("en")).await;

    ctx.complete_stage("job-1", "prepare").await;
    ctx.complete_stage("job-1", "transcribe").await;

    assert_eq!(
        ctx.store.job(&JobId::new("job-1")).unwrap().status,
        JobStatus::Running
    );
    assert!(ctx.bus.published_of_kind("job.completed").is_empty());
}

#[tokio::test]
async fn unknown_task_completion_is_harmless() {
    let ctx = setup();
    ctx.register_core_engines();
    ctx.submit("job-1", JobParams::new("en")).await;

    ctx.runtime
        .handle_event(task_completed_event("t-unknown", "job-1"))
        .await
        .unwrap();

    // Nothing advanced.
    assert_eq!(ctx.task("job-1", "transcribe").status, TaskStatus::Pending);
}

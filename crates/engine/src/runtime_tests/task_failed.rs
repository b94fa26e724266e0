// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tests for the `task.failed` handler: retry budgets, re-selection on
//! engine loss, optional-task skipping, and job failure.

use super::*;
use dalston_core::test_support::task_failed_event;
use dalston_core::{ErrorCategory, EngineId, JobStatus, TaskStatus};

impl TestContext {
    async fn fail_stage(&self, job_id: &str, stage: &str, category: ErrorCategory) {
        let task = self.task(job_id, stage);
        self.runtime
            .handle_event(task_failed_event(task.id.as_str(), job_id, category))
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn engine_error_requeues_within_budget() {
    let ctx = setup();
    ctx.register_core_engines();
    ctx.submit("job-1", JobParams::new("en")).await;
    assert_eq!(ctx.stream_len("prepare"), 1);

    ctx.fail_stage("job-1", "prepare", ErrorCategory::EngineError)
        .await;

    let prepare = ctx.task("job-1", "prepare");
    assert_eq!(prepare.status, TaskStatus::Ready);
    assert_eq!(prepare.retries, 1);
    assert_eq!(prepare.error.as_deref(), Some("boom"));
    // A fresh stream message was written.
    assert_eq!(ctx.stream_len("prepare"), 2);
    // The job keeps running.
    assert_eq!(
        ctx.store.job(&JobId::new("job-1")).unwrap().status,
        JobStatus::Running
    );
}

#[tokio::test]
async fn exhausted_retry_budget_fails_required_task_and_job() {
    let mut knobs = Knobs::default();
    knobs.stage_max_retries.insert("prepare".to_string(), 0);
    let ctx = setup_with(knobs, Catalog::default());
    ctx.register_core_engines();
    ctx.submit("job-1", JobParams::new("en")).await;

    ctx.fail_stage("job-1", "prepare", ErrorCategory::EngineError)
        .await;

    assert_eq!(ctx.task("job-1", "prepare").status, TaskStatus::Failed);
    let job = ctx.store.job(&JobId::new("job-1")).unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    let error = job.error.unwrap();
    assert_eq!(error.code, ErrorCategory::EngineError);
    assert!(error.message.contains("prepare"), "{}", error.message);
    assert_eq!(ctx.bus.published_of_kind("job.failed").len(), 1);
}

#[tokio::test]
async fn max_retries_exceeded_is_terminal_immediately() {
    let ctx = setup();
    ctx.register_core_engines();
    ctx.submit("job-1", JobParams::new("en")).await;

    ctx.fail_stage("job-1", "prepare", ErrorCategory::MaxRetriesExceeded)
        .await;

    assert_eq!(ctx.task("job-1", "prepare").status, TaskStatus::Failed);
    assert_eq!(
        ctx.store.job(&JobId::new("job-1")).unwrap().status,
        JobStatus::Failed
    );
}

#[tokio::test]
async fn task_timeout_is_terminal_immediately() {
    let ctx = setup();
    ctx.register_core_engines();
    ctx.submit("job-1", JobParams::new("en")).await;

    ctx.fail_stage("job-1", "prepare", ErrorCategory::TaskTimeout)
        .await;

    assert_eq!(
        ctx.store.job(&JobId::new("job-1")).unwrap().status,
        JobStatus::Failed
    );
}

#[tokio::test]
async fn optional_task_failure_skips_and_warns() {
    let mut knobs = Knobs::default();
    knobs.stage_max_retries.insert("detect_emotions".to_string(), 0);
    let ctx = setup_with(knobs, Catalog::default());
    ctx.register_core_engines();
    ctx.registry.register(caps("emo", "detect_emotions"));

    let mut params = JobParams::new("en");
    params.enrichment = vec!["detect_emotions".into()];
    ctx.submit("job-1", params).await;

    ctx.complete_stage("job-1", "prepare").await;
    ctx.complete_stage("job-1", "transcribe").await;
    ctx.complete_stage("job-1", "merge").await;
    // Core pipeline done; job waits on nothing required, but emotions is
    // still live.
    ctx.fail_stage("job-1", "detect_emotions", ErrorCategory::EngineError)
        .await;

    let task = ctx.task("job-1", "detect_emotions");
    assert_eq!(task.status, TaskStatus::Skipped);

    let job = ctx.store.job(&JobId::new("job-1")).unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.warnings.len(), 1);
    assert_eq!(job.warnings[0].stage, "detect_emotions");
    assert_eq!(job.warnings[0].status, "failed");
}

#[tokio::test]
async fn engine_disappeared_reselects_a_replacement() {
    let ctx = setup();
    ctx.register_core_engines(); // whisper-large is live
    let mut params = JobParams::new("en");
    params.engine = Some("whisper-ghost".into());
    // whisper-ghost is live at submission, then vanishes.
    ctx.registry.register(native_transcriber("whisper-ghost"));
    ctx.submit("job-1", params).await;
    ctx.registry.remove(&EngineId::new("whisper-ghost"));

    ctx.complete_stage("job-1", "prepare").await;
    ctx.fail_stage("job-1", "transcribe", ErrorCategory::EngineDisappeared)
        .await;

    let transcribe = ctx.task("job-1", "transcribe");
    assert_eq!(transcribe.engine_id, "whisper-large");
    assert_eq!(transcribe.reselections, 1);
    assert_eq!(transcribe.status, TaskStatus::Ready);
    // Re-enqueued on the same stream.
    assert_eq!(ctx.stream_len("transcribe"), 2);
}

#[tokio::test]
async fn reselection_budget_exhaustion_fails_the_job() {
    let ctx = setup();
    ctx.register_core_engines();
    ctx.submit("job-1", JobParams::new("en")).await;
    ctx.complete_stage("job-1", "prepare").await;

    ctx.fail_stage("job-1", "transcribe", ErrorCategory::EngineDisappeared)
        .await;
    assert_eq!(ctx.task("job-1", "transcribe").reselections, 1);

    // Second disappearance: budget of 1 is spent and the category is not
    // retryable, so the task and job fail.
    ctx.fail_stage("job-1", "transcribe", ErrorCategory::EngineDisappeared)
        .await;

    assert_eq!(ctx.task("job-1", "transcribe").status, TaskStatus::Failed);
    let job = ctx.store.job(&JobId::new("job-1")).unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.error.unwrap().code, ErrorCategory::EngineDisappeared);
}

#[tokio::test]
async fn reselection_disabled_degrades_to_retry() {
    let mut knobs = Knobs::default();
    knobs.reselect_on_engine_loss = false;
    let ctx = setup_with(knobs, Catalog::default());
    ctx.register_core_engines();
    ctx.submit("job-1", JobParams::new("en")).await;
    ctx.complete_stage("job-1", "prepare").await;

    ctx.fail_stage("job-1", "transcribe", ErrorCategory::EngineDisappeared)
        .await;

    let transcribe = ctx.task("job-1", "transcribe");
    assert_eq!(transcribe.status, TaskStatus::Ready);
    assert_eq!(transcribe.reselections, 0);
    assert_eq!(transcribe.retries, 1);
}

#[tokio::test]
async fn failed_event_on_terminal_task_is_ignored() {
    let ctx = setup();
    ctx.register_core_engines();
    ctx.submit("job-1", JobParams::new("en")).await;
    ctx.complete_stage("job-1", "prepare").await;

    ctx.fail_stage("job-1", "prepare", ErrorCategory::EngineError)
        .await;

    assert_eq!(ctx.task("job-1", "prepare").status, TaskStatus::Completed);
    assert_eq!(
        ctx.store.job(&JobId::new("job-1")).unwrap().status,
        JobStatus::Running
    );
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Compare-and-set semantics of the in-memory store. The Postgres
//! implementation expresses the same transitions in SQL; these tests pin
//! the contract handler logic relies on.

use super::*;
use dalston_core::test_support::{pending_job, pending_task, test_epoch};
use dalston_core::ErrorCategory;

fn now() -> DateTime<Utc> {
    test_epoch()
}

async fn store_with_job(id: &str) -> MemoryStore {
    let store = MemoryStore::new();
    store.insert_job(&pending_job(id)).await.unwrap();
    store
}

#[tokio::test]
async fn claim_job_running_wins_once() {
    let store = store_with_job("job-1").await;
    let id = JobId::new("job-1");

    assert!(store.claim_job_running(&id, now()).await.unwrap());
    // Second claim observes RUNNING and loses.
    assert!(!store.claim_job_running(&id, now()).await.unwrap());

    let job = store.job(&id).unwrap();
    assert_eq!(job.status, JobStatus::Running);
    assert_eq!(job.started_at, Some(now()));
}

#[tokio::test]
async fn complete_job_requires_running() {
    let store = store_with_job("job-1").await;
    let id = JobId::new("job-1");

    assert!(!store.complete_job(&id, now()).await.unwrap());
    store.claim_job_running(&id, now()).await.unwrap();
    assert!(store.complete_job(&id, now()).await.unwrap());
    assert!(!store.complete_job(&id, now()).await.unwrap());
}

#[tokio::test]
async fn fail_job_records_structured_error() {
    let store = store_with_job("job-1").await;
    let id = JobId::new("job-1");
    let error = JobError::new(ErrorCategory::TaskTimeout, "transcribe timed out");

    assert!(store.fail_job(&id, &error, now()).await.unwrap());
    let job = store.job(&id).unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.error.unwrap().code, ErrorCategory::TaskTimeout);
    // Terminal: cancel loses.
    assert!(!store.cancel_job(&id, now()).await.unwrap());
}

#[tokio::test]
async fn insert_tasks_rejects_duplicate_stage() {
    let store = store_with_job("job-1").await;
    let tasks = vec![
        pending_task("t-1", "job-1", "prepare", "prep"),
        pending_task("t-2", "job-1", "transcribe", "whisper"),
    ];
    store.insert_tasks(&tasks).await.unwrap();

    // A racing controller inserting the same DAG hits the unique index.
    let dup = vec![pending_task("t-9", "job-1", "prepare", "prep")];
    let err = store.insert_tasks(&dup).await.unwrap_err();
    assert!(matches!(err, StoreError::UniqueViolation { .. }), "{err}");

    // Same stage on a different job is fine.
    store.insert_job(&pending_job("job-2")).await.unwrap();
    let other = vec![pending_task("t-10", "job-2", "prepare", "prep")];
    store.insert_tasks(&other).await.unwrap();
}

#[tokio::test]
async fn insert_tasks_rejects_duplicate_within_batch() {
    let store = store_with_job("job-1").await;
    let tasks = vec![
        pending_task("t-1", "job-1", "prepare", "prep"),
        pending_task("t-2", "job-1", "prepare", "prep"),
    ];
    let err = store.insert_tasks(&tasks).await.unwrap_err();
    assert!(matches!(err, StoreError::UniqueViolation { .. }), "{err}");
}

#[tokio::test]
async fn mark_task_ready_wins_once() {
    let store = store_with_job("job-1").await;
    let task = pending_task("t-1", "job-1", "prepare", "prep");
    store.insert_tasks(&[task]).await.unwrap();
    let id = TaskId::new("t-1");

    assert!(store.mark_task_ready(&id).await.unwrap());
    assert!(!store.mark_task_ready(&id).await.unwrap());
    assert_eq!(store.task(&id).unwrap().status, TaskStatus::Ready);
}

#[tokio::test]
async fn mark_task_running_counts_deliveries() {
    let store = store_with_job("job-1").await;
    store
        .insert_tasks(&[pending_task("t-1", "job-1", "prepare", "prep")])
        .await
        .unwrap();
    let id = TaskId::new("t-1");

    // Not READY yet: receipt of a stale message loses.
    assert!(!store.mark_task_running(&id, now()).await.unwrap());

    store.mark_task_ready(&id).await.unwrap();
    assert!(store.mark_task_running(&id, now()).await.unwrap());
    // Redelivery while RUNNING is allowed and counted.
    assert!(store.mark_task_running(&id, now()).await.unwrap());
    assert_eq!(store.task(&id).unwrap().delivery_count, 2);
}

#[tokio::test]
async fn complete_task_is_idempotent_against_terminal() {
    let store = store_with_job("job-1").await;
    store
        .insert_tasks(&[pending_task("t-1", "job-1", "prepare", "prep")])
        .await
        .unwrap();
    let id = TaskId::new("t-1");
    store.mark_task_ready(&id).await.unwrap();

    assert!(store
        .complete_task(&id, Some("s3://a/t-1.json"), now())
        .await
        .unwrap());
    assert!(!store.complete_task(&id, None, now()).await.unwrap());
    assert!(!store.fail_task(&id, "late failure", now()).await.unwrap());

    let task = store.task(&id).unwrap();
    assert_eq!(task.status, TaskStatus::Completed);
    assert_eq!(task.output_uri.as_deref(), Some("s3://a/t-1.json"));
}

#[tokio::test]
async fn requeue_respects_retry_budget() {
    let store = store_with_job("job-1").await;
    let mut task = pending_task("t-1", "job-1", "transcribe", "whisper");
    task.max_retries = 2;
    store.insert_tasks(&[task]).await.unwrap();
    let id = TaskId::new("t-1");
    store.mark_task_ready(&id).await.unwrap();
    store.mark_task_running(&id, now()).await.unwrap();

    assert!(store.requeue_task(&id, "attempt 1 failed").await.unwrap());
    assert!(store.requeue_task(&id, "attempt 2 failed").await.unwrap());
    // Budget of 2 exhausted.
    assert!(!store.requeue_task(&id, "attempt 3 failed").await.unwrap());

    let task = store.task(&id).unwrap();
    assert_eq!(task.retries, 2);
    assert_eq!(task.status, TaskStatus::Ready);
}

#[tokio::test]
async fn reassign_respects_reselection_budget() {
    let store = store_with_job("job-1").await;
    store
        .insert_tasks(&[pending_task("t-1", "job-1", "transcribe", "whisper-a")])
        .await
        .unwrap();
    let id = TaskId::new("t-1");
    store.mark_task_ready(&id).await.unwrap();
    store.mark_task_running(&id, now()).await.unwrap();

    let config = serde_json::json!({"runtime_model_id": "large-v3"});
    assert!(store
        .reassign_task(&id, &EngineId::new("whisper-b"), &config, 1)
        .await
        .unwrap());
    assert!(!store
        .reassign_task(&id, &EngineId::new("whisper-c"), &config, 1)
        .await
        .unwrap());

    let task = store.task(&id).unwrap();
    assert_eq!(task.engine_id, "whisper-b");
    assert_eq!(task.reselections, 1);
    assert_eq!(task.status, TaskStatus::Ready);
    assert_eq!(task.runtime_model_id(), Some("large-v3"));
}

#[tokio::test]
async fn skip_task_marks_terminal() {
    let store = store_with_job("job-1").await;
    let mut task = pending_task("t-1", "job-1", "detect_emotions", "emo");
    task.required = false;
    store.insert_tasks(&[task]).await.unwrap();
    let id = TaskId::new("t-1");

    assert!(store.skip_task(&id, "3 attempts exhausted", now()).await.unwrap());
    let task = store.task(&id).unwrap();
    assert_eq!(task.status, TaskStatus::Skipped);
    assert!(task.status.satisfies_dependency());
}

#[tokio::test]
async fn append_warning_accumulates() {
    let store = store_with_job("job-1").await;
    let id = JobId::new("job-1");
    store
        .append_warning(
            &id,
            &PipelineWarning::failed("detect_emotions".into(), "boom"),
        )
        .await
        .unwrap();
    store
        .append_warning(&id, &PipelineWarning::failed("refine".into(), "boom"))
        .await
        .unwrap();
    assert_eq!(store.job(&id).unwrap().warnings.len(), 2);
}

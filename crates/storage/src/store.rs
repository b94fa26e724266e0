// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `JobStore` trait: everything handlers may do to the shared tables.
//!
//! Methods returning `bool` are compare-and-set transitions: `true` means
//! this caller won the update, `false` means the row was not in the
//! expected state (another controller won, or the row is terminal).
//! Callers must treat `false` as "do nothing", never as an error.

use crate::error::StoreError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dalston_core::{EngineId, Job, JobError, JobId, PipelineWarning, Task, TaskId};

/// Durable job/task state shared by all controllers and runners.
#[async_trait]
pub trait JobStore: Send + Sync + 'static {
    // ── jobs ──────────────────────────────────────────────────────────────

    /// Persist a fresh PENDING job (gateway boundary).
    async fn insert_job(&self, job: &Job) -> Result<(), StoreError>;

    async fn get_job(&self, id: &JobId) -> Result<Option<Job>, StoreError>;

    /// CAS PENDING→RUNNING. The winner owns DAG creation.
    async fn claim_job_running(
        &self,
        id: &JobId,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    /// CAS RUNNING→COMPLETED.
    async fn complete_job(&self, id: &JobId, now: DateTime<Utc>) -> Result<bool, StoreError>;

    /// CAS PENDING|RUNNING→FAILED, recording the structured error.
    async fn fail_job(
        &self,
        id: &JobId,
        error: &JobError,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    /// CAS PENDING|RUNNING→CANCELLED.
    async fn cancel_job(&self, id: &JobId, now: DateTime<Utc>) -> Result<bool, StoreError>;

    /// Append a pipeline warning to the job's output metadata.
    async fn append_warning(
        &self,
        id: &JobId,
        warning: &PipelineWarning,
    ) -> Result<(), StoreError>;

    // ── tasks ─────────────────────────────────────────────────────────────

    /// Persist a job's full task DAG in one transaction.
    ///
    /// Returns [`StoreError::UniqueViolation`] when any `(job_id, stage)`
    /// pair already exists — the signal that another controller raced past
    /// the job claim and won.
    async fn insert_tasks(&self, tasks: &[Task]) -> Result<(), StoreError>;

    async fn get_task(&self, id: &TaskId) -> Result<Option<Task>, StoreError>;

    async fn get_tasks_for_job(&self, job_id: &JobId) -> Result<Vec<Task>, StoreError>;

    /// CAS PENDING→READY. Only the winner may enqueue the task.
    async fn mark_task_ready(&self, id: &TaskId) -> Result<bool, StoreError>;

    /// CAS READY|RUNNING→RUNNING on stream receipt. Bumps the
    /// delivery-count mirror and stamps `started_at` on first delivery.
    async fn mark_task_running(
        &self,
        id: &TaskId,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    /// Transition to COMPLETED unless already terminal.
    async fn complete_task(
        &self,
        id: &TaskId,
        output_uri: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    /// Transition to FAILED unless already terminal.
    async fn fail_task(
        &self,
        id: &TaskId,
        error: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    /// Transition to SKIPPED unless already terminal (failed optional
    /// tasks).
    async fn skip_task(
        &self,
        id: &TaskId,
        error: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    /// CAS READY|RUNNING→READY with `retries < max_retries`, consuming one
    /// retry. `false` means the budget is exhausted or the task moved on.
    async fn requeue_task(&self, id: &TaskId, error: &str) -> Result<bool, StoreError>;

    /// CAS READY|RUNNING→READY with `reselections < max_reselections`,
    /// recording a replacement engine after `engine_disappeared`.
    async fn reassign_task(
        &self,
        id: &TaskId,
        engine_id: &EngineId,
        config: &serde_json::Value,
        max_reselections: u32,
    ) -> Result<bool, StoreError>;
}

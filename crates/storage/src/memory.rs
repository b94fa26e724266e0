// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory `JobStore` for tests.
//!
//! Mirrors the Postgres compare-and-set semantics, including the
//! `(job_id, stage)` unique-violation signal, so handler tests exercise the
//! same race outcomes without a database.

use crate::error::StoreError;
use crate::store::JobStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dalston_core::{
    EngineId, Job, JobError, JobId, JobStatus, PipelineWarning, Task, TaskId, TaskStatus,
};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Default)]
struct Inner {
    jobs: BTreeMap<JobId, Job>,
    tasks: BTreeMap<TaskId, Task>,
}

/// Shared in-memory store; clones see the same state.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Direct snapshot access for assertions.
    pub fn job(&self, id: &JobId) -> Option<Job> {
        self.inner.lock().jobs.get(id).cloned()
    }

    pub fn task(&self, id: &TaskId) -> Option<Task> {
        self.inner.lock().tasks.get(id).cloned()
    }

    pub fn tasks_for_job(&self, job_id: &JobId) -> Vec<Task> {
        self.inner
            .lock()
            .tasks
            .values()
            .filter(|t| &t.job_id == job_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl JobStore for MemoryStore {
    async fn insert_job(&self, job: &Job) -> Result<(), StoreError> {
        self.inner.lock().jobs.insert(job.id.clone(), job.clone());
        Ok(())
    }

    async fn get_job(&self, id: &JobId) -> Result<Option<Job>, StoreError> {
        Ok(self.inner.lock().jobs.get(id).cloned())
    }

    async fn claim_job_running(
        &self,
        id: &JobId,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock();
        match inner.jobs.get_mut(id) {
            Some(job) if job.status == JobStatus::Pending => {
                job.status = JobStatus::Running;
                job.started_at = Some(now);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn complete_job(&self, id: &JobId, now: DateTime<Utc>) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock();
        match inner.jobs.get_mut(id) {
            Some(job) if job.status == JobStatus::Running => {
                job.status = JobStatus::Completed;
                job.completed_at = Some(now);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn fail_job(
        &self,
        id: &JobId,
        error: &JobError,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock();
        match inner.jobs.get_mut(id) {
            Some(job) if matches!(job.status, JobStatus::Pending | JobStatus::Running) => {
                job.status = JobStatus::Failed;
                job.error = Some(error.clone());
                job.completed_at = Some(now);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn cancel_job(&self, id: &JobId, now: DateTime<Utc>) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock();
        match inner.jobs.get_mut(id) {
            Some(job) if matches!(job.status, JobStatus::Pending | JobStatus::Running) => {
                job.status = JobStatus::Cancelled;
                job.completed_at = Some(now);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn append_warning(
        &self,
        id: &JobId,
        warning: &PipelineWarning,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        let job = inner.jobs.get_mut(id).ok_or_else(|| StoreError::NotFound {
            kind: "job",
            id: id.to_string(),
        })?;
        job.warnings.push(warning.clone());
        Ok(())
    }

    async fn insert_tasks(&self, tasks: &[Task]) -> Result<(), StoreError> {
        let Some(first) = tasks.first() else {
            return Ok(());
        };
        let mut inner = self.inner.lock();
        // Uniqueness over (job_id, stage), existing rows and batch alike.
        let mut seen: Vec<(&JobId, &str)> = inner
            .tasks
            .values()
            .map(|t| (&t.job_id, t.stage.as_str()))
            .collect();
        for task in tasks {
            let key = (&task.job_id, task.stage.as_str());
            if seen.contains(&key) {
                return Err(StoreError::UniqueViolation {
                    job_id: first.job_id.to_string(),
                });
            }
            seen.push(key);
        }
        for task in tasks {
            inner.tasks.insert(task.id.clone(), task.clone());
        }
        Ok(())
    }

    async fn get_task(&self, id: &TaskId) -> Result<Option<Task>, StoreError> {
        Ok(self.inner.lock().tasks.get(id).cloned())
    }

    async fn get_tasks_for_job(&self, job_id: &JobId) -> Result<Vec<Task>, StoreError> {
        Ok(self.tasks_for_job(job_id))
    }

    async fn mark_task_ready(&self, id: &TaskId) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock();
        match inner.tasks.get_mut(id) {
            Some(task) if task.status == TaskStatus::Pending => {
                task.status = TaskStatus::Ready;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn mark_task_running(
        &self,
        id: &TaskId,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock();
        match inner.tasks.get_mut(id) {
            Some(task) if matches!(task.status, TaskStatus::Ready | TaskStatus::Running) => {
                task.status = TaskStatus::Running;
                task.delivery_count += 1;
                task.started_at.get_or_insert(now);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn complete_task(
        &self,
        id: &TaskId,
        output_uri: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock();
        match inner.tasks.get_mut(id) {
            Some(task) if !task.is_terminal() => {
                task.status = TaskStatus::Completed;
                if let Some(uri) = output_uri {
                    task.output_uri = Some(uri.to_string());
                }
                task.completed_at = Some(now);
                task.error = None;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn fail_task(
        &self,
        id: &TaskId,
        error: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock();
        match inner.tasks.get_mut(id) {
            Some(task) if !task.is_terminal() => {
                task.status = TaskStatus::Failed;
                task.error = Some(error.to_string());
                task.completed_at = Some(now);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn skip_task(
        &self,
        id: &TaskId,
        error: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock();
        match inner.tasks.get_mut(id) {
            Some(task) if !task.is_terminal() => {
                task.status = TaskStatus::Skipped;
                task.error = Some(error.to_string());
                task.completed_at = Some(now);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn requeue_task(&self, id: &TaskId, error: &str) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock();
        match inner.tasks.get_mut(id) {
            Some(task)
                if matches!(task.status, TaskStatus::Ready | TaskStatus::Running)
                    && task.retries < task.max_retries =>
            {
                task.status = TaskStatus::Ready;
                task.retries += 1;
                task.error = Some(error.to_string());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn reassign_task(
        &self,
        id: &TaskId,
        engine_id: &EngineId,
        config: &serde_json::Value,
        max_reselections: u32,
    ) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock();
        match inner.tasks.get_mut(id) {
            Some(task)
                if matches!(task.status, TaskStatus::Ready | TaskStatus::Running)
                    && task.reselections < max_reselections =>
            {
                task.status = TaskStatus::Ready;
                task.engine_id = engine_id.clone();
                task.config = config.clone();
                task.reselections += 1;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;

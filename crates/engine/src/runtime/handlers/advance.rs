// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared dependency-advance step: promote unblocked tasks and detect job
//! completion. Runs after every task reaches a dependency-satisfying
//! terminal state (COMPLETED or SKIPPED).

use crate::error::RuntimeError;
use crate::runtime::Runtime;
use dalston_adapters::{EventBus, Registry, WorkStreams};
use dalston_core::{Clock, Event, IdGen, JobId, TaskStatus};
use dalston_storage::JobStore;
use std::collections::HashSet;

impl<S, Q, R, B, C, I> Runtime<S, Q, R, B, C, I>
where
    S: JobStore,
    Q: WorkStreams,
    R: Registry,
    B: EventBus,
    C: Clock,
    I: IdGen,
{
    /// Promote every PENDING task whose dependencies are all satisfied,
    /// then complete the job if every required task succeeded.
    ///
    /// The PENDING→READY CAS is the only gate against double-queueing:
    /// any number of controllers may run this concurrently, but only the
    /// CAS winner enqueues.
    pub(crate) async fn advance_job(&self, job_id: &JobId) -> Result<(), RuntimeError> {
        let tasks = self.store.get_tasks_for_job(job_id).await?;
        if tasks.is_empty() {
            tracing::warn!(job_id = %job_id, "advance on job with no tasks");
            return Ok(());
        }

        let done: HashSet<_> = tasks
            .iter()
            .filter(|t| t.status.satisfies_dependency())
            .map(|t| &t.id)
            .collect();

        for task in &tasks {
            if task.status != TaskStatus::Pending || !task.dependencies_satisfied(&done) {
                continue;
            }
            if self.store.mark_task_ready(&task.id).await? {
                tracing::debug!(task_id = %task.id, stage = %task.stage, "task ready");
                self.enqueue_task(task).await?;
            }
        }

        // A job completes when every required task is COMPLETED. Failed
        // required tasks go through the job-failure path instead, so no
        // FAILED check is needed here.
        let all_required_done = tasks
            .iter()
            .filter(|t| t.required)
            .all(|t| t.status == TaskStatus::Completed);
        if all_required_done && self.store.complete_job(job_id, self.clock.now()).await? {
            tracing::info!(job_id = %job_id, "job completed");
            self.publish(Event::JobCompleted {
                job_id: job_id.clone(),
                timestamp: self.clock.now(),
            })
            .await?;
        }

        Ok(())
    }
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `job.created`: claim the job, build and persist its DAG, enqueue roots.

use crate::dag::build_dag;
use crate::error::RuntimeError;
use crate::runtime::Runtime;
use dalston_adapters::{EventBus, Registry, WorkStreams};
use dalston_core::{Clock, Event, IdGen, JobError, JobId};
use dalston_storage::{JobStore, StoreError};

impl<S, Q, R, B, C, I> Runtime<S, Q, R, B, C, I>
where
    S: JobStore,
    Q: WorkStreams,
    R: Registry,
    B: EventBus,
    C: Clock,
    I: IdGen,
{
    pub(crate) async fn handle_job_created(&self, job_id: &JobId) -> Result<(), RuntimeError> {
        // First atomic guard: exactly one controller moves the job
        // PENDING→RUNNING and owns DAG creation.
        if !self.store.claim_job_running(job_id, self.clock.now()).await? {
            tracing::debug!(job_id = %job_id, "job not pending, skipping (another controller won or job was cancelled)");
            return Ok(());
        }

        let job = self
            .store
            .get_job(job_id)
            .await?
            .ok_or_else(|| RuntimeError::JobNotFound(job_id.to_string()))?;

        // Validate selection for every stage up front; a job that can
        // never run fails here, before anything is queued.
        let plan = match self.select_pipeline(&job.params).await? {
            Ok(plan) => plan,
            Err(selection) => {
                tracing::warn!(job_id = %job_id, error = %selection, "no capable engine, failing job");
                let error = JobError::from(selection);
                if self.store.fail_job(job_id, &error, self.clock.now()).await? {
                    self.publish(Event::JobFailed {
                        job_id: job_id.clone(),
                        error,
                        timestamp: self.clock.now(),
                    })
                    .await?;
                }
                return Ok(());
            }
        };

        let tasks = build_dag(&job, &plan, &self.id_gen, &self.knobs, self.clock.now());

        // Second guard: the (job_id, stage) unique index. If a racing
        // controller got past the claim (e.g. via a stale read), its
        // insert collides here and it drops the event.
        match self.store.insert_tasks(&tasks).await {
            Ok(()) => {}
            Err(StoreError::UniqueViolation { .. }) => {
                tracing::info!(job_id = %job_id, "task DAG already exists, dropping duplicate job.created");
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        }
        tracing::info!(
            job_id = %job_id,
            tasks = tasks.len(),
            stages = ?tasks.iter().map(|t| t.stage.as_str()).collect::<Vec<_>>(),
            "job claimed, DAG persisted"
        );

        // Roots (no dependencies) go straight to READY and onto their
        // stage streams.
        for task in tasks.iter().filter(|t| t.dependencies.is_empty()) {
            if self.store.mark_task_ready(&task.id).await? {
                self.enqueue_task(task).await?;
            }
        }

        Ok(())
    }
}

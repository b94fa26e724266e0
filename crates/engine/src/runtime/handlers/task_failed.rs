// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `task.failed`: classify and recover.
//!
//! The category decides the path: `engine_disappeared` re-selects a
//! replacement engine (own budget), `engine_error` re-enqueues against the
//! retry budget, everything else is terminal — SKIPPED plus a pipeline
//! warning for optional tasks, task and job failure for required ones.

use crate::error::RuntimeError;
use crate::runtime::Runtime;
use crate::selector::select_engine;
use dalston_adapters::{EventBus, Registry, WorkStreams};
use dalston_core::{
    Clock, ErrorCategory, Event, IdGen, JobError, JobId, PipelineWarning, Requirements, Task,
    TaskId,
};
use dalston_storage::JobStore;

impl<S, Q, R, B, C, I> Runtime<S, Q, R, B, C, I>
where
    S: JobStore,
    Q: WorkStreams,
    R: Registry,
    B: EventBus,
    C: Clock,
    I: IdGen,
{
    pub(crate) async fn handle_task_failed(
        &self,
        task_id: &TaskId,
        job_id: &JobId,
        category: ErrorCategory,
        error: &str,
    ) -> Result<(), RuntimeError> {
        let Some(task) = self.store.get_task(task_id).await? else {
            tracing::warn!(task_id = %task_id, "task.failed for unknown task");
            return Ok(());
        };
        if task.is_terminal() {
            tracing::debug!(task_id = %task_id, status = %task.status, "task.failed on terminal task, ignoring");
            return Ok(());
        }
        if category == ErrorCategory::Cancelled {
            // Cancellation is silent by contract; a stray event changes
            // nothing.
            return Ok(());
        }

        if category == ErrorCategory::EngineDisappeared && self.knobs.reselect_on_engine_loss {
            if self.try_reselect(&task).await? {
                return Ok(());
            }
            // No replacement or budget spent: fall through to the
            // terminal path below.
        }

        // With re-selection disabled, a disappeared engine degrades to an
        // ordinary retry.
        let retryable = category.is_retryable()
            || (category == ErrorCategory::EngineDisappeared && !self.knobs.reselect_on_engine_loss);
        if retryable && self.store.requeue_task(task_id, error).await? {
            tracing::info!(
                task_id = %task_id,
                stage = %task.stage,
                retries = task.retries + 1,
                max_retries = task.max_retries,
                "re-enqueueing failed task"
            );
            self.enqueue_task(&task).await?;
            return Ok(());
        }

        if !task.required {
            // Optional tasks never fail the job; they become SKIPPED and
            // leave a warning in the job's output.
            if self.store.skip_task(task_id, error, self.clock.now()).await? {
                tracing::warn!(task_id = %task_id, stage = %task.stage, error, "optional task failed, skipping");
                self.store
                    .append_warning(job_id, &PipelineWarning::failed(task.stage.clone(), error))
                    .await?;
            }
            return self.advance_job(job_id).await;
        }

        if self.store.fail_task(task_id, error, self.clock.now()).await? {
            tracing::warn!(task_id = %task_id, stage = %task.stage, error, "required task failed");
        }
        let job_error = JobError::new(
            category,
            format!("stage '{}' failed: {}", task.stage, error),
        );
        if self.store.fail_job(job_id, &job_error, self.clock.now()).await? {
            self.publish(Event::JobFailed {
                job_id: job_id.clone(),
                error: job_error,
                timestamp: self.clock.now(),
            })
            .await?;
        }
        Ok(())
    }

    /// Replace a disappeared engine. Returns `true` when the task was
    /// reassigned and re-enqueued.
    async fn try_reselect(&self, task: &Task) -> Result<bool, RuntimeError> {
        if task.reselections >= self.knobs.max_reselections {
            tracing::debug!(task_id = %task.id, "re-selection budget spent");
            return Ok(false);
        }
        let Some(job) = self.store.get_job(&task.job_id).await? else {
            return Ok(false);
        };

        let requirements = match task.stage.base() {
            "transcribe" | "align" => Requirements::language(job.params.language.clone()),
            _ => Requirements::default(),
        };
        let live = self.live_engines(&task.stage).await?;
        // The original engine is dead, so no user preference applies.
        let selected = match select_engine(&task.stage, &requirements, None, &live, &self.catalog)
        {
            Ok(selected) => selected,
            Err(err) => {
                tracing::warn!(task_id = %task.id, stage = %task.stage, error = %err, "no replacement engine");
                return Ok(false);
            }
        };

        // Re-stamp the config for the new engine: its model variant and a
        // timeout from its own throughput.
        let mut config = task.config.clone();
        if let Some(object) = config.as_object_mut() {
            match &selected.capabilities.model_id {
                Some(model_id) => {
                    object.insert(
                        "runtime_model_id".to_string(),
                        serde_json::json!(model_id),
                    );
                }
                None => {
                    object.remove("runtime_model_id");
                }
            }
            let timeout = self.knobs.stage_timeout(
                selected.capabilities.rtf_gpu,
                job.params.audio_duration_secs,
            );
            object.insert("timeout_secs".to_string(), serde_json::json!(timeout.as_secs()));
        }

        if !self
            .store
            .reassign_task(&task.id, &selected.engine_id, &config, self.knobs.max_reselections)
            .await?
        {
            return Ok(false);
        }
        tracing::info!(
            task_id = %task.id,
            stage = %task.stage,
            from = %task.engine_id,
            to = %selected.engine_id,
            "engine disappeared, task reassigned"
        );

        let mut updated = task.clone();
        updated.engine_id = selected.engine_id;
        updated.config = config;
        self.enqueue_task(&updated).await?;
        Ok(true)
    }
}

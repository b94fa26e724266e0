// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `task.completed`: record the result and advance dependents.

use crate::error::RuntimeError;
use crate::runtime::Runtime;
use dalston_adapters::{EventBus, Registry, WorkStreams};
use dalston_core::{Clock, IdGen, JobId, TaskId};
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
    pub(crate) async fn handle_task_completed(
        &self,
        task_id: &TaskId,
        job_id: &JobId,
        output_uri: Option<&str>,
    ) -> Result<(), RuntimeError> {
        // No-op when already terminal; the advance below is still safe to
        // repeat because PENDING→READY is CAS-guarded.
        let updated = self
            .store
            .complete_task(task_id, output_uri, self.clock.now())
            .await?;
        if updated {
            tracing::info!(task_id = %task_id, job_id = %job_id, "task completed");
        } else {
            tracing::debug!(task_id = %task_id, "task already terminal, re-running advance only");
        }

        self.advance_job(job_id).await
    }
}

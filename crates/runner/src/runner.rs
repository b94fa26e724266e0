// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The cooperative work loop that runs inside every engine process.

use crate::error::{EngineError, RunnerError};
use crate::handler::{EngineHandler, TaskInput};
use dalston_adapters::{EventBus, Registry, WorkItem, WorkStreams};
use dalston_core::{
    Clock, EngineCapabilities, EngineId, ErrorCategory, Event, JobStatus, Knobs, Stage, Task,
};
use dalston_storage::JobStore;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

/// Work loop for one engine process.
///
/// Each iteration: try to claim one message abandoned by a dead engine,
/// otherwise block briefly for fresh work; re-check the database before
/// doing anything; always acknowledge, and let events carry the outcome.
pub struct EngineRunner<H, S, Q, R, B, C: Clock> {
    handler: Arc<H>,
    capabilities: EngineCapabilities,
    /// Base stage whose stream this engine consumes.
    stage: Stage,
    store: S,
    streams: Q,
    registry: R,
    bus: B,
    clock: C,
    knobs: Knobs,
    loaded_model: Arc<Mutex<Option<String>>>,
}

impl<H, S, Q, R, B, C> Clone for EngineRunner<H, S, Q, R, B, C>
where
    S: Clone,
    Q: Clone,
    R: Clone,
    B: Clone,
    C: Clock,
{
    fn clone(&self) -> Self {
        Self {
            handler: Arc::clone(&self.handler),
            capabilities: self.capabilities.clone(),
            stage: self.stage.clone(),
            store: self.store.clone(),
            streams: self.streams.clone(),
            registry: self.registry.clone(),
            bus: self.bus.clone(),
            clock: self.clock.clone(),
            knobs: self.knobs.clone(),
            loaded_model: Arc::clone(&self.loaded_model),
        }
    }
}

impl<H, S, Q, R, B, C> EngineRunner<H, S, Q, R, B, C>
where
    H: EngineHandler,
    S: JobStore + Clone,
    Q: WorkStreams,
    R: Registry,
    B: EventBus,
    C: Clock,
{
    /// `capabilities` is the engine's metadata document; its first stage
    /// names the stream to consume.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        handler: H,
        capabilities: EngineCapabilities,
        store: S,
        streams: Q,
        registry: R,
        bus: B,
        clock: C,
        knobs: Knobs,
    ) -> Self {
        let stage = capabilities
            .stages
            .first()
            .cloned()
            .unwrap_or_else(Stage::transcribe);
        Self {
            handler: Arc::new(handler),
            capabilities,
            stage,
            store,
            streams,
            registry,
            bus,
            clock,
            knobs,
            loaded_model: Arc::new(Mutex::new(None)),
        }
    }

    /// Build from the engine's baked-in metadata document — the usual
    /// path for engine binaries.
    #[allow(clippy::too_many_arguments)]
    pub fn from_metadata(
        handler: H,
        metadata: &dalston_catalog::EngineMetadata,
        store: S,
        streams: Q,
        registry: R,
        bus: B,
        clock: C,
        knobs: Knobs,
    ) -> Self {
        Self::new(
            handler,
            metadata.to_capabilities(),
            store,
            streams,
            registry,
            bus,
            clock,
            knobs,
        )
    }

    pub fn engine_id(&self) -> &EngineId {
        &self.capabilities.engine_id
    }

    fn consumer(&self) -> &str {
        self.capabilities.engine_id.as_str()
    }

    /// Run forever. Transient errors are logged and retried after a short
    /// pause; the loop itself never gives up.
    pub async fn run(&self) {
        tracing::info!(engine = %self.engine_id(), stage = %self.stage, "engine runner started");
        loop {
            if let Err(err) = self.step().await {
                tracing::error!(engine = %self.engine_id(), error = %err, "runner step failed");
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
        }
    }

    /// One loop iteration. Returns whether a message was handled.
    pub async fn step(&self) -> Result<bool, RunnerError> {
        if let Some(item) = self.claim_from_dead_engines().await? {
            self.handle_item(item).await?;
            return Ok(true);
        }
        match self
            .streams
            .read_new(&self.stage, self.consumer(), self.knobs.block_read)
            .await?
        {
            Some(item) => {
                self.handle_item(item).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Dead-engine pass: steal at most one pending entry whose consumer
    /// is both idle past the stale threshold and absent from the
    /// registry. Live-but-slow consumers are never robbed.
    async fn claim_from_dead_engines(&self) -> Result<Option<WorkItem>, RunnerError> {
        let pending = self.streams.pending(&self.stage).await?;
        for entry in pending {
            if entry.consumer == self.consumer() {
                continue;
            }
            if entry.idle < self.knobs.stale_claim_idle {
                continue;
            }
            let holder = EngineId::new(entry.consumer.clone());
            if self.registry.is_available(&holder).await? {
                continue;
            }
            let claimed = self
                .streams
                .claim(
                    &self.stage,
                    self.consumer(),
                    self.knobs.stale_claim_idle,
                    &entry.entry_id,
                )
                .await?;
            if let Some(item) = claimed {
                tracing::warn!(
                    engine = %self.engine_id(),
                    task_id = %item.message.task_id,
                    dead_consumer = %entry.consumer,
                    idle_secs = entry.idle.as_secs(),
                    "claimed task from dead engine"
                );
                return Ok(Some(item));
            }
        }
        Ok(None)
    }

    async fn handle_item(&self, item: WorkItem) -> Result<(), RunnerError> {
        let task_id = &item.message.task_id;

        // Receipt-time re-check: the message may outlive the task.
        let Some(task) = self.store.get_task(task_id).await? else {
            tracing::debug!(task_id = %task_id, "message for unknown task, acknowledging");
            return self.streams.ack(&self.stage, &item.entry_id).await.map_err(Into::into);
        };
        let job_cancelled = match self.store.get_job(&task.job_id).await? {
            Some(job) => job.status == JobStatus::Cancelled,
            None => true,
        };
        if job_cancelled || task.is_terminal() {
            // Cancelled work is acknowledged silently: no processing, no
            // event.
            tracing::debug!(task_id = %task_id, "task cancelled or terminal, acknowledging");
            return self.streams.ack(&self.stage, &item.entry_id).await.map_err(Into::into);
        }

        let _ = self.store.mark_task_running(task_id, self.clock.now()).await?;

        if let Err(err) = self.swap_model_if_needed(&task).await {
            return self.finish_failed(&item, &task, err.to_string()).await;
        }

        tracing::info!(engine = %self.engine_id(), task_id = %task_id, stage = %task.stage, "processing task");
        match self.handler.process(TaskInput::from_task(&task)).await {
            Ok(output) => {
                // Ack first so a crash after processing cannot leave a
                // poisoned entry; the completion event carries the result.
                self.streams.ack(&self.stage, &item.entry_id).await?;
                self.bus
                    .publish(&Event::TaskCompleted {
                        task_id: task.id.clone(),
                        job_id: task.job_id.clone(),
                        output_uri: Some(output.output_uri),
                        timestamp: self.clock.now(),
                    })
                    .await?;
                Ok(())
            }
            Err(err) => self.finish_failed(&item, &task, err.to_string()).await,
        }
    }

    async fn finish_failed(
        &self,
        item: &WorkItem,
        task: &Task,
        error: String,
    ) -> Result<(), RunnerError> {
        tracing::warn!(engine = %self.engine_id(), task_id = %task.id, error = %error, "task failed in engine");
        self.streams.ack(&self.stage, &item.entry_id).await?;
        self.bus
            .publish(&Event::TaskFailed {
                task_id: task.id.clone(),
                job_id: task.job_id.clone(),
                category: ErrorCategory::EngineError,
                error,
                timestamp: self.clock.now(),
            })
            .await?;
        Ok(())
    }

    /// Swap models when the task wants a different variant than what is
    /// loaded. A failed swap fails the task; the swap itself is never
    /// retried.
    async fn swap_model_if_needed(&self, task: &Task) -> Result<(), EngineError> {
        let Some(wanted) = task.runtime_model_id() else {
            return Ok(());
        };
        let current = self.loaded_model.lock().clone();
        if current.as_deref() == Some(wanted) {
            return Ok(());
        }
        tracing::info!(
            engine = %self.engine_id(),
            from = current.as_deref().unwrap_or("-"),
            to = wanted,
            "swapping model"
        );
        self.handler.load_model(wanted).await?;
        *self.loaded_model.lock() = Some(wanted.to_string());
        Ok(())
    }

    /// Write one heartbeat, advertising the currently-loaded model.
    pub async fn heartbeat_once(&self) -> Result<(), RunnerError> {
        let mut capabilities = self.capabilities.clone();
        capabilities.loaded_model = self.loaded_model.lock().clone();
        self.registry
            .heartbeat(&capabilities, self.knobs.heartbeat_ttl)
            .await?;
        Ok(())
    }

    /// Heartbeat on its own schedule, independent of the work loop.
    pub fn spawn_heartbeat(&self) -> tokio::task::JoinHandle<()> {
        let runner = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(runner.knobs.heartbeat_interval);
            loop {
                interval.tick().await;
                if let Err(err) = runner.heartbeat_once().await {
                    // Best-effort: a missed heartbeat only hides the
                    // engine for one interval.
                    tracing::warn!(engine = %runner.engine_id(), error = %err, "heartbeat failed");
                }
            }
        })
    }
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runtime for the orchestration core.
//!
//! One `Runtime` per controller process. It holds no job state in memory —
//! every handler round-trips through the store, so any number of
//! controllers can process the same events; the CAS guards decide who
//! wins.

mod handlers;

use crate::error::RuntimeError;
use crate::selector::{select_engine, PipelinePlan, SelectedEngine};
use dalston_adapters::{EventBus, Registry, WorkStreams};
use dalston_catalog::Catalog;
use dalston_core::{
    Clock, EngineId, Event, IdGen, JobId, JobParams, Knobs, NoCapableEngineError, Requirements,
    Stage, StreamMessage, Task,
};
use dalston_storage::JobStore;
use std::sync::Arc;
use std::time::Duration;

/// Runtime adapter dependencies
pub struct RuntimeDeps<S, Q, R, B> {
    pub store: S,
    pub streams: Q,
    pub registry: R,
    pub bus: B,
}

/// Runtime that coordinates the system
pub struct Runtime<S, Q, R, B, C: Clock, I: IdGen> {
    pub(crate) store: S,
    pub(crate) streams: Q,
    pub(crate) registry: R,
    pub(crate) bus: B,
    pub(crate) catalog: Arc<Catalog>,
    pub(crate) knobs: Knobs,
    pub(crate) clock: C,
    pub(crate) id_gen: I,
}

impl<S, Q, R, B, C, I> Runtime<S, Q, R, B, C, I>
where
    S: JobStore,
    Q: WorkStreams,
    R: Registry,
    B: EventBus,
    C: Clock,
    I: IdGen,
{
    /// Create a new runtime
    pub fn new(
        deps: RuntimeDeps<S, Q, R, B>,
        catalog: Arc<Catalog>,
        knobs: Knobs,
        clock: C,
        id_gen: I,
    ) -> Self {
        Self {
            store: deps.store,
            streams: deps.streams,
            registry: deps.registry,
            bus: deps.bus,
            catalog,
            knobs,
            clock,
            id_gen,
        }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn knobs(&self) -> &Knobs {
        &self.knobs
    }

    /// Process one event. Events are hints: losing every CAS inside is a
    /// normal outcome, not an error.
    pub async fn handle_event(&self, event: Event) -> Result<(), RuntimeError> {
        match event {
            Event::JobCreated { job_id, .. } => self.handle_job_created(&job_id).await,
            Event::TaskCompleted {
                task_id,
                job_id,
                output_uri,
                ..
            } => {
                self.handle_task_completed(&task_id, &job_id, output_uri.as_deref())
                    .await
            }
            Event::TaskFailed {
                task_id,
                job_id,
                category,
                error,
                ..
            } => {
                self.handle_task_failed(&task_id, &job_id, category, &error)
                    .await
            }
            // Observer-only events; nothing for the handlers to do.
            Event::JobCompleted { .. } | Event::JobFailed { .. } | Event::TaskProgress { .. } => {
                Ok(())
            }
        }
    }

    /// Cancel a job: CAS to CANCELLED and drop unclaimed stream entries.
    /// In-flight tasks are not interrupted; runners observe the cancelled
    /// job at receipt and acknowledge without processing.
    pub async fn cancel_job(&self, job_id: &JobId) -> Result<bool, RuntimeError> {
        if !self.store.cancel_job(job_id, self.clock.now()).await? {
            return Ok(false);
        }
        tracing::info!(job_id = %job_id, "job cancelled");
        for task in self.store.get_tasks_for_job(job_id).await? {
            if task.is_terminal() {
                continue;
            }
            let stream_stage = Stage::new(task.stage.base());
            let removed = self
                .streams
                .remove_unclaimed(&stream_stage, &task.id)
                .await?;
            if removed > 0 {
                tracing::debug!(task_id = %task.id, stage = %task.stage, removed, "dropped unclaimed entries");
            }
        }
        Ok(true)
    }

    /// Registry snapshot for one stage.
    pub(crate) async fn live_engines(
        &self,
        stage: &Stage,
    ) -> Result<Vec<dalston_core::EngineCapabilities>, RuntimeError> {
        Ok(self.registry.get_engines_for_stage(stage).await?)
    }

    /// Select an engine for one stage against the current registry.
    ///
    /// The outer error is infrastructure; the inner result is the
    /// selection outcome.
    pub(crate) async fn select_stage(
        &self,
        stage: &Stage,
        requirements: &Requirements,
        preference: Option<&EngineId>,
    ) -> Result<Result<SelectedEngine, NoCapableEngineError>, RuntimeError> {
        let live = self.live_engines(stage).await?;
        Ok(select_engine(
            stage,
            requirements,
            preference,
            &live,
            &self.catalog,
        ))
    }

    /// Compose per-stage selection into a full pipeline plan, deciding
    /// which stages exist along the way.
    ///
    /// Also the submission-time validation path: the gateway calls this
    /// before accepting a job so a request nothing can serve is rejected
    /// synchronously with the structured error.
    pub async fn select_pipeline(
        &self,
        params: &JobParams,
    ) -> Result<Result<PipelinePlan, NoCapableEngineError>, RuntimeError> {
        let language = Requirements::language(params.language.clone());

        let transcribe = match self
            .select_stage(&Stage::transcribe(), &language, params.engine.as_ref())
            .await?
        {
            Ok(engine) => engine,
            Err(err) => return Ok(Err(err)),
        };

        // align only exists when word timestamps are wanted and the chosen
        // transcriber cannot produce them natively.
        let align = if params.word_timestamps && !transcribe.capabilities.word_timestamps {
            match self.select_stage(&Stage::align(), &language, None).await? {
                Ok(engine) => Some(engine),
                Err(err) => return Ok(Err(err)),
            }
        } else {
            None
        };

        // diarize only for mixed-audio speaker detection the transcriber
        // lacks; per-channel jobs get speaker identity from the channel.
        let wants_diarize = params.speaker_detection == dalston_core::SpeakerDetection::Auto;
        let diarize = if wants_diarize && !transcribe.capabilities.includes_diarization {
            match self
                .select_stage(&Stage::diarize(), &Requirements::default(), None)
                .await?
            {
                Ok(engine) => Some(engine),
                Err(err) => return Ok(Err(err)),
            }
        } else {
            None
        };

        let prepare = match self
            .select_stage(&Stage::prepare(), &Requirements::default(), None)
            .await?
        {
            Ok(engine) => engine,
            Err(err) => return Ok(Err(err)),
        };
        let merge = match self
            .select_stage(&Stage::merge(), &Requirements::default(), None)
            .await?
        {
            Ok(engine) => engine,
            Err(err) => return Ok(Err(err)),
        };

        let mut enrichment = Vec::new();
        for stage in &params.enrichment {
            match self
                .select_stage(stage, &Requirements::default(), None)
                .await?
            {
                Ok(engine) => enrichment.push((stage.clone(), engine)),
                Err(err) => return Ok(Err(err)),
            }
        }

        Ok(Ok(PipelinePlan {
            prepare,
            transcribe,
            align,
            diarize,
            merge,
            enrichment,
        }))
    }

    /// Write a task's stream message, stamping the absolute timeout.
    ///
    /// Streams are keyed by base stage: `transcribe_ch1` rides the
    /// `transcribe` stream, so one engine family consumes one stream.
    pub(crate) async fn enqueue_task(&self, task: &Task) -> Result<(), RuntimeError> {
        let now = self.clock.now();
        let timeout = task
            .timeout_secs()
            .map(Duration::from_secs)
            .unwrap_or(self.knobs.task_timeout);
        let timeout_at = now
            + chrono::Duration::from_std(timeout)
                .unwrap_or_else(|_| chrono::Duration::seconds(1800));
        let message = StreamMessage {
            task_id: task.id.clone(),
            job_id: task.job_id.clone(),
            enqueued_at: now,
            timeout_at,
        };
        let stream_stage = Stage::new(task.stage.base());
        self.streams.append(&stream_stage, &message).await?;
        Ok(())
    }

    pub(crate) async fn publish(&self, event: Event) -> Result<(), RuntimeError> {
        self.bus.publish(&event).await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "../runtime_tests/mod.rs"]
mod tests;

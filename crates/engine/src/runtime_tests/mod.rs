// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Handler tests over the in-memory adapters.
//!
//! Each file exercises one event kind; this module holds the shared
//! harness.

mod cancel;
mod job_created;
mod task_completed;
mod task_failed;

use crate::runtime::{Runtime, RuntimeDeps};
use dalston_adapters::{FakeEventBus, FakeRegistry, FakeStreams};
use dalston_catalog::Catalog;
use dalston_core::test_support::{caps, job_created_event, pending_job_with, task_completed_event};
use dalston_core::{
    Clock, EngineCapabilities, FakeClock, Job, JobId, JobParams, Knobs, SequentialIdGen, Stage,
    Task,
};
use dalston_storage::{JobStore, MemoryStore};
use std::sync::Arc;

pub(crate) type TestRuntime =
    Runtime<MemoryStore, FakeStreams, FakeRegistry, FakeEventBus, FakeClock, SequentialIdGen>;

pub(crate) struct TestContext {
    pub runtime: TestRuntime,
    pub store: MemoryStore,
    pub streams: FakeStreams,
    pub registry: FakeRegistry,
    pub bus: FakeEventBus,
    pub clock: FakeClock,
}

pub(crate) fn setup() -> TestContext {
    setup_with(Knobs::default(), Catalog::default())
}

pub(crate) fn setup_with(knobs: Knobs, catalog: Catalog) -> TestContext {
    let clock = FakeClock::default();
    let store = MemoryStore::new();
    let streams = FakeStreams::new(clock.clone());
    let registry = FakeRegistry::new(clock.clone());
    let bus = FakeEventBus::new();
    let runtime = Runtime::new(
        RuntimeDeps {
            store: store.clone(),
            streams: streams.clone(),
            registry: registry.clone(),
            bus: bus.clone(),
        },
        Arc::new(catalog),
        knobs,
        clock.clone(),
        SequentialIdGen::new("t"),
    );
    TestContext {
        runtime,
        store,
        streams,
        registry,
        bus,
        clock,
    }
}

/// An all-languages transcriber with native word timestamps.
pub(crate) fn native_transcriber(id: &str) -> EngineCapabilities {
    let mut capabilities = caps(id, "transcribe");
    capabilities.word_timestamps = true;
    capabilities
}

impl TestContext {
    /// Register engines for the minimal happy path: prepare, a native
    /// transcriber, merge.
    pub fn register_core_engines(&self) {
        self.registry.register(caps("prep", "prepare"));
        self.registry.register(native_transcriber("whisper-large"));
        self.registry.register(caps("merger", "merge"));
    }

    /// Persist a PENDING job and run the `job.created` handler.
    pub async fn submit(&self, id: &str, params: JobParams) -> Job {
        let job = pending_job_with(id, params);
        self.store.insert_job(&job).await.unwrap();
        self.runtime
            .handle_event(job_created_event(id))
            .await
            .unwrap();
        job
    }

    pub fn task(&self, job_id: &str, stage: &str) -> Task {
        self.store
            .tasks_for_job(&JobId::new(job_id))
            .into_iter()
            .find(|t| t.stage == stage)
            .unwrap_or_else(|| panic!("no task for stage {stage}"))
    }

    pub fn stages(&self, job_id: &str) -> Vec<String> {
        let mut stages: Vec<String> = self
            .store
            .tasks_for_job(&JobId::new(job_id))
            .iter()
            .map(|t| t.stage.to_string())
            .collect();
        stages.sort();
        stages
    }

    /// Run the `task.completed` handler for the job's task at `stage`.
    pub async fn complete_stage(&self, job_id: &str, stage: &str) {
        let task = self.task(job_id, stage);
        self.runtime
            .handle_event(task_completed_event(task.id.as_str(), job_id))
            .await
            .unwrap();
    }

    pub fn stream_len(&self, stage: &str) -> usize {
        self.streams.len(&Stage::new(stage))
    }
}

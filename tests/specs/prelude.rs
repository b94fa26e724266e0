//! Shared world for the behavioral specs: a controller runtime, a stale
//! scanner, and as many scripted engines as a scenario needs, all over
//! the in-memory adapters.

#![allow(dead_code)]

use async_trait::async_trait;
use dalston_adapters::{FakeEventBus, FakeLease, FakeRegistry, FakeStreams};
use dalston_catalog::Catalog;
use dalston_core::test_support::pending_job_with;
use dalston_core::{
    Clock, EngineCapabilities, EngineId, Event, FakeClock, Job, JobId, JobParams, Knobs,
    SequentialIdGen, Stage, Task,
};
use dalston_engine::{Runtime, RuntimeDeps, StaleScanner};
use dalston_runner::{EngineError, EngineHandler, EngineRunner, TaskInput, TaskOutput};
use dalston_storage::{JobStore, MemoryStore};
use std::sync::Arc;
use std::sync::Mutex;
use tokio::sync::mpsc::UnboundedReceiver;

pub type SpecRuntime =
    Runtime<MemoryStore, FakeStreams, FakeRegistry, FakeEventBus, FakeClock, SequentialIdGen>;
pub type SpecScanner = StaleScanner<FakeStreams, FakeEventBus, FakeLease, FakeClock>;
pub type SpecRunner =
    EngineRunner<ScriptedEngine, MemoryStore, FakeStreams, FakeRegistry, FakeEventBus, FakeClock>;

/// Engine behavior per scenario.
#[derive(Clone)]
pub enum Script {
    /// Always succeed, producing an artifact keyed by (job, task).
    Succeed,
    /// Always fail with this message.
    Fail(String),
    /// Fail the first `n` invocations, then succeed.
    FailTimes(Arc<Mutex<u32>>),
}

impl Script {
    pub fn fail_times(n: u32) -> Self {
        Script::FailTimes(Arc::new(Mutex::new(n)))
    }
}

/// An engine whose `process` follows a [`Script`].
#[derive(Clone)]
pub struct ScriptedEngine {
    script: Script,
    pub processed: Arc<Mutex<Vec<TaskInput>>>,
}

impl ScriptedEngine {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            processed: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl EngineHandler for ScriptedEngine {
    async fn process(&self, input: TaskInput) -> Result<TaskOutput, EngineError> {
        match &self.script {
            Script::Succeed => {}
            Script::Fail(message) => return Err(EngineError::Process(message.clone())),
            Script::FailTimes(remaining) => {
                let mut remaining = remaining.lock().unwrap();
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(EngineError::Process("transient failure".to_string()));
                }
            }
        }
        let uri = format!("s3://artifacts/{}/{}.json", input.job_id, input.task_id);
        self.processed.lock().unwrap().push(input);
        Ok(TaskOutput { output_uri: uri })
    }
}

/// The test world: one controller plus scripted engines.
pub struct World {
    pub clock: FakeClock,
    pub store: MemoryStore,
    pub streams: FakeStreams,
    pub registry: FakeRegistry,
    pub bus: FakeEventBus,
    pub runtime: SpecRuntime,
    pub scanner: SpecScanner,
    pub engines: Vec<SpecRunner>,
    events: UnboundedReceiver<Event>,
}

impl World {
    pub fn new(catalog: Catalog, knobs: Knobs) -> Self {
        let clock = FakeClock::default();
        let store = MemoryStore::new();
        let streams = FakeStreams::new(clock.clone());
        let registry = FakeRegistry::new(clock.clone());
        let bus = FakeEventBus::new();
        let events = bus.subscribe();
        let runtime = Runtime::new(
            RuntimeDeps {
                store: store.clone(),
                streams: streams.clone(),
                registry: registry.clone(),
                bus: bus.clone(),
            },
            Arc::new(catalog),
            knobs.clone(),
            clock.clone(),
            SequentialIdGen::new("t"),
        );
        let lease = FakeLease::new(clock.clone(), "ctrl-a");
        let scanner = StaleScanner::new(
            streams.clone(),
            bus.clone(),
            lease,
            clock.clone(),
            knobs,
        );
        Self {
            clock,
            store,
            streams,
            registry,
            bus,
            runtime,
            scanner,
            engines: Vec::new(),
            events,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(Catalog::default(), Knobs::default())
    }

    /// Start a scripted engine: registers it (long TTL) and adds its
    /// runner to the world.
    pub fn start_engine(&mut self, capabilities: EngineCapabilities, script: Script) {
        self.registry.register(capabilities.clone());
        let runner = EngineRunner::new(
            ScriptedEngine::new(script),
            capabilities,
            self.store.clone(),
            self.streams.clone(),
            self.registry.clone(),
            self.bus.clone(),
            self.clock.clone(),
            Knobs::default(),
        );
        self.engines.push(runner);
    }

    /// Persist a PENDING job and deliver `job.created`.
    pub async fn submit(&mut self, id: &str, params: JobParams) {
        let job = pending_job_with(id, params);
        self.store.insert_job(&job).await.unwrap();
        self.runtime
            .handle_event(Event::JobCreated {
                job_id: JobId::new(id),
                timestamp: self.clock.now(),
            })
            .await
            .unwrap();
        self.settle().await;
    }

    /// Run engines and handlers until the world is quiet: no engine has
    /// work and no events are in flight.
    pub async fn settle(&mut self) {
        loop {
            let mut progress = false;
            while let Ok(event) = self.events.try_recv() {
                self.runtime.handle_event(event).await.unwrap();
                progress = true;
            }
            for engine in &self.engines {
                if engine.step().await.unwrap() {
                    progress = true;
                }
            }
            if !progress {
                break;
            }
        }
    }

    pub fn job(&self, id: &str) -> Job {
        self.store.job(&JobId::new(id)).unwrap()
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
}

// ── capability shorthands ───────────────────────────────────────────────────

pub fn engine(id: &str, stage: &str) -> EngineCapabilities {
    EngineCapabilities {
        engine_id: EngineId::new(id),
        stages: vec![Stage::new(stage)],
        languages: Vec::new(),
        word_timestamps: false,
        includes_diarization: false,
        streaming: false,
        rtf_gpu: None,
        model_id: None,
        loaded_model: None,
        resources: None,
    }
}

pub fn transcriber(id: &str, languages: &[&str], word_timestamps: bool) -> EngineCapabilities {
    EngineCapabilities {
        languages: languages.iter().map(|l| l.to_string()).collect(),
        word_timestamps,
        ..engine(id, "transcribe")
    }
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The trait an engine implements to plug into the runner.

use crate::error::EngineError;
use async_trait::async_trait;
use dalston_core::{JobId, Stage, Task, TaskId};

/// Everything an engine sees about one task.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskInput {
    pub task_id: TaskId,
    pub job_id: JobId,
    pub stage: Stage,
    /// Opaque per-engine configuration from the DAG builder.
    pub config: serde_json::Value,
    /// Explicit input locator; absent when the engine derives inputs from
    /// predecessor artifacts by `(job_id, task_id)` convention.
    pub input_uri: Option<String>,
}

impl TaskInput {
    pub fn from_task(task: &Task) -> Self {
        Self {
            task_id: task.id.clone(),
            job_id: task.job_id.clone(),
            stage: task.stage.clone(),
            config: task.config.clone(),
            input_uri: task.input_uri.clone(),
        }
    }
}

/// The artifact an engine produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskOutput {
    /// Object-storage location of the written artifact.
    pub output_uri: String,
}

/// The engine side of the contract: do the work, swap models on request.
///
/// `process` may take minutes; the runner keeps the rest of the system
/// honest around it. Invocations must be idempotent per `(job_id,
/// task_id)` — the same input may arrive twice.
#[async_trait]
pub trait EngineHandler: Send + Sync + 'static {
    async fn process(&self, input: TaskInput) -> Result<TaskOutput, EngineError>;

    /// Release current weights and load `model_id`. Only called when the
    /// task's `runtime_model_id` differs from what is loaded. The default
    /// suits single-model engines.
    async fn load_model(&self, model_id: &str) -> Result<(), EngineError> {
        let _ = model_id;
        Ok(())
    }
}

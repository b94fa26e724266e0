// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task record and state machine.

use crate::id::{EngineId, JobId, TaskId};
use crate::stage::Stage;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Task lifecycle status.
///
/// PENDING→READY is the dependency gate (all predecessors COMPLETED or
/// SKIPPED); READY→RUNNING happens on stream receipt. SKIPPED is the
/// terminal state of a failed optional task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Ready,
    Running,
    Completed,
    Failed,
    Skipped,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Ready => "ready",
            TaskStatus::Running => "running",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
            TaskStatus::Skipped => "skipped",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Skipped
        )
    }

    /// Terminal and counts as "done" for dependency purposes.
    pub fn satisfies_dependency(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Skipped)
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(TaskStatus::Pending),
            "ready" => Some(TaskStatus::Ready),
            "running" => Some(TaskStatus::Running),
            "completed" => Some(TaskStatus::Completed),
            "failed" => Some(TaskStatus::Failed),
            "skipped" => Some(TaskStatus::Skipped),
            _ => None,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One node of a job's task DAG.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub job_id: JobId,
    pub stage: Stage,
    pub engine_id: EngineId,
    pub status: TaskStatus,
    /// Predecessor task ids, always within the same job.
    #[serde(default)]
    pub dependencies: Vec<TaskId>,
    /// Opaque per-engine configuration, including `runtime_model_id` when
    /// the chosen engine is a model variant.
    #[serde(default)]
    pub config: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_uri: Option<String>,
    /// Handler-driven re-enqueues consumed so far.
    #[serde(default)]
    pub retries: u32,
    pub max_retries: u32,
    /// Failed optional tasks become SKIPPED instead of failing the job.
    pub required: bool,
    /// Mirror of the stream's per-message delivery count, for observability.
    #[serde(default)]
    pub delivery_count: u32,
    /// Engine replacements consumed after `engine_disappeared`.
    #[serde(default)]
    pub reselections: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Whether every dependency appears in `done` (COMPLETED or SKIPPED).
    pub fn dependencies_satisfied(&self, done: &HashSet<&TaskId>) -> bool {
        self.dependencies.iter().all(|dep| done.contains(dep))
    }

    /// The model this task wants loaded, when its engine is a multi-variant
    /// runtime.
    pub fn runtime_model_id(&self) -> Option<&str> {
        self.config.get("runtime_model_id").and_then(|v| v.as_str())
    }

    /// Per-stage timeout stamped by the DAG builder, for stream messages.
    pub fn timeout_secs(&self) -> Option<u64> {
        self.config.get("timeout_secs").and_then(|v| v.as_u64())
    }
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;

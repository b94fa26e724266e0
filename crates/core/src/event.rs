// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Broadcast events for the orchestration core.
//!
//! Events are hints: handlers treat them as work items, but every
//! state-changing step is guarded by an atomic database transition, so
//! duplicated or reordered delivery is harmless.
//!
//! Serializes with `{"type": "job.created", ...fields}` format.

use crate::error::{ErrorCategory, JobError};
use crate::id::{JobId, TaskId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Events published on the broadcast channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    /// A job row was persisted PENDING by the gateway.
    #[serde(rename = "job.created")]
    JobCreated {
        job_id: JobId,
        timestamp: DateTime<Utc>,
    },

    /// All required tasks reached terminal success.
    #[serde(rename = "job.completed")]
    JobCompleted {
        job_id: JobId,
        timestamp: DateTime<Utc>,
    },

    /// A required task failed terminally, or selection failed up front.
    #[serde(rename = "job.failed")]
    JobFailed {
        job_id: JobId,
        error: JobError,
        timestamp: DateTime<Utc>,
    },

    /// An engine finished a task and wrote its artifact.
    #[serde(rename = "task.completed")]
    TaskCompleted {
        task_id: TaskId,
        job_id: JobId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        output_uri: Option<String>,
        timestamp: DateTime<Utc>,
    },

    /// A task attempt failed; the category shapes the next action.
    #[serde(rename = "task.failed")]
    TaskFailed {
        task_id: TaskId,
        job_id: JobId,
        category: ErrorCategory,
        error: String,
        timestamp: DateTime<Utc>,
    },

    /// Engine-reported progress, for gateway streaming. Never acted on.
    #[serde(rename = "task.progress")]
    TaskProgress {
        task_id: TaskId,
        job_id: JobId,
        progress: f32,
        timestamp: DateTime<Utc>,
    },
}

impl Event {
    /// The job this event belongs to.
    pub fn job_id(&self) -> &JobId {
        match self {
            Event::JobCreated { job_id, .. }
            | Event::JobCompleted { job_id, .. }
            | Event::JobFailed { job_id, .. }
            | Event::TaskCompleted { job_id, .. }
            | Event::TaskFailed { job_id, .. }
            | Event::TaskProgress { job_id, .. } => job_id,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Event::JobCreated { timestamp, .. }
            | Event::JobCompleted { timestamp, .. }
            | Event::JobFailed { timestamp, .. }
            | Event::TaskCompleted { timestamp, .. }
            | Event::TaskFailed { timestamp, .. }
            | Event::TaskProgress { timestamp, .. } => *timestamp,
        }
    }

    /// Short tag for logs (`job.created`, `task.failed`, ...).
    pub fn kind(&self) -> &'static str {
        match self {
            Event::JobCreated { .. } => "job.created",
            Event::JobCompleted { .. } => "job.completed",
            Event::JobFailed { .. } => "job.failed",
            Event::TaskCompleted { .. } => "task.completed",
            Event::TaskFailed { .. } => "task.failed",
            Event::TaskProgress { .. } => "task.progress",
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;

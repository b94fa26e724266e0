// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use crate::{
    EngineCapabilities, EngineId, Event, Job, JobId, JobParams, Stage, Task, TaskId, TaskStatus,
};
use chrono::{DateTime, Utc};

/// Fixed instant used across tests for reproducibility.
pub fn test_epoch() -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000, 0).unwrap_or_else(Utc::now)
}

// ── Record factory functions ────────────────────────────────────────────────

/// A PENDING English job with no extras.
pub fn pending_job(id: &str) -> Job {
    Job::new(
        JobId::new(id),
        "tenant-1",
        format!("s3://audio/{id}.wav"),
        JobParams::new("en"),
        test_epoch(),
    )
}

pub fn pending_job_with(id: &str, params: JobParams) -> Job {
    Job::new(
        JobId::new(id),
        "tenant-1",
        format!("s3://audio/{id}.wav"),
        params,
        test_epoch(),
    )
}

/// A PENDING task with no dependencies.
pub fn pending_task(id: &str, job_id: &str, stage: &str, engine_id: &str) -> Task {
    Task {
        id: TaskId::new(id),
        job_id: JobId::new(job_id),
        stage: Stage::new(stage),
        engine_id: EngineId::new(engine_id),
        status: TaskStatus::Pending,
        dependencies: Vec::new(),
        config: serde_json::json!({}),
        input_uri: None,
        output_uri: None,
        retries: 0,
        max_retries: 3,
        required: true,
        delivery_count: 0,
        reselections: 0,
        error: None,
        created_at: test_epoch(),
        started_at: None,
        completed_at: None,
    }
}

/// Capabilities document for a single-stage engine serving all languages.
pub fn caps(engine_id: &str, stage: &str) -> EngineCapabilities {
    EngineCapabilities {
        engine_id: EngineId::new(engine_id),
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

/// Capabilities for a transcriber with an explicit language set.
pub fn transcriber(engine_id: &str, languages: &[&str]) -> EngineCapabilities {
    EngineCapabilities {
        languages: languages.iter().map(|l| l.to_string()).collect(),
        ..caps(engine_id, "transcribe")
    }
}

// ── Event factory functions ─────────────────────────────────────────────────

pub fn job_created_event(job_id: &str) -> Event {
    Event::JobCreated {
        job_id: JobId::new(job_id),
        timestamp: test_epoch(),
    }
}

pub fn task_completed_event(task_id: &str, job_id: &str) -> Event {
    Event::TaskCompleted {
        task_id: TaskId::new(task_id),
        job_id: JobId::new(job_id),
        output_uri: Some(format!("s3://artifacts/{job_id}/{task_id}.json")),
        timestamp: test_epoch(),
    }
}

pub fn task_failed_event(task_id: &str, job_id: &str, category: crate::ErrorCategory) -> Event {
    Event::TaskFailed {
        task_id: TaskId::new(task_id),
        job_id: JobId::new(job_id),
        category,
        error: "boom".to_string(),
        timestamp: test_epoch(),
    }
}

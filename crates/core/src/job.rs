// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job record and state machine.

use crate::error::JobError;
use crate::id::{EngineId, JobId};
use crate::stage::Stage;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Job lifecycle status.
///
/// PENDING is set by the gateway; the first handler to win the
/// PENDING→RUNNING compare-and-set owns DAG creation. COMPLETED, FAILED and
/// CANCELLED are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(JobStatus::Pending),
            "running" => Some(JobStatus::Running),
            "completed" => Some(JobStatus::Completed),
            "failed" => Some(JobStatus::Failed),
            "cancelled" => Some(JobStatus::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How speakers should be attributed in the transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SpeakerDetection {
    /// No speaker attribution.
    #[default]
    None,
    /// Diarization over the mixed-down audio.
    Auto,
    /// Speaker identity is channel assignment; each channel is transcribed
    /// separately and no diarization runs.
    PerChannel,
}

/// Client-supplied job configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobParams {
    pub language: String,
    #[serde(default)]
    pub word_timestamps: bool,
    #[serde(default)]
    pub speaker_detection: SpeakerDetection,
    /// Channel count of the source audio, from the gateway's probe.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channels: Option<u8>,
    /// Optional enrichment stages to append (emotions, events, refine, ...).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub enrichment: Vec<Stage>,
    /// Pin the transcriber to a specific engine.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine: Option<EngineId>,
    /// Audio duration from the gateway's probe, used for timeout stamping.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_duration_secs: Option<f64>,
}

impl JobParams {
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            word_timestamps: false,
            speaker_detection: SpeakerDetection::None,
            channels: None,
            enrichment: Vec::new(),
            engine: None,
            audio_duration_secs: None,
        }
    }

    /// Whether the DAG should take the per-channel shape.
    pub fn split_channels(&self) -> bool {
        self.speaker_detection == SpeakerDetection::PerChannel
    }

    /// Channel count for the per-channel shape (stereo when unprobed).
    pub fn channel_count(&self) -> u8 {
        self.channels.unwrap_or(2)
    }
}

/// Recorded when an optional task fails terminally but the job completes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineWarning {
    pub stage: Stage,
    pub status: String,
    pub error: String,
}

impl PipelineWarning {
    pub fn failed(stage: Stage, error: impl Into<String>) -> Self {
        Self {
            stage,
            status: "failed".to_string(),
            error: error.into(),
        }
    }
}

/// A transcription job.
///
/// Owns its task set exclusively; deleting a job cascades to its tasks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub tenant_id: String,
    pub status: JobStatus,
    pub audio_uri: String,
    pub params: JobParams,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JobError>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<PipelineWarning>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Job {
    /// A fresh PENDING job, as the gateway persists it.
    pub fn new(
        id: JobId,
        tenant_id: impl Into<String>,
        audio_uri: impl Into<String>,
        params: JobParams,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            tenant_id: tenant_id.into(),
            status: JobStatus::Pending,
            audio_uri: audio_uri.into(),
            params,
            error: None,
            warnings: Vec::new(),
            created_at,
            started_at: None,
            completed_at: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;

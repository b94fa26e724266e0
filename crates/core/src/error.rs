// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Failure taxonomy shared across the orchestrator.
//!
//! Every failure observable by the core carries an [`ErrorCategory`]; the
//! category decides the next action (retry, re-select, skip, or escalate to
//! job failure).

use crate::capabilities::Requirements;
use crate::id::EngineId;
use crate::stage::Stage;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable failure categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Selector found no live engine satisfying the requirements.
    NoCapableEngine,
    /// The consumer holding a task vanished from the registry.
    EngineDisappeared,
    /// A task exhausted its stream delivery budget.
    MaxRetriesExceeded,
    /// A task sat unacknowledged past its absolute timeout.
    TaskTimeout,
    /// The engine's `process()` returned an error.
    EngineError,
    /// The job was cancelled before the task ran.
    Cancelled,
    /// Engine metadata or catalog document failed validation.
    SchemaViolation,
    /// Task insert hit the `(job_id, stage)` unique index.
    UniquenessViolation,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::NoCapableEngine => "no_capable_engine",
            ErrorCategory::EngineDisappeared => "engine_disappeared",
            ErrorCategory::MaxRetriesExceeded => "max_retries_exceeded",
            ErrorCategory::TaskTimeout => "task_timeout",
            ErrorCategory::EngineError => "engine_error",
            ErrorCategory::Cancelled => "cancelled",
            ErrorCategory::SchemaViolation => "schema_violation",
            ErrorCategory::UniquenessViolation => "uniqueness_violation",
        }
    }

    /// Whether a failure in this category may be re-enqueued against the
    /// task's retry budget. Re-selection and terminal categories are not
    /// retryable here; they have their own paths.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorCategory::EngineError)
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Structured error persisted on a failed job row.
///
/// `detail` holds category-specific structure (for `no_capable_engine`, the
/// full selector error) so the gateway can surface it verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobError {
    pub code: ErrorCategory,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<serde_json::Value>,
}

impl JobError {
    pub fn new(code: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: serde_json::Value) -> Self {
        self.detail = Some(detail);
        self
    }
}

impl fmt::Display for JobError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl From<NoCapableEngineError> for JobError {
    fn from(err: NoCapableEngineError) -> Self {
        let message = err.to_string();
        let detail = serde_json::to_value(&err).ok();
        Self {
            code: ErrorCategory::NoCapableEngine,
            message,
            detail,
        }
    }
}

/// A live engine that was considered and rejected, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateMismatch {
    pub engine_id: EngineId,
    pub reason: String,
}

/// A catalog engine that could satisfy the requirements if started.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogAlternative {
    pub engine_id: EngineId,
    /// Deployable image reference to run.
    pub image: String,
}

/// Selection failed: no live engine can serve the stage.
///
/// Carries every registry candidate with a per-engine mismatch explanation
/// plus catalog entries that *could* satisfy the requirements if deployed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoCapableEngineError {
    pub stage: Stage,
    pub requirements: Requirements,
    pub running_engines: Vec<CandidateMismatch>,
    pub catalog_alternatives: Vec<CatalogAlternative>,
}

impl fmt::Display for NoCapableEngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "no capable engine for stage '{}'", self.stage)?;
        if let Some(lang) = &self.requirements.language {
            write!(f, " (language '{}')", lang)?;
        }
        if self.running_engines.is_empty() {
            write!(f, "; no engines running for this stage")?;
        } else {
            let reasons: Vec<String> = self
                .running_engines
                .iter()
                .map(|c| format!("{}: {}", c.engine_id, c.reason))
                .collect();
            write!(f, "; rejected: [{}]", reasons.join("; "))?;
        }
        if !self.catalog_alternatives.is_empty() {
            let alts: Vec<&str> = self
                .catalog_alternatives
                .iter()
                .map(|a| a.engine_id.as_str())
                .collect();
            write!(f, "; could start: [{}]", alts.join(", "))?;
        }
        Ok(())
    }
}

impl std::error::Error for NoCapableEngineError {}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;

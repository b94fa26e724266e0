// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the storage layer

use thiserror::Error;

/// Errors from job/task persistence.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Task insert hit the `(job_id, stage)` unique index — another
    /// controller already persisted this job's DAG.
    #[error("duplicate task DAG for job {job_id}")]
    UniqueViolation { job_id: String },
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },
    /// A persisted row no longer matches the domain model.
    #[error("corrupt {kind} row {id}: {message}")]
    InvalidRow {
        kind: &'static str,
        id: String,
        message: String,
    },
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

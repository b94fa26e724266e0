// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-stage work streams.
//!
//! One FIFO stream per pipeline stage, named by a stable prefix plus the
//! stage identifier, with a single consumer group named `engines`. The
//! stream's pending-entries list (per-message consumer, idle time,
//! delivery count) is the recovery surface shared by the Engine Runner's
//! dead-engine scan and the leader's stale scanner.

mod redis_impl;

pub use redis_impl::RedisStreams;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeStreams;

use async_trait::async_trait;
use dalston_core::{Stage, StreamMessage, TaskId};
use std::time::Duration;
use thiserror::Error;

/// Stable prefix for work-stream keys; stages are discovered by prefix
/// scan.
pub const STREAM_PREFIX: &str = "dalston:work:";

/// The single consumer group on every work stream.
pub const CONSUMER_GROUP: &str = "engines";

/// Stream key for a stage.
pub fn stream_key(stage: &Stage) -> String {
    format!("{STREAM_PREFIX}{stage}")
}

/// Inverse of [`stream_key`].
pub fn stage_from_key(key: &str) -> Option<Stage> {
    key.strip_prefix(STREAM_PREFIX).map(Stage::new)
}

/// Errors from work-stream operations
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("malformed stream entry {entry_id} on '{stage}'")]
    MalformedEntry { stage: String, entry_id: String },
}

/// A delivered-but-unacknowledged entry, as the pending list reports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingEntry {
    pub entry_id: String,
    /// Consumer id (engine id) currently holding the entry.
    pub consumer: String,
    pub idle: Duration,
    pub delivery_count: u32,
}

/// A message handed to a consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    pub entry_id: String,
    pub message: StreamMessage,
}

/// Work-queue operations shared by the scheduler, scanner, and runner.
#[async_trait]
pub trait WorkStreams: Clone + Send + Sync + 'static {
    /// Append a message to the stage's stream, creating the stream and the
    /// `engines` group on first use. Returns the entry id.
    async fn append(&self, stage: &Stage, message: &StreamMessage)
        -> Result<String, StreamError>;

    /// Blocking read of one new message for this consumer, waiting up to
    /// `block`.
    async fn read_new(
        &self,
        stage: &Stage,
        consumer: &str,
        block: Duration,
    ) -> Result<Option<WorkItem>, StreamError>;

    /// Inspect the pending-entries list for the stage.
    async fn pending(&self, stage: &Stage) -> Result<Vec<PendingEntry>, StreamError>;

    /// Atomically reassign a pending entry to `consumer` if it has been
    /// idle at least `min_idle`. Returns the item on success, `None` when
    /// another consumer claimed it first or it was acknowledged.
    async fn claim(
        &self,
        stage: &Stage,
        consumer: &str,
        min_idle: Duration,
        entry_id: &str,
    ) -> Result<Option<WorkItem>, StreamError>;

    /// Acknowledge an entry. Acknowledgment is the single source of truth
    /// for "this task is no longer in flight".
    async fn ack(&self, stage: &Stage, entry_id: &str) -> Result<(), StreamError>;

    /// Fetch a specific entry's message (pending-entry inspection).
    async fn get(&self, stage: &Stage, entry_id: &str)
        -> Result<Option<StreamMessage>, StreamError>;

    /// Enumerate stages with existing streams, by prefix scan.
    async fn discover_stages(&self) -> Result<Vec<Stage>, StreamError>;

    /// Delete not-yet-delivered entries for a task (cancellation).
    /// Entries already delivered to a consumer are left alone. Returns the
    /// number removed.
    async fn remove_unclaimed(
        &self,
        stage: &Stage,
        task_id: &TaskId,
    ) -> Result<u32, StreamError>;
}

#[cfg(test)]
#[path = "streams_tests.rs"]
mod tests;

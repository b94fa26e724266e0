// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The broadcast event channel.
//!
//! A single pub/sub channel carrying `job.created`, `task.completed`,
//! `task.failed`, and `task.progress`. Events are hints only — a lost or
//! duplicated broadcast never corrupts state because every handler step is
//! CAS-guarded in the database.

mod redis_impl;

pub use redis_impl::{RedisEventBus, RedisEventSubscriber};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeEventBus;

use async_trait::async_trait;
use dalston_core::Event;
use thiserror::Error;

/// The single broadcast channel name.
pub const EVENT_CHANNEL: &str = "dalston:events";

/// Errors from event publication
#[derive(Debug, Error)]
pub enum EventBusError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Publish side of the broadcast channel.
#[async_trait]
pub trait EventBus: Clone + Send + Sync + 'static {
    async fn publish(&self, event: &Event) -> Result<(), EventBusError>;
}

#[cfg(test)]
#[path = "events_tests.rs"]
mod tests;

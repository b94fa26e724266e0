// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The live engine registry.
//!
//! Engines heartbeat their capabilities document into a TTL'd key; expiry
//! implicitly marks the engine dead. Heartbeats are best-effort — a missed
//! write only makes the engine invisible to selection for one interval.

mod redis_impl;

pub use redis_impl::RedisRegistry;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeRegistry;

use async_trait::async_trait;
use dalston_core::{EngineCapabilities, EngineId, Stage};
use std::time::Duration;
use thiserror::Error;

/// Key prefix for registry entries.
pub const REGISTRY_PREFIX: &str = "dalston:engines:";

/// Errors from registry operations
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("corrupt registry entry for '{engine_id}': {source}")]
    Corrupt {
        engine_id: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Runtime view of which engines are alive and what each can do.
///
/// Read-only for the orchestrator; each engine owns its own entry.
#[async_trait]
pub trait Registry: Clone + Send + Sync + 'static {
    /// Write this engine's capabilities with a TTL.
    async fn heartbeat(
        &self,
        capabilities: &EngineCapabilities,
        ttl: Duration,
    ) -> Result<(), RegistryError>;

    async fn get(&self, engine_id: &EngineId)
        -> Result<Option<EngineCapabilities>, RegistryError>;

    /// TTL-present check; cheaper than `get` when the document is not
    /// needed.
    async fn is_available(&self, engine_id: &EngineId) -> Result<bool, RegistryError>;

    /// Enumerate live engines serving `stage`, via cursor-based key
    /// scanning.
    async fn get_engines_for_stage(
        &self,
        stage: &Stage,
    ) -> Result<Vec<EngineCapabilities>, RegistryError>;
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;

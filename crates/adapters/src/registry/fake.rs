// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory registry for tests, with clock-driven TTL expiry.

use super::{Registry, RegistryError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dalston_core::{Clock, EngineCapabilities, EngineId, FakeClock, Stage};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

struct Entry {
    capabilities: EngineCapabilities,
    expires_at: DateTime<Utc>,
}

/// Shared in-memory registry; clones see the same state.
#[derive(Clone)]
pub struct FakeRegistry {
    entries: Arc<Mutex<BTreeMap<EngineId, Entry>>>,
    clock: FakeClock,
}

impl FakeRegistry {
    pub fn new(clock: FakeClock) -> Self {
        Self {
            entries: Arc::new(Mutex::new(BTreeMap::new())),
            clock,
        }
    }

    /// Register an engine with a long TTL (test setup shorthand).
    pub fn register(&self, capabilities: EngineCapabilities) {
        let expires_at = self.clock.now() + chrono::Duration::days(365);
        self.entries.lock().insert(
            capabilities.engine_id.clone(),
            Entry {
                capabilities,
                expires_at,
            },
        );
    }

    /// Drop an engine's entry immediately (simulates a crash + TTL expiry).
    pub fn remove(&self, engine_id: &EngineId) {
        self.entries.lock().remove(engine_id);
    }

    fn live(&self, entry: &Entry) -> bool {
        entry.expires_at > self.clock.now()
    }
}

impl Default for FakeRegistry {
    fn default() -> Self {
        Self::new(FakeClock::default())
    }
}

#[async_trait]
impl Registry for FakeRegistry {
    async fn heartbeat(
        &self,
        capabilities: &EngineCapabilities,
        ttl: Duration,
    ) -> Result<(), RegistryError> {
        let expires_at = self.clock.now()
            + chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::seconds(30));
        self.entries.lock().insert(
            capabilities.engine_id.clone(),
            Entry {
                capabilities: capabilities.clone(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn get(
        &self,
        engine_id: &EngineId,
    ) -> Result<Option<EngineCapabilities>, RegistryError> {
        let entries = self.entries.lock();
        Ok(entries
            .get(engine_id)
            .filter(|e| self.live(e))
            .map(|e| e.capabilities.clone()))
    }

    async fn is_available(&self, engine_id: &EngineId) -> Result<bool, RegistryError> {
        let entries = self.entries.lock();
        Ok(entries.get(engine_id).is_some_and(|e| self.live(e)))
    }

    async fn get_engines_for_stage(
        &self,
        stage: &Stage,
    ) -> Result<Vec<EngineCapabilities>, RegistryError> {
        let entries = self.entries.lock();
        Ok(entries
            .values()
            .filter(|e| self.live(e) && e.capabilities.serves_stage(stage))
            .map(|e| e.capabilities.clone())
            .collect())
    }
}

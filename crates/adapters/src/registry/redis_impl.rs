// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Redis implementation of the engine registry.

use super::{Registry, RegistryError, REGISTRY_PREFIX};
use async_trait::async_trait;
use dalston_core::{EngineCapabilities, EngineId, Stage};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::time::Duration;

fn registry_key(engine_id: &EngineId) -> String {
    format!("{REGISTRY_PREFIX}{engine_id}")
}

/// TTL'd capability documents under `dalston:engines:<id>`.
#[derive(Clone)]
pub struct RedisRegistry {
    conn: ConnectionManager,
}

impl RedisRegistry {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }

    pub async fn connect(url: &str) -> Result<Self, RegistryError> {
        let client = redis::Client::open(url)?;
        let conn = client.get_connection_manager().await?;
        Ok(Self::new(conn))
    }

    fn parse(engine_id: &str, raw: &str) -> Result<EngineCapabilities, RegistryError> {
        serde_json::from_str(raw).map_err(|source| RegistryError::Corrupt {
            engine_id: engine_id.to_string(),
            source,
        })
    }
}

#[async_trait]
impl Registry for RedisRegistry {
    async fn heartbeat(
        &self,
        capabilities: &EngineCapabilities,
        ttl: Duration,
    ) -> Result<(), RegistryError> {
        let key = registry_key(&capabilities.engine_id);
        // Serialization of our own type cannot fail; treat it as corrupt
        // input if it somehow does.
        let payload =
            serde_json::to_string(capabilities).map_err(|source| RegistryError::Corrupt {
                engine_id: capabilities.engine_id.to_string(),
                source,
            })?;
        let mut conn = self.conn.clone();
        let _: () = conn.set_ex(&key, payload, ttl.as_secs()).await?;
        Ok(())
    }

    async fn get(
        &self,
        engine_id: &EngineId,
    ) -> Result<Option<EngineCapabilities>, RegistryError> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.get(registry_key(engine_id)).await?;
        raw.map(|r| Self::parse(engine_id.as_str(), &r)).transpose()
    }

    async fn is_available(&self, engine_id: &EngineId) -> Result<bool, RegistryError> {
        let mut conn = self.conn.clone();
        let exists: bool = conn.exists(registry_key(engine_id)).await?;
        Ok(exists)
    }

    async fn get_engines_for_stage(
        &self,
        stage: &Stage,
    ) -> Result<Vec<EngineCapabilities>, RegistryError> {
        let pattern = format!("{REGISTRY_PREFIX}*");
        let mut conn = self.conn.clone();
        let mut keys = Vec::new();
        {
            let mut iter: redis::AsyncIter<String> = conn.scan_match(&pattern).await?;
            while let Some(key) = iter.next_item().await.transpose()? {
                keys.push(key);
            }
        }
        keys.sort();

        let mut engines = Vec::new();
        for key in keys {
            // Entries can expire between SCAN and GET; skip the gaps.
            let raw: Option<String> = conn.get(&key).await?;
            let Some(raw) = raw else { continue };
            let id = key.strip_prefix(REGISTRY_PREFIX).unwrap_or(&key);
            let capabilities = Self::parse(id, &raw)?;
            if capabilities.serves_stage(stage) {
                engines.push(capabilities);
            }
        }
        Ok(engines)
    }
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Redis implementation of the leader lease.
//!
//! Acquisition is `SET key owner NX PX ttl`; renewal and release are
//! owner-checked Lua scripts so a controller can never renew or delete a
//! lease it lost.

use super::{LeaderLease, LeaseError, LEASE_KEY};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use std::time::Duration;

const RENEW_SCRIPT: &str = r#"
if redis.call('get', KEYS[1]) == ARGV[1] then
  return redis.call('pexpire', KEYS[1], ARGV[2])
else
  return 0
end
"#;

const RELEASE_SCRIPT: &str = r#"
if redis.call('get', KEYS[1]) == ARGV[1] then
  return redis.call('del', KEYS[1])
else
  return 0
end
"#;

/// Redis-backed lease; `owner` is this controller instance's id.
#[derive(Clone)]
pub struct RedisLease {
    conn: ConnectionManager,
    owner: String,
}

impl RedisLease {
    pub fn new(conn: ConnectionManager, owner: impl Into<String>) -> Self {
        Self {
            conn,
            owner: owner.into(),
        }
    }

    pub async fn connect(url: &str, owner: impl Into<String>) -> Result<Self, LeaseError> {
        let client = redis::Client::open(url)?;
        let conn = client.get_connection_manager().await?;
        Ok(Self::new(conn, owner))
    }
}

#[async_trait]
impl LeaderLease for RedisLease {
    async fn acquire(&self, ttl: Duration) -> Result<bool, LeaseError> {
        let mut conn = self.conn.clone();
        let acquired: Option<String> = redis::cmd("SET")
            .arg(LEASE_KEY)
            .arg(&self.owner)
            .arg("NX")
            .arg("PX")
            .arg(ttl.as_millis() as u64)
            .query_async(&mut conn)
            .await?;
        if acquired.is_some() {
            return Ok(true);
        }
        // Key exists: renew only if we are the holder.
        let renewed: i64 = redis::Script::new(RENEW_SCRIPT)
            .key(LEASE_KEY)
            .arg(&self.owner)
            .arg(ttl.as_millis() as u64)
            .invoke_async(&mut conn)
            .await?;
        Ok(renewed == 1)
    }

    async fn release(&self) -> Result<(), LeaseError> {
        let mut conn = self.conn.clone();
        let _: i64 = redis::Script::new(RELEASE_SCRIPT)
            .key(LEASE_KEY)
            .arg(&self.owner)
            .invoke_async(&mut conn)
            .await?;
        Ok(())
    }
}

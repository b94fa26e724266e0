// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Leader lease for the stale-task scanner.
//!
//! A single TTL'd key acquired with SET NX; only the holder runs the scan,
//! and each scan renews the lease. Losing the key (crash, partition) hands
//! leadership to whichever controller acquires next.

mod redis_impl;

pub use redis_impl::RedisLease;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeLease;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Key holding the current leader's instance id.
pub const LEASE_KEY: &str = "dalston:scanner:leader";

/// Errors from lease operations
#[derive(Debug, Error)]
pub enum LeaseError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

/// A single-holder lease identified by this instance's id.
#[async_trait]
pub trait LeaderLease: Clone + Send + Sync + 'static {
    /// Acquire the lease, or renew it if this instance already holds it.
    /// Returns whether this instance is the leader afterwards.
    async fn acquire(&self, ttl: Duration) -> Result<bool, LeaseError>;

    /// Give up the lease if held. Safe to call when not the holder.
    async fn release(&self) -> Result<(), LeaseError>;
}

#[cfg(test)]
#[path = "lease_tests.rs"]
mod tests;

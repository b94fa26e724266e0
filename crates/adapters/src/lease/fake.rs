// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory lease for tests, with clock-driven expiry.

use super::{LeaderLease, LeaseError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dalston_core::{Clock, FakeClock};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

struct Holder {
    owner: String,
    expires_at: DateTime<Utc>,
}

/// Shared lease state; each clone keeps its own `owner` identity.
#[derive(Clone)]
pub struct FakeLease {
    holder: Arc<Mutex<Option<Holder>>>,
    clock: FakeClock,
    owner: String,
}

impl FakeLease {
    pub fn new(clock: FakeClock, owner: impl Into<String>) -> Self {
        Self {
            holder: Arc::new(Mutex::new(None)),
            clock,
            owner: owner.into(),
        }
    }

    /// A second contender sharing the same lease state.
    pub fn contender(&self, owner: impl Into<String>) -> Self {
        Self {
            holder: Arc::clone(&self.holder),
            clock: self.clock.clone(),
            owner: owner.into(),
        }
    }

    /// Current holder, if the lease is live.
    pub fn holder(&self) -> Option<String> {
        let now = self.clock.now();
        self.holder
            .lock()
            .as_ref()
            .filter(|h| h.expires_at > now)
            .map(|h| h.owner.clone())
    }
}

#[async_trait]
impl LeaderLease for FakeLease {
    async fn acquire(&self, ttl: Duration) -> Result<bool, LeaseError> {
        let now = self.clock.now();
        let expires_at =
            now + chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::seconds(30));
        let mut holder = self.holder.lock();
        match holder.as_mut() {
            Some(h) if h.expires_at > now && h.owner != self.owner => Ok(false),
            Some(h) if h.expires_at > now => {
                h.expires_at = expires_at;
                Ok(true)
            }
            _ => {
                *holder = Some(Holder {
                    owner: self.owner.clone(),
                    expires_at,
                });
                Ok(true)
            }
        }
    }

    async fn release(&self) -> Result<(), LeaseError> {
        let mut holder = self.holder.lock();
        if holder.as_ref().is_some_and(|h| h.owner == self.owner) {
            *holder = None;
        }
        Ok(())
    }
}

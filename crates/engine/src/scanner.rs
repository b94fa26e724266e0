// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stale-task scanner, leader-only.
//!
//! On each tick the scanner renews (or tries to take) the leader lease,
//! then walks every work stream's pending-entries list looking for two
//! conditions: a delivery count at or past `max_deliveries`, and an entry
//! sitting unacknowledged past its absolute timeout. Both produce a
//! `task.failed` event and acknowledge the entry.
//!
//! The scanner never steals work — reclaiming from a dead consumer is the
//! Engine Runner's job, gated on the consumer being absent from the
//! registry.

use crate::error::RuntimeError;
use dalston_adapters::{EventBus, LeaderLease, PendingEntry, WorkStreams};
use dalston_core::{Clock, ErrorCategory, Event, Knobs, Stage};

/// Periodic scan of pending work, run by whichever controller holds the
/// lease.
pub struct StaleScanner<Q, B, L, C: Clock> {
    streams: Q,
    bus: B,
    lease: L,
    clock: C,
    knobs: Knobs,
}

impl<Q, B, L, C> StaleScanner<Q, B, L, C>
where
    Q: WorkStreams,
    B: EventBus,
    L: LeaderLease,
    C: Clock,
{
    pub fn new(streams: Q, bus: B, lease: L, clock: C, knobs: Knobs) -> Self {
        Self {
            streams,
            bus,
            lease,
            clock,
            knobs,
        }
    }

    /// One scan pass. Returns `false` without scanning when this instance
    /// is not the leader.
    pub async fn tick(&self) -> Result<bool, RuntimeError> {
        if !self.lease.acquire(self.knobs.leader_ttl).await? {
            tracing::debug!("not the scan leader, skipping");
            return Ok(false);
        }

        for stage in self.streams.discover_stages().await? {
            let pending = self.streams.pending(&stage).await?;
            for entry in pending {
                self.inspect(&stage, entry).await?;
            }
        }
        Ok(true)
    }

    async fn inspect(&self, stage: &Stage, entry: PendingEntry) -> Result<(), RuntimeError> {
        // Entry may have been acknowledged between XPENDING and here.
        let Some(message) = self.streams.get(stage, &entry.entry_id).await? else {
            return Ok(());
        };

        if entry.delivery_count >= self.knobs.max_deliveries {
            tracing::warn!(
                stage = %stage,
                task_id = %message.task_id,
                consumer = %entry.consumer,
                delivery_count = entry.delivery_count,
                "max deliveries reached, failing task"
            );
            return self
                .fail_entry(stage, &entry, message, ErrorCategory::MaxRetriesExceeded, "max retries exceeded")
                .await;
        }

        let past_deadline = self.clock.now() >= message.timeout_at;
        if past_deadline || entry.idle >= self.knobs.task_timeout {
            tracing::warn!(
                stage = %stage,
                task_id = %message.task_id,
                consumer = %entry.consumer,
                idle_secs = entry.idle.as_secs(),
                "task timed out, failing"
            );
            return self
                .fail_entry(stage, &entry, message, ErrorCategory::TaskTimeout, "task timeout")
                .await;
        }

        Ok(())
    }

    async fn fail_entry(
        &self,
        stage: &Stage,
        entry: &PendingEntry,
        message: dalston_core::StreamMessage,
        category: ErrorCategory,
        reason: &str,
    ) -> Result<(), RuntimeError> {
        // Emit first, ack second: a crash in between re-emits next scan,
        // which the CAS-guarded handler tolerates.
        self.bus
            .publish(&Event::TaskFailed {
                task_id: message.task_id,
                job_id: message.job_id,
                category,
                error: reason.to_string(),
                timestamp: self.clock.now(),
            })
            .await?;
        self.streams.ack(stage, &entry.entry_id).await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "scanner_tests.rs"]
mod tests;

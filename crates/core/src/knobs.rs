// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Orchestrator tuning knobs.
//!
//! Every value has a default; the daemon overlays environment variables on
//! top (see dalston-daemon's `env.rs`).

use crate::stage::Stage;
use std::collections::HashMap;
use std::time::Duration;

/// Runtime configuration observed by the core.
#[derive(Debug, Clone)]
pub struct Knobs {
    /// How often engines heartbeat capabilities into the registry.
    pub heartbeat_interval: Duration,
    /// Registry key TTL; expiry makes an engine invisible to selection.
    pub heartbeat_ttl: Duration,
    /// Idle time before another runner may claim a dead engine's work.
    pub stale_claim_idle: Duration,
    /// Stream deliveries before the scanner fails a task.
    pub max_deliveries: u32,
    /// Absolute per-task timeout, enforced by the scanner.
    pub task_timeout: Duration,
    /// Stale-scan cadence on the leader.
    pub scanner_interval: Duration,
    /// Leader lease TTL.
    pub leader_ttl: Duration,
    /// Blocking stream-read interval; bounds event-loop latency.
    pub block_read: Duration,
    /// Retry budget for tasks whose stage has no override.
    pub default_max_retries: u32,
    /// Per-stage retry budget overrides, keyed by base stage name.
    pub stage_max_retries: HashMap<String, u32>,
    /// Multiplier over `rtf_gpu × duration` when stamping stage timeouts.
    pub timeout_safety_factor: f64,
    /// Floor for stamped stage timeouts.
    pub min_stage_timeout: Duration,
    /// Whether `engine_disappeared` failures re-select a new engine.
    pub reselect_on_engine_loss: bool,
    /// Engine replacements allowed per task.
    pub max_reselections: u32,
}

impl Default for Knobs {
    fn default() -> Self {
        Self {
            heartbeat_interval: Duration::from_secs(10),
            heartbeat_ttl: Duration::from_secs(30),
            stale_claim_idle: Duration::from_secs(10 * 60),
            max_deliveries: 3,
            task_timeout: Duration::from_secs(30 * 60),
            scanner_interval: Duration::from_secs(60),
            leader_ttl: Duration::from_secs(30),
            block_read: Duration::from_secs(30),
            default_max_retries: 3,
            stage_max_retries: HashMap::new(),
            timeout_safety_factor: 2.0,
            min_stage_timeout: Duration::from_secs(60),
            reselect_on_engine_loss: true,
            max_reselections: 1,
        }
    }
}

impl Knobs {
    /// Retry budget for a stage, honoring per-stage overrides.
    pub fn max_retries_for(&self, stage: &Stage) -> u32 {
        self.stage_max_retries
            .get(stage.base())
            .copied()
            .unwrap_or(self.default_max_retries)
    }

    /// Absolute timeout to stamp on a stream message.
    ///
    /// `audio_duration × rtf_gpu × safety_factor`, clamped to
    /// `[min_stage_timeout, task_timeout]`. Falls back to the absolute
    /// task timeout when either input is unknown.
    pub fn stage_timeout(&self, rtf_gpu: Option<f64>, audio_duration_secs: Option<f64>) -> Duration {
        match (rtf_gpu, audio_duration_secs) {
            (Some(rtf), Some(duration)) if rtf > 0.0 && duration > 0.0 => {
                let secs = duration * rtf * self.timeout_safety_factor;
                let computed = Duration::from_secs_f64(secs);
                computed.clamp(self.min_stage_timeout, self.task_timeout)
            }
            _ => self.task_timeout,
        }
    }
}

#[cfg(test)]
#[path = "knobs_tests.rs"]
mod tests;

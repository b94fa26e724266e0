// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate.

use crate::lifecycle::LifecycleError;
use dalston_core::Knobs;
use std::path::PathBuf;
use std::time::Duration;

/// Postgres connection string. Required.
pub fn database_url() -> Result<String, LifecycleError> {
    std::env::var("DALSTON_DATABASE_URL").map_err(|_| LifecycleError::MissingEnv("DALSTON_DATABASE_URL"))
}

/// Redis connection string; local default for development.
pub fn redis_url() -> String {
    std::env::var("DALSTON_REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string())
}

/// Path to the generated catalog file.
pub fn catalog_path() -> PathBuf {
    std::env::var("DALSTON_CATALOG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("catalog.json"))
}

/// Log file path; stderr when unset.
pub fn log_path() -> Option<PathBuf> {
    std::env::var("DALSTON_LOG_PATH").ok().map(PathBuf::from)
}

fn secs(name: &str) -> Option<Duration> {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_secs)
}

fn uint(name: &str) -> Option<u32> {
    std::env::var(name).ok().and_then(|s| s.parse().ok())
}

fn flag(name: &str) -> Option<bool> {
    std::env::var(name).ok().and_then(|s| match s.as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    })
}

/// Per-stage retry overrides: `"transcribe=1,align=2"`.
fn stage_retries(raw: &str) -> impl Iterator<Item = (String, u32)> + '_ {
    raw.split(',').filter_map(|pair| {
        let (stage, count) = pair.split_once('=')?;
        Some((stage.trim().to_string(), count.trim().parse().ok()?))
    })
}

/// Orchestrator knobs: documented defaults overlaid with `DALSTON_*`
/// variables.
pub fn knobs() -> Knobs {
    let mut knobs = Knobs::default();
    if let Some(v) = secs("DALSTON_HEARTBEAT_INTERVAL_SECS") {
        knobs.heartbeat_interval = v;
    }
    if let Some(v) = secs("DALSTON_HEARTBEAT_TTL_SECS") {
        knobs.heartbeat_ttl = v;
    }
    if let Some(v) = secs("DALSTON_STALE_CLAIM_IDLE_SECS") {
        knobs.stale_claim_idle = v;
    }
    if let Some(v) = uint("DALSTON_MAX_DELIVERIES") {
        knobs.max_deliveries = v;
    }
    if let Some(v) = secs("DALSTON_TASK_TIMEOUT_SECS") {
        knobs.task_timeout = v;
    }
    if let Some(v) = secs("DALSTON_SCANNER_INTERVAL_SECS") {
        knobs.scanner_interval = v;
    }
    if let Some(v) = secs("DALSTON_LEADER_TTL_SECS") {
        knobs.leader_ttl = v;
    }
    if let Some(v) = secs("DALSTON_BLOCK_READ_SECS") {
        knobs.block_read = v;
    }
    if let Some(v) = uint("DALSTON_DEFAULT_MAX_RETRIES") {
        knobs.default_max_retries = v;
    }
    if let Ok(raw) = std::env::var("DALSTON_STAGE_MAX_RETRIES") {
        knobs.stage_max_retries.extend(stage_retries(&raw));
    }
    if let Some(v) = std::env::var("DALSTON_TIMEOUT_SAFETY_FACTOR")
        .ok()
        .and_then(|s| s.parse::<f64>().ok())
    {
        knobs.timeout_safety_factor = v;
    }
    if let Some(v) = secs("DALSTON_MIN_STAGE_TIMEOUT_SECS") {
        knobs.min_stage_timeout = v;
    }
    if let Some(v) = flag("DALSTON_RESELECT_ON_ENGINE_LOSS") {
        knobs.reselect_on_engine_loss = v;
    }
    if let Some(v) = uint("DALSTON_MAX_RESELECTIONS") {
        knobs.max_reselections = v;
    }
    knobs
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the Engine SDK

use dalston_adapters::{EventBusError, RegistryError, StreamError};
use dalston_storage::StoreError;
use thiserror::Error;

/// Failures produced by an engine's own code.
#[derive(Debug, Error)]
pub enum EngineError {
    /// `process()` failed; eligible for retry up to the task's budget.
    #[error("{0}")]
    Process(String),
    /// Loading the requested model failed. Not retried as a swap; the
    /// task fails and the orchestrator decides what happens next.
    #[error("model swap failed: {0}")]
    ModelSwap(String),
}

/// Infrastructure failures in the runner loop.
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("stream error: {0}")]
    Stream(#[from] StreamError),
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),
    #[error("event bus error: {0}")]
    Bus(#[from] EventBusError),
}

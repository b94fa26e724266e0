// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the engine runtime

use dalston_adapters::{EventBusError, LeaseError, RegistryError, StreamError};
use dalston_storage::StoreError;
use thiserror::Error;

/// Errors that can occur in the runtime
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("stream error: {0}")]
    Stream(#[from] StreamError),
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),
    #[error("event bus error: {0}")]
    Bus(#[from] EventBusError),
    #[error("lease error: {0}")]
    Lease(#[from] LeaseError),
    #[error("job not found: {0}")]
    JobNotFound(String),
    #[error("task not found: {0}")]
    TaskNotFound(String),
}

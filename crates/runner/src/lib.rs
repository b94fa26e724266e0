// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! dalston-runner: the Engine SDK.
//!
//! An engine process implements [`EngineHandler`] and hands it to
//! [`EngineRunner`], which owns the whole work loop: dead-engine claims,
//! blocking stream reads, cancellation re-checks, model swaps,
//! ack-and-publish, and the capability heartbeat. Execution is
//! at-least-once; `process()` must produce the same artifact for the same
//! input because object-storage keys derive from `(job_id, task_id)`.

mod error;
mod handler;
mod runner;

pub use error::{EngineError, RunnerError};
pub use handler::{EngineHandler, TaskInput, TaskOutput};
pub use runner::EngineRunner;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::unwrap_used))]

//! dalston-storage: the durable job/task tables.
//!
//! The job and task tables are the only shared mutable state between
//! controllers. Every transition that could race is expressed as a
//! compare-and-set (`UPDATE … WHERE status = <expected> RETURNING id`);
//! the `(job_id, stage)` unique index prevents duplicate DAG creation.

mod error;
mod pg;
mod store;

pub use error::StoreError;
pub use pg::PgStore;
pub use store::JobStore;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod memory;
#[cfg(any(test, feature = "test-support"))]
pub use memory::MemoryStore;

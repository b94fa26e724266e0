// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Adapters for external I/O: work streams, the engine registry, the
//! broadcast event channel, and the leader lease.
//!
//! Each concern is a trait with a Redis-backed implementation and an
//! in-memory fake (behind `test-support`). Controllers stay stateless:
//! every query is a fresh read of the external store.

pub mod events;
pub mod lease;
pub mod registry;
pub mod streams;

pub use events::{EventBus, EventBusError, RedisEventBus, RedisEventSubscriber};
pub use lease::{LeaderLease, LeaseError, RedisLease};
pub use registry::{RedisRegistry, Registry, RegistryError};
pub use streams::{
    stage_from_key, stream_key, PendingEntry, RedisStreams, StreamError, WorkItem, WorkStreams,
    CONSUMER_GROUP, STREAM_PREFIX,
};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use events::FakeEventBus;
#[cfg(any(test, feature = "test-support"))]
pub use lease::FakeLease;
#[cfg(any(test, feature = "test-support"))]
pub use registry::FakeRegistry;
#[cfg(any(test, feature = "test-support"))]
pub use streams::FakeStreams;

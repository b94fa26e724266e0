// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process event bus for tests.
//!
//! Records every published event for assertions and fans out to
//! subscribers over unbounded channels.

use super::{EventBus, EventBusError};
use async_trait::async_trait;
use dalston_core::Event;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;

#[derive(Default)]
struct Inner {
    published: Vec<Event>,
    subscribers: Vec<mpsc::UnboundedSender<Event>>,
}

/// Shared in-memory bus; clones see the same state.
#[derive(Clone, Default)]
pub struct FakeEventBus {
    inner: Arc<Mutex<Inner>>,
}

impl FakeEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything published so far, in order.
    pub fn published(&self) -> Vec<Event> {
        self.inner.lock().published.clone()
    }

    /// Published events of one kind (`"task.failed"` etc).
    pub fn published_of_kind(&self, kind: &str) -> Vec<Event> {
        self.inner
            .lock()
            .published
            .iter()
            .filter(|e| e.kind() == kind)
            .cloned()
            .collect()
    }

    /// New subscription receiving events published after this call.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<Event> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner.lock().subscribers.push(tx);
        rx
    }
}

#[async_trait]
impl EventBus for FakeEventBus {
    async fn publish(&self, event: &Event) -> Result<(), EventBusError> {
        let mut inner = self.inner.lock();
        inner.published.push(event.clone());
        inner
            .subscribers
            .retain(|tx| tx.send(event.clone()).is_ok());
        Ok(())
    }
}

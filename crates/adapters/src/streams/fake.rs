// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory `WorkStreams` for tests.
//!
//! Models the pending-entries list faithfully: delivery assigns a consumer
//! and starts the idle timer (driven by a `FakeClock`), claims respect
//! min-idle, and acks remove entries. Reads never block.

use super::{PendingEntry, StreamError, WorkItem, WorkStreams};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dalston_core::{Clock, FakeClock, Stage, StreamMessage, TaskId};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
struct Delivery {
    consumer: String,
    delivered_at: DateTime<Utc>,
    count: u32,
}

#[derive(Debug, Clone)]
struct Entry {
    id: String,
    message: StreamMessage,
    delivery: Option<Delivery>,
}

#[derive(Default)]
struct Inner {
    streams: BTreeMap<Stage, Vec<Entry>>,
    seq: u64,
}

/// Shared in-memory stream store; clones see the same state.
#[derive(Clone)]
pub struct FakeStreams {
    inner: Arc<Mutex<Inner>>,
    clock: FakeClock,
}

impl FakeStreams {
    pub fn new(clock: FakeClock) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
            clock,
        }
    }

    /// All messages still on the stage's stream, for assertions.
    pub fn messages(&self, stage: &Stage) -> Vec<StreamMessage> {
        self.inner
            .lock()
            .streams
            .get(stage)
            .map(|entries| entries.iter().map(|e| e.message.clone()).collect())
            .unwrap_or_default()
    }

    pub fn len(&self, stage: &Stage) -> usize {
        self.inner
            .lock()
            .streams
            .get(stage)
            .map(Vec::len)
            .unwrap_or(0)
    }

    pub fn is_empty(&self, stage: &Stage) -> bool {
        self.len(stage) == 0
    }
}

impl Default for FakeStreams {
    fn default() -> Self {
        Self::new(FakeClock::default())
    }
}

fn idle_of(delivery: &Delivery, now: DateTime<Utc>) -> Duration {
    (now - delivery.delivered_at).to_std().unwrap_or_default()
}

#[async_trait]
impl WorkStreams for FakeStreams {
    async fn append(
        &self,
        stage: &Stage,
        message: &StreamMessage,
    ) -> Result<String, StreamError> {
        let mut inner = self.inner.lock();
        inner.seq += 1;
        let id = format!("{}-0", inner.seq);
        inner.streams.entry(stage.clone()).or_default().push(Entry {
            id: id.clone(),
            message: message.clone(),
            delivery: None,
        });
        Ok(id)
    }

    async fn read_new(
        &self,
        stage: &Stage,
        consumer: &str,
        _block: Duration,
    ) -> Result<Option<WorkItem>, StreamError> {
        let now = self.clock.now();
        let mut inner = self.inner.lock();
        let Some(entries) = inner.streams.get_mut(stage) else {
            return Ok(None);
        };
        for entry in entries.iter_mut() {
            if entry.delivery.is_none() {
                entry.delivery = Some(Delivery {
                    consumer: consumer.to_string(),
                    delivered_at: now,
                    count: 1,
                });
                return Ok(Some(WorkItem {
                    entry_id: entry.id.clone(),
                    message: entry.message.clone(),
                }));
            }
        }
        Ok(None)
    }

    async fn pending(&self, stage: &Stage) -> Result<Vec<PendingEntry>, StreamError> {
        let now = self.clock.now();
        let inner = self.inner.lock();
        Ok(inner
            .streams
            .get(stage)
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|e| {
                        e.delivery.as_ref().map(|d| PendingEntry {
                            entry_id: e.id.clone(),
                            consumer: d.consumer.clone(),
                            idle: idle_of(d, now),
                            delivery_count: d.count,
                        })
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn claim(
        &self,
        stage: &Stage,
        consumer: &str,
        min_idle: Duration,
        entry_id: &str,
    ) -> Result<Option<WorkItem>, StreamError> {
        let now = self.clock.now();
        let mut inner = self.inner.lock();
        let Some(entries) = inner.streams.get_mut(stage) else {
            return Ok(None);
        };
        for entry in entries.iter_mut() {
            if entry.id != entry_id {
                continue;
            }
            let Some(delivery) = entry.delivery.as_mut() else {
                return Ok(None);
            };
            if idle_of(delivery, now) < min_idle {
                return Ok(None);
            }
            delivery.consumer = consumer.to_string();
            delivery.delivered_at = now;
            delivery.count += 1;
            return Ok(Some(WorkItem {
                entry_id: entry.id.clone(),
                message: entry.message.clone(),
            }));
        }
        Ok(None)
    }

    async fn ack(&self, stage: &Stage, entry_id: &str) -> Result<(), StreamError> {
        let mut inner = self.inner.lock();
        if let Some(entries) = inner.streams.get_mut(stage) {
            entries.retain(|e| e.id != entry_id);
        }
        Ok(())
    }

    async fn get(
        &self,
        stage: &Stage,
        entry_id: &str,
    ) -> Result<Option<StreamMessage>, StreamError> {
        let inner = self.inner.lock();
        Ok(inner.streams.get(stage).and_then(|entries| {
            entries
                .iter()
                .find(|e| e.id == entry_id)
                .map(|e| e.message.clone())
        }))
    }

    async fn discover_stages(&self) -> Result<Vec<Stage>, StreamError> {
        Ok(self.inner.lock().streams.keys().cloned().collect())
    }

    async fn remove_unclaimed(
        &self,
        stage: &Stage,
        task_id: &TaskId,
    ) -> Result<u32, StreamError> {
        let mut inner = self.inner.lock();
        let Some(entries) = inner.streams.get_mut(stage) else {
            return Ok(0);
        };
        let before = entries.len();
        entries.retain(|e| e.delivery.is_some() || &e.message.task_id != task_id);
        Ok((before - entries.len()) as u32)
    }
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Redis Streams implementation of `WorkStreams`.
//!
//! XADD / XREADGROUP / XCLAIM / XACK / XPENDING over one stream per stage,
//! all through a multiplexed connection manager. Consumer groups are
//! created lazily with MKSTREAM on first touch.

use super::{
    stage_from_key, stream_key, PendingEntry, StreamError, WorkItem, WorkStreams, CONSUMER_GROUP,
    STREAM_PREFIX,
};
use async_trait::async_trait;
use dalston_core::{Stage, StreamMessage, TaskId};
use redis::aio::ConnectionManager;
use redis::streams::{
    StreamClaimReply, StreamId, StreamPendingCountReply, StreamRangeReply, StreamReadOptions,
    StreamReadReply,
};
use redis::AsyncCommands;
use std::collections::HashSet;
use std::time::Duration;

/// Upper bound on pending entries inspected per scan pass.
const PENDING_BATCH: usize = 128;

/// `WorkStreams` over Redis Streams.
#[derive(Clone)]
pub struct RedisStreams {
    conn: ConnectionManager,
}

impl RedisStreams {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }

    pub async fn connect(url: &str) -> Result<Self, StreamError> {
        let client = redis::Client::open(url)?;
        let conn = client.get_connection_manager().await?;
        Ok(Self::new(conn))
    }

    /// Create the `engines` group (and the stream) if missing. BUSYGROUP
    /// means another process got there first.
    async fn ensure_group(&self, key: &str) -> Result<(), StreamError> {
        let mut conn = self.conn.clone();
        let result: Result<String, redis::RedisError> = conn
            .xgroup_create_mkstream(key, CONSUMER_GROUP, "0")
            .await;
        match result {
            Ok(_) => Ok(()),
            Err(err) if err.to_string().contains("BUSYGROUP") => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

fn value_to_string(value: &redis::Value) -> Option<String> {
    match value {
        redis::Value::BulkString(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
        redis::Value::SimpleString(s) => Some(s.clone()),
        _ => None,
    }
}

fn message_from_entry(entry: &StreamId) -> Option<StreamMessage> {
    let pairs: Vec<(String, String)> = entry
        .map
        .iter()
        .filter_map(|(k, v)| value_to_string(v).map(|s| (k.clone(), s)))
        .collect();
    StreamMessage::from_fields(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
}

fn item_from_entry(stage: &Stage, entry: &StreamId) -> Result<WorkItem, StreamError> {
    let message = message_from_entry(entry).ok_or_else(|| StreamError::MalformedEntry {
        stage: stage.to_string(),
        entry_id: entry.id.clone(),
    })?;
    Ok(WorkItem {
        entry_id: entry.id.clone(),
        message,
    })
}

#[async_trait]
impl WorkStreams for RedisStreams {
    async fn append(
        &self,
        stage: &Stage,
        message: &StreamMessage,
    ) -> Result<String, StreamError> {
        let key = stream_key(stage);
        self.ensure_group(&key).await?;
        let mut conn = self.conn.clone();
        let entry_id: String = conn.xadd(&key, "*", &message.to_fields()).await?;
        tracing::debug!(stage = %stage, entry_id = %entry_id, task_id = %message.task_id, "enqueued task");
        Ok(entry_id)
    }

    async fn read_new(
        &self,
        stage: &Stage,
        consumer: &str,
        block: Duration,
    ) -> Result<Option<WorkItem>, StreamError> {
        let key = stream_key(stage);
        self.ensure_group(&key).await?;
        let options = StreamReadOptions::default()
            .group(CONSUMER_GROUP, consumer)
            .count(1)
            .block(block.as_millis() as usize);
        let mut conn = self.conn.clone();
        let reply: StreamReadReply = conn.xread_options(&[&key], &[">"], &options).await?;
        for stream in &reply.keys {
            if let Some(entry) = stream.ids.first() {
                return item_from_entry(stage, entry).map(Some);
            }
        }
        Ok(None)
    }

    async fn pending(&self, stage: &Stage) -> Result<Vec<PendingEntry>, StreamError> {
        let key = stream_key(stage);
        self.ensure_group(&key).await?;
        let mut conn = self.conn.clone();
        let reply: StreamPendingCountReply = conn
            .xpending_count(&key, CONSUMER_GROUP, "-", "+", PENDING_BATCH)
            .await?;
        Ok(reply
            .ids
            .into_iter()
            .map(|p| PendingEntry {
                entry_id: p.id,
                consumer: p.consumer,
                idle: Duration::from_millis(p.last_delivered_ms as u64),
                delivery_count: p.times_delivered as u32,
            })
            .collect())
    }

    async fn claim(
        &self,
        stage: &Stage,
        consumer: &str,
        min_idle: Duration,
        entry_id: &str,
    ) -> Result<Option<WorkItem>, StreamError> {
        let key = stream_key(stage);
        let mut conn = self.conn.clone();
        let reply: StreamClaimReply = conn
            .xclaim(
                &key,
                CONSUMER_GROUP,
                consumer,
                min_idle.as_millis() as usize,
                &[entry_id],
            )
            .await?;
        match reply.ids.first() {
            Some(entry) => item_from_entry(stage, entry).map(Some),
            None => Ok(None),
        }
    }

    async fn ack(&self, stage: &Stage, entry_id: &str) -> Result<(), StreamError> {
        let key = stream_key(stage);
        let mut conn = self.conn.clone();
        let _: usize = conn.xack(&key, CONSUMER_GROUP, &[entry_id]).await?;
        // Acked entries are dead weight in the stream; drop them.
        let _: usize = conn.xdel(&key, &[entry_id]).await?;
        Ok(())
    }

    async fn get(
        &self,
        stage: &Stage,
        entry_id: &str,
    ) -> Result<Option<StreamMessage>, StreamError> {
        let key = stream_key(stage);
        let mut conn = self.conn.clone();
        let reply: StreamRangeReply = conn.xrange(&key, entry_id, entry_id).await?;
        Ok(reply.ids.first().and_then(message_from_entry))
    }

    async fn discover_stages(&self) -> Result<Vec<Stage>, StreamError> {
        let pattern = format!("{STREAM_PREFIX}*");
        let mut conn = self.conn.clone();
        let mut keys = Vec::new();
        {
            let mut iter: redis::AsyncIter<String> = conn.scan_match(&pattern).await?;
            while let Some(key) = iter.next_item().await.transpose()? {
                keys.push(key);
            }
        }
        keys.sort();
        Ok(keys.iter().filter_map(|k| stage_from_key(k)).collect())
    }

    async fn remove_unclaimed(
        &self,
        stage: &Stage,
        task_id: &TaskId,
    ) -> Result<u32, StreamError> {
        let key = stream_key(stage);
        let delivered: HashSet<String> = self
            .pending(stage)
            .await?
            .into_iter()
            .map(|p| p.entry_id)
            .collect();

        let mut conn = self.conn.clone();
        let reply: StreamRangeReply = conn.xrange(&key, "-", "+").await?;
        let mut removed = 0;
        for entry in &reply.ids {
            if delivered.contains(&entry.id) {
                continue;
            }
            let matches = message_from_entry(entry)
                .map(|m| &m.task_id == task_id)
                .unwrap_or(false);
            if matches {
                let _: usize = conn.xdel(&key, &[&entry.id]).await?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}

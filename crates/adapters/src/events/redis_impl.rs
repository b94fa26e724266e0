// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Redis Pub/Sub implementation of the event channel.

use super::{EventBus, EventBusError, EVENT_CHANNEL};
use async_trait::async_trait;
use dalston_core::Event;
use futures::stream::BoxStream;
use futures::StreamExt;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

/// Publisher over a multiplexed connection.
#[derive(Clone)]
pub struct RedisEventBus {
    conn: ConnectionManager,
}

impl RedisEventBus {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }

    pub async fn connect(url: &str) -> Result<Self, EventBusError> {
        let client = redis::Client::open(url)?;
        let conn = client.get_connection_manager().await?;
        Ok(Self::new(conn))
    }
}

#[async_trait]
impl EventBus for RedisEventBus {
    async fn publish(&self, event: &Event) -> Result<(), EventBusError> {
        let payload = serde_json::to_string(event)?;
        let mut conn = self.conn.clone();
        let _: usize = conn.publish(EVENT_CHANNEL, payload).await?;
        Ok(())
    }
}

/// Subscriber half; holds its own pub/sub connection.
pub struct RedisEventSubscriber {
    messages: BoxStream<'static, redis::Msg>,
}

impl RedisEventSubscriber {
    pub async fn connect(url: &str) -> Result<Self, EventBusError> {
        let client = redis::Client::open(url)?;
        let mut pubsub = client.get_async_pubsub().await?;
        pubsub.subscribe(EVENT_CHANNEL).await?;
        Ok(Self {
            messages: pubsub.into_on_message().boxed(),
        })
    }

    /// Next event from the channel. `None` when the connection closes.
    /// Malformed payloads are logged and skipped — foreign traffic on the
    /// channel must not wedge the loop.
    pub async fn recv(&mut self) -> Option<Event> {
        loop {
            let msg = self.messages.next().await?;
            let payload: String = match msg.get_payload() {
                Ok(p) => p,
                Err(err) => {
                    tracing::warn!(error = %err, "unreadable event payload, skipping");
                    continue;
                }
            };
            match serde_json::from_str(&payload) {
                Ok(event) => return Some(event),
                Err(err) => {
                    tracing::warn!(error = %err, payload = %payload, "malformed event, skipping");
                }
            }
        }
    }
}

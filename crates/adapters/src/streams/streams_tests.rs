// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Behavioral tests for the fake stream store — the contract the runner,
//! scheduler, and scanner rely on.

use super::*;
use chrono::Duration as ChronoDuration;
use dalston_core::{Clock, FakeClock, JobId};

fn message(task: &str, clock: &FakeClock) -> StreamMessage {
    StreamMessage {
        task_id: TaskId::new(task),
        job_id: JobId::new("job-1"),
        enqueued_at: clock.now(),
        timeout_at: clock.now() + ChronoDuration::minutes(30),
    }
}

#[test]
fn stream_key_roundtrip() {
    let stage = Stage::transcribe().with_channel(1);
    let key = stream_key(&stage);
    assert_eq!(key, "dalston:work:transcribe_ch1");
    assert_eq!(stage_from_key(&key), Some(stage));
    assert_eq!(stage_from_key("other:key"), None);
}

#[tokio::test]
async fn read_new_delivers_fifo_and_tracks_pending() {
    let clock = FakeClock::default();
    let streams = FakeStreams::new(clock.clone());
    let stage = Stage::transcribe();

    streams.append(&stage, &message("t-1", &clock)).await.unwrap();
    streams.append(&stage, &message("t-2", &clock)).await.unwrap();

    let first = streams
        .read_new(&stage, "engine-a", std::time::Duration::from_secs(1))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(first.message.task_id, "t-1");

    let pending = streams.pending(&stage).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].consumer, "engine-a");
    assert_eq!(pending[0].delivery_count, 1);
}

#[tokio::test]
async fn claim_requires_min_idle() {
    let clock = FakeClock::default();
    let streams = FakeStreams::new(clock.clone());
    let stage = Stage::transcribe();
    streams.append(&stage, &message("t-1", &clock)).await.unwrap();
    let item = streams
        .read_new(&stage, "engine-a", std::time::Duration::ZERO)
        .await
        .unwrap()
        .unwrap();

    let min_idle = std::time::Duration::from_secs(600);
    // Fresh delivery: not idle enough to steal.
    let stolen = streams
        .claim(&stage, "engine-b", min_idle, &item.entry_id)
        .await
        .unwrap();
    assert!(stolen.is_none());

    clock.advance(ChronoDuration::minutes(11));
    let stolen = streams
        .claim(&stage, "engine-b", min_idle, &item.entry_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stolen.message.task_id, "t-1");

    let pending = streams.pending(&stage).await.unwrap();
    assert_eq!(pending[0].consumer, "engine-b");
    assert_eq!(pending[0].delivery_count, 2);
}

#[tokio::test]
async fn ack_removes_from_pending_and_stream() {
    let clock = FakeClock::default();
    let streams = FakeStreams::new(clock.clone());
    let stage = Stage::merge();
    streams.append(&stage, &message("t-1", &clock)).await.unwrap();
    let item = streams
        .read_new(&stage, "engine-a", std::time::Duration::ZERO)
        .await
        .unwrap()
        .unwrap();

    streams.ack(&stage, &item.entry_id).await.unwrap();
    assert!(streams.pending(&stage).await.unwrap().is_empty());
    assert!(streams.is_empty(&stage));
}

#[tokio::test]
async fn remove_unclaimed_leaves_delivered_entries() {
    let clock = FakeClock::default();
    let streams = FakeStreams::new(clock.clone());
    let stage = Stage::transcribe();
    streams.append(&stage, &message("t-1", &clock)).await.unwrap();
    streams.append(&stage, &message("t-2", &clock)).await.unwrap();

    // t-1 is delivered; t-2 never claimed.
    streams
        .read_new(&stage, "engine-a", std::time::Duration::ZERO)
        .await
        .unwrap()
        .unwrap();

    let removed = streams
        .remove_unclaimed(&stage, &TaskId::new("t-1"))
        .await
        .unwrap();
    assert_eq!(removed, 0, "delivered entries are not removable");

    let removed = streams
        .remove_unclaimed(&stage, &TaskId::new("t-2"))
        .await
        .unwrap();
    assert_eq!(removed, 1);
    assert_eq!(streams.len(&stage), 1);
}

#[tokio::test]
async fn discover_stages_lists_created_streams() {
    let clock = FakeClock::default();
    let streams = FakeStreams::new(clock.clone());
    streams
        .append(&Stage::prepare(), &message("t-1", &clock))
        .await
        .unwrap();
    streams
        .append(&Stage::merge(), &message("t-2", &clock))
        .await
        .unwrap();

    let stages = streams.discover_stages().await.unwrap();
    assert_eq!(stages, vec![Stage::merge(), Stage::prepare()]);
}

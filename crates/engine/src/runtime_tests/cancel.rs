// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tests for job cancellation: the CANCELLED transition and unclaimed
//! stream-entry removal.

use super::*;
use dalston_adapters::WorkStreams;
use dalston_core::{JobStatus, TaskStatus};
use std::time::Duration;

#[tokio::test]
async fn cancel_running_job_drops_unclaimed_entries() {
    let ctx = setup();
    ctx.register_core_engines();
    ctx.submit("job-1", JobParams::new("en")).await;
    assert_eq!(ctx.stream_len("prepare"), 1);

    let cancelled = ctx.runtime.cancel_job(&JobId::new("job-1")).await.unwrap();
    assert!(cancelled);

    let job = ctx.store.job(&JobId::new("job-1")).unwrap();
    assert_eq!(job.status, JobStatus::Cancelled);
    // The queued prepare message was never delivered, so it is removed.
    assert_eq!(ctx.stream_len("prepare"), 0);
}

#[tokio::test]
async fn cancel_leaves_in_flight_entries_alone() {
    let ctx = setup();
    ctx.register_core_engines();
    ctx.submit("job-1", JobParams::new("en")).await;

    // An engine has already picked up prepare.
    ctx.streams
        .read_new(&Stage::prepare(), "prep", Duration::ZERO)
        .await
        .unwrap()
        .unwrap();

    ctx.runtime.cancel_job(&JobId::new("job-1")).await.unwrap();

    // The delivered entry stays; the runner observes CANCELLED at
    // completion time and acknowledges silently.
    assert_eq!(ctx.stream_len("prepare"), 1);
}

#[tokio::test]
async fn cancel_is_idempotent_and_loses_to_terminal_states() {
    let ctx = setup();
    ctx.register_core_engines();
    ctx.submit("job-1", JobParams::new("en")).await;

    assert!(ctx.runtime.cancel_job(&JobId::new("job-1")).await.unwrap());
    assert!(!ctx.runtime.cancel_job(&JobId::new("job-1")).await.unwrap());
}

#[tokio::test]
async fn events_after_cancellation_do_not_revive_the_job() {
    let ctx = setup();
    ctx.register_core_engines();
    ctx.submit("job-1", JobParams::new("en")).await;
    ctx.runtime.cancel_job(&JobId::new("job-1")).await.unwrap();

    // A straggler completion for prepare still lands on the task row,
    // but the job stays CANCELLED.
    ctx.complete_stage("job-1", "prepare").await;

    let job = ctx.store.job(&JobId::new("job-1")).unwrap();
    assert_eq!(job.status, JobStatus::Cancelled);
    assert_eq!(ctx.task("job-1", "prepare").status, TaskStatus::Completed);
    assert!(ctx.bus.published_of_kind("job.completed").is_empty());
}

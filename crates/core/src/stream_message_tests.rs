// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_support::test_epoch;
use chrono::Duration;

fn sample() -> StreamMessage {
    StreamMessage {
        task_id: TaskId::new("t-1"),
        job_id: JobId::new("job-1"),
        enqueued_at: test_epoch(),
        timeout_at: test_epoch() + Duration::minutes(30),
    }
}

#[test]
fn fields_roundtrip() {
    let msg = sample();
    let fields = msg.to_fields();
    let borrowed: Vec<(&str, &str)> = fields
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();
    let back = StreamMessage::from_fields(borrowed).unwrap();
    assert_eq!(back, msg);
}

#[test]
fn timestamps_travel_as_rfc3339() {
    let fields = sample().to_fields();
    let enqueued = fields.iter().find(|(k, _)| k == "enqueued_at").unwrap();
    assert!(enqueued.1.contains('T'), "{}", enqueued.1);
}

#[test]
fn missing_field_is_rejected() {
    let fields = vec![("task_id", "t-1"), ("job_id", "job-1")];
    assert!(StreamMessage::from_fields(fields).is_none());
}

#[test]
fn malformed_timestamp_is_rejected() {
    let fields = vec![
        ("task_id", "t-1"),
        ("job_id", "job-1"),
        ("enqueued_at", "yesterday"),
        ("timeout_at", "2026-01-01T00:00:00Z"),
    ];
    assert!(StreamMessage::from_fields(fields).is_none());
}

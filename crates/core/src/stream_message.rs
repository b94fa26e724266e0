// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire shape of a queued-work stream entry.

use crate::id::{JobId, TaskId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One message per queued task on a per-stage work stream.
///
/// Timestamps travel as ISO-8601 strings; the stream itself tracks the
/// per-consumer pending list with idle time and delivery count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamMessage {
    pub task_id: TaskId,
    pub job_id: JobId,
    pub enqueued_at: DateTime<Utc>,
    /// Absolute deadline; the scanner fails the task past this point even
    /// if its engine keeps heartbeating.
    pub timeout_at: DateTime<Utc>,
}

impl StreamMessage {
    /// Flatten to field pairs for stream appends.
    pub fn to_fields(&self) -> Vec<(String, String)> {
        vec![
            ("task_id".to_string(), self.task_id.to_string()),
            ("job_id".to_string(), self.job_id.to_string()),
            ("enqueued_at".to_string(), self.enqueued_at.to_rfc3339()),
            ("timeout_at".to_string(), self.timeout_at.to_rfc3339()),
        ]
    }

    /// Parse from stream field pairs. Returns `None` on a malformed entry.
    pub fn from_fields<'a, I>(fields: I) -> Option<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut task_id = None;
        let mut job_id = None;
        let mut enqueued_at = None;
        let mut timeout_at = None;
        for (key, value) in fields {
            match key {
                "task_id" => task_id = Some(TaskId::new(value)),
                "job_id" => job_id = Some(JobId::new(value)),
                "enqueued_at" => {
                    enqueued_at = DateTime::parse_from_rfc3339(value)
                        .ok()
                        .map(|t| t.with_timezone(&Utc));
                }
                "timeout_at" => {
                    timeout_at = DateTime::parse_from_rfc3339(value)
                        .ok()
                        .map(|t| t.with_timezone(&Utc));
                }
                _ => {}
            }
        }
        Some(Self {
            task_id: task_id?,
            job_id: job_id?,
            enqueued_at: enqueued_at?,
            timeout_at: timeout_at?,
        })
    }
}

#[cfg(test)]
#[path = "stream_message_tests.rs"]
mod tests;

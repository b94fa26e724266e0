// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pipeline stage names.
//!
//! Stages are string-keyed: the fixed core set plus per-channel variants
//! (`transcribe_ch0`) and the optional enrichment stages. A channel suffix
//! is embedded in the name so the `(job_id, stage)` unique index holds for
//! per-channel DAGs.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Enrichment stages that never fail the job on their own.
const ENRICHMENT_STAGES: &[&str] = &[
    "detect_emotions",
    "detect_events",
    "refine",
    "pii_detect",
    "audio_redact",
];

/// A named step in the transcription pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Stage(String);

impl Stage {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn prepare() -> Self {
        Self::new("prepare")
    }

    pub fn transcribe() -> Self {
        Self::new("transcribe")
    }

    pub fn align() -> Self {
        Self::new("align")
    }

    pub fn diarize() -> Self {
        Self::new("diarize")
    }

    pub fn merge() -> Self {
        Self::new("merge")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Per-channel variant of this stage (`transcribe` → `transcribe_ch1`).
    pub fn with_channel(&self, channel: u8) -> Self {
        Self(format!("{}_ch{}", self.0, channel))
    }

    /// Stage name with any `_chK` suffix stripped.
    ///
    /// Capability matching is always against the base name; engines know
    /// nothing about channel splitting.
    pub fn base(&self) -> &str {
        match self.0.rfind("_ch") {
            Some(idx) if self.0[idx + 3..].chars().all(|c| c.is_ascii_digit())
                && idx + 3 < self.0.len() =>
            {
                &self.0[..idx]
            }
            _ => &self.0,
        }
    }

    /// Channel index if this is a per-channel variant.
    pub fn channel(&self) -> Option<u8> {
        let idx = self.0.rfind("_ch")?;
        self.0[idx + 3..].parse().ok()
    }

    /// True for optional enrichment stages (`required=false` in the DAG).
    pub fn is_enrichment(&self) -> bool {
        ENRICHMENT_STAGES.contains(&self.base())
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for Stage {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Stage {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl PartialEq<str> for Stage {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for Stage {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

#[cfg(test)]
#[path = "stage_tests.rs"]
mod tests;

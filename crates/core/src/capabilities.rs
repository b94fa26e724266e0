// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine capability documents and selection requirements.
//!
//! The same document shape is heartbeated into the registry by live engines
//! and aggregated into the catalog at build time. Selection is a structural
//! query over this set, not a type hierarchy.

use crate::id::EngineId;
use crate::stage::Stage;
use serde::{Deserialize, Serialize};

/// Optional resource hints published alongside capabilities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ResourceHints {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gpu_memory_mb: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_cores: Option<f64>,
}

/// What an engine can currently do.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineCapabilities {
    pub engine_id: EngineId,
    pub stages: Vec<Stage>,
    /// Languages served. Empty means "all languages".
    #[serde(default)]
    pub languages: Vec<String>,
    #[serde(default)]
    pub word_timestamps: bool,
    #[serde(default)]
    pub includes_diarization: bool,
    #[serde(default)]
    pub streaming: bool,
    /// GPU real-time factor: processing seconds per audio second.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rtf_gpu: Option<f64>,
    /// Model id to stamp into task configs when this engine is a
    /// multi-variant runtime.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,
    /// Model currently loaded by the live engine, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loaded_model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourceHints>,
}

impl EngineCapabilities {
    /// Whether this engine serves `stage`. Per-channel variants match on
    /// the base name; engines know nothing about channel splitting.
    pub fn serves_stage(&self, stage: &Stage) -> bool {
        let base = stage.base();
        self.stages.iter().any(|s| s.as_str() == base)
    }

    /// Empty language list means "all languages".
    pub fn supports_language(&self, language: &str) -> bool {
        self.languages.is_empty() || self.languages.iter().any(|l| l == language)
    }

    /// Hard-requirement check. Returns a per-engine mismatch explanation on
    /// rejection, `None` when the engine qualifies.
    pub fn mismatch_reason(&self, requirements: &Requirements) -> Option<String> {
        if let Some(language) = &requirements.language {
            if !self.supports_language(language) {
                return Some(format!(
                    "language '{}' not supported (has: {:?})",
                    language, self.languages
                ));
            }
        }
        if requirements.streaming && !self.streaming {
            return Some("streaming not supported".to_string());
        }
        None
    }
}

/// Hard requirements a stage's engine must satisfy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Requirements {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default)]
    pub streaming: bool,
}

impl Requirements {
    pub fn language(language: impl Into<String>) -> Self {
        Self {
            language: Some(language.into()),
            streaming: false,
        }
    }
}

#[cfg(test)]
#[path = "capabilities_tests.rs"]
mod tests;

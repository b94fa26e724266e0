// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-engine metadata documents.
//!
//! Every engine container bakes in one YAML file describing what the engine
//! can do. The Engine Runner publishes it via heartbeat; the catalog
//! generator aggregates all of them into the catalog file at build time.

use crate::error::CatalogError;
use dalston_core::{EngineCapabilities, EngineId, ResourceHints, Stage};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Metadata schema version this build understands.
pub const SCHEMA_VERSION: u32 = 1;

/// Capability block of an engine metadata file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct MetadataCapabilities {
    /// Languages served. Empty means "all languages".
    #[serde(default)]
    pub languages: Vec<String>,
    /// Longest clip the engine accepts, in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_audio_duration: Option<u64>,
    #[serde(default)]
    pub streaming: bool,
    #[serde(default)]
    pub word_timestamps: bool,
    #[serde(default)]
    pub includes_diarization: bool,
}

/// Hardware block: what the engine needs to run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Hardware {
    #[serde(default)]
    pub gpu: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gpu_memory_mb: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_cores: Option<f64>,
}

/// Performance block: throughput hints used for ranking and timeouts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Performance {
    /// GPU real-time factor: processing seconds per audio second.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rtf_gpu: Option<f64>,
}

/// One engine's metadata document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineMetadata {
    pub schema_version: u32,
    pub id: EngineId,
    pub stage: Stage,
    pub version: String,
    /// Deployable image reference.
    pub image: String,
    pub capabilities: MetadataCapabilities,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hardware: Option<Hardware>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub performance: Option<Performance>,
    /// Model id for multi-variant runtimes; stamped into task configs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,
}

impl EngineMetadata {
    /// Load and validate a metadata file. A failure here fails process
    /// start; a half-described engine must never enter selection.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let location = path.display().to_string();
        let raw = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: location.clone(),
            source,
        })?;
        let metadata: Self =
            serde_yaml::from_str(&raw).map_err(|source| CatalogError::Yaml {
                path: location.clone(),
                source,
            })?;
        metadata.validate(&location)?;
        Ok(metadata)
    }

    /// Schema checks beyond what serde enforces.
    pub fn validate(&self, location: &str) -> Result<(), CatalogError> {
        if self.schema_version != SCHEMA_VERSION {
            return Err(CatalogError::schema(
                location,
                format!(
                    "unsupported schema_version {} (expected {})",
                    self.schema_version, SCHEMA_VERSION
                ),
            ));
        }
        if self.id.as_str().is_empty() {
            return Err(CatalogError::schema(location, "id must not be empty"));
        }
        if self.stage.as_str().is_empty() {
            return Err(CatalogError::schema(location, "stage must not be empty"));
        }
        if self.stage.channel().is_some() {
            return Err(CatalogError::schema(
                location,
                format!(
                    "stage '{}' must be a base stage, not a channel variant",
                    self.stage
                ),
            ));
        }
        if self.version.is_empty() {
            return Err(CatalogError::schema(location, "version must not be empty"));
        }
        if self.image.is_empty() {
            return Err(CatalogError::schema(location, "image must not be empty"));
        }
        if let Some(performance) = &self.performance {
            if let Some(rtf) = performance.rtf_gpu {
                if !(rtf > 0.0) {
                    return Err(CatalogError::schema(
                        location,
                        format!("performance.rtf_gpu must be positive (got {rtf})"),
                    ));
                }
            }
        }
        Ok(())
    }

    /// The capabilities document this engine heartbeats and the catalog
    /// aggregates.
    pub fn to_capabilities(&self) -> EngineCapabilities {
        let resources = self.hardware.as_ref().map(|h| ResourceHints {
            gpu_memory_mb: h.gpu_memory_mb,
            cpu_cores: h.cpu_cores,
        });
        EngineCapabilities {
            engine_id: self.id.clone(),
            stages: vec![self.stage.clone()],
            languages: self.capabilities.languages.clone(),
            word_timestamps: self.capabilities.word_timestamps,
            includes_diarization: self.capabilities.includes_diarization,
            streaming: self.capabilities.streaming,
            rtf_gpu: self.performance.as_ref().and_then(|p| p.rtf_gpu),
            model_id: self.model_id.clone(),
            loaded_model: None,
            resources,
        }
    }
}

#[cfg(test)]
#[path = "metadata_tests.rs"]
mod tests;

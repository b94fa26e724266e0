// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The static engine catalog.

use crate::error::CatalogError;
use crate::metadata::SCHEMA_VERSION;
use dalston_core::{EngineCapabilities, EngineId, Requirements, Stage};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// One deployable engine as the catalog describes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub capabilities: EngineCapabilities,
    /// Deployable image reference, surfaced in selector suggestions.
    pub image: String,
    pub version: String,
}

impl CatalogEntry {
    pub fn engine_id(&self) -> &EngineId {
        &self.capabilities.engine_id
    }
}

/// On-disk shape of the generated catalog document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogFile {
    pub schema_version: u32,
    pub engines: Vec<CatalogEntry>,
}

impl CatalogFile {
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Immutable at-startup view of every engine that could be started.
///
/// Loaded once from the generated JSON file; reload requires process
/// restart.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: BTreeMap<EngineId, CatalogEntry>,
}

impl Catalog {
    /// Load the generated catalog file. A malformed document fails the
    /// process (`schema_violation`).
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let location = path.display().to_string();
        let raw = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: location.clone(),
            source,
        })?;
        let file: CatalogFile =
            serde_json::from_str(&raw).map_err(|source| CatalogError::Json {
                path: location.clone(),
                source,
            })?;
        let catalog = Self::from_file(file, &location)?;
        tracing::info!(engines = catalog.len(), path = %location, "catalog loaded");
        Ok(catalog)
    }

    /// Build from an already-parsed document, validating as `load` does.
    pub fn from_file(file: CatalogFile, location: &str) -> Result<Self, CatalogError> {
        if file.schema_version != SCHEMA_VERSION {
            return Err(CatalogError::schema(
                location,
                format!(
                    "unsupported schema_version {} (expected {})",
                    file.schema_version, SCHEMA_VERSION
                ),
            ));
        }
        let mut entries = BTreeMap::new();
        for entry in file.engines {
            let id = entry.engine_id().clone();
            if id.as_str().is_empty() {
                return Err(CatalogError::schema(location, "engine id must not be empty"));
            }
            if entry.image.is_empty() {
                return Err(CatalogError::schema(
                    location,
                    format!("engine '{id}' has an empty image reference"),
                ));
            }
            if entries.insert(id.clone(), entry).is_some() {
                return Err(CatalogError::DuplicateEngine { id: id.to_string() });
            }
        }
        Ok(Self { entries })
    }

    /// Build directly from entries (tests and the generator).
    pub fn from_entries(entries: impl IntoIterator<Item = CatalogEntry>) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(|e| (e.engine_id().clone(), e))
                .collect(),
        }
    }

    pub fn get(&self, id: &EngineId) -> Option<&CatalogEntry> {
        self.entries.get(id)
    }

    /// All entries whose capabilities include `stage`.
    pub fn get_engines_for_stage(&self, stage: &Stage) -> Vec<&CatalogEntry> {
        self.entries
            .values()
            .filter(|e| e.capabilities.serves_stage(stage))
            .collect()
    }

    /// Entries for `stage` that also satisfy the hard requirements. These
    /// are the "could start" suggestions in selection errors.
    pub fn find_engines(&self, stage: &Stage, requirements: &Requirements) -> Vec<&CatalogEntry> {
        self.entries
            .values()
            .filter(|e| {
                e.capabilities.serves_stage(stage)
                    && e.capabilities.mismatch_reason(requirements).is_none()
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
#[path = "catalog_tests.rs"]
mod tests;

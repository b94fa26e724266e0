// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Catalog generation: walk engine metadata files, aggregate into the
//! catalog document. Runs at build time; the orchestrator only ever loads
//! the result.

use crate::catalog::{CatalogEntry, CatalogFile};
use crate::error::CatalogError;
use crate::metadata::{EngineMetadata, SCHEMA_VERSION};
use std::collections::BTreeSet;
use std::path::Path;

/// Aggregate every `*.yaml`/`*.yml` metadata file under `metadata_dir`
/// into a catalog document, sorted by engine id.
pub fn generate(metadata_dir: &Path) -> Result<CatalogFile, CatalogError> {
    let location = metadata_dir.display().to_string();
    let dir = std::fs::read_dir(metadata_dir).map_err(|source| CatalogError::Io {
        path: location.clone(),
        source,
    })?;

    let mut paths = Vec::new();
    for entry in dir {
        let entry = entry.map_err(|source| CatalogError::Io {
            path: location.clone(),
            source,
        })?;
        let path = entry.path();
        let is_yaml = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e == "yaml" || e == "yml");
        if is_yaml {
            paths.push(path);
        }
    }
    // Deterministic output regardless of directory iteration order.
    paths.sort();

    let mut seen = BTreeSet::new();
    let mut engines = Vec::new();
    for path in paths {
        let metadata = EngineMetadata::load(&path)?;
        if !seen.insert(metadata.id.clone()) {
            return Err(CatalogError::DuplicateEngine {
                id: metadata.id.to_string(),
            });
        }
        tracing::debug!(engine = %metadata.id, path = %path.display(), "aggregated engine metadata");
        engines.push(CatalogEntry {
            capabilities: metadata.to_capabilities(),
            image: metadata.image.clone(),
            version: metadata.version.clone(),
        });
    }
    engines.sort_by(|a, b| a.engine_id().cmp(b.engine_id()));

    Ok(CatalogFile {
        schema_version: SCHEMA_VERSION,
        engines,
    })
}

#[cfg(test)]
#[path = "generate_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for catalog and metadata loading

use thiserror::Error;

/// Errors from loading or generating catalog documents.
///
/// All of these are startup-time failures: a malformed document fails the
/// process rather than degrading selection silently.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid YAML in {path}: {source}")]
    Yaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("schema violation in {location}: {message}")]
    Schema { location: String, message: String },
    #[error("duplicate engine id '{id}'")]
    DuplicateEngine { id: String },
}

impl CatalogError {
    pub(crate) fn schema(location: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Schema {
            location: location.into(),
            message: message.into(),
        }
    }
}

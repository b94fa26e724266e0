// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use dalston_core::test_support::{caps, transcriber};
use std::io::Write;

fn entry(capabilities: EngineCapabilities) -> CatalogEntry {
    let image = format!(
        "registry.dalston.io/engines/{}:1.0",
        capabilities.engine_id
    );
    CatalogEntry {
        capabilities,
        image,
        version: "1.0".to_string(),
    }
}

fn sample_catalog() -> Catalog {
    Catalog::from_entries([
        entry(caps("whisper-large", "transcribe")),
        entry(transcriber("parakeet-en", &["en"])),
        entry(caps("wav2vec-align", "align")),
    ])
}

#[test]
fn get_engines_for_stage_filters() {
    let catalog = sample_catalog();
    let transcribers = catalog.get_engines_for_stage(&Stage::transcribe());
    assert_eq!(transcribers.len(), 2);
    assert_eq!(catalog.get_engines_for_stage(&Stage::align()).len(), 1);
    assert!(catalog.get_engines_for_stage(&Stage::diarize()).is_empty());
}

#[test]
fn find_engines_applies_hard_requirements() {
    let catalog = sample_catalog();
    let found = catalog.find_engines(&Stage::transcribe(), &Requirements::language("hr"));
    // Only the all-languages engine survives.
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].engine_id(), &EngineId::new("whisper-large"));
}

#[test]
fn load_roundtrips_through_json() {
    let file = CatalogFile {
        schema_version: SCHEMA_VERSION,
        engines: vec![entry(caps("whisper-large", "transcribe"))],
    };
    let mut tmp = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
    tmp.write_all(file.to_json_pretty().unwrap().as_bytes()).unwrap();
    tmp.flush().unwrap();

    let catalog = Catalog::load(tmp.path()).unwrap();
    assert_eq!(catalog.len(), 1);
    assert!(catalog.get(&EngineId::new("whisper-large")).is_some());
}

#[test]
fn wrong_schema_version_fails_load() {
    let file = CatalogFile {
        schema_version: 99,
        engines: vec![],
    };
    let err = Catalog::from_file(file, "catalog.json").unwrap_err();
    assert!(matches!(err, CatalogError::Schema { .. }), "{err}");
}

#[test]
fn duplicate_engine_id_fails_load() {
    let file = CatalogFile {
        schema_version: SCHEMA_VERSION,
        engines: vec![
            entry(caps("whisper-large", "transcribe")),
            entry(caps("whisper-large", "transcribe")),
        ],
    };
    let err = Catalog::from_file(file, "catalog.json").unwrap_err();
    assert!(matches!(err, CatalogError::DuplicateEngine { .. }), "{err}");
}

#[test]
fn empty_image_fails_load() {
    let mut e = entry(caps("whisper-large", "transcribe"));
    e.image = String::new();
    let file = CatalogFile {
        schema_version: SCHEMA_VERSION,
        engines: vec![e],
    };
    let err = Catalog::from_file(file, "catalog.json").unwrap_err();
    assert!(err.to_string().contains("image"), "{err}");
}

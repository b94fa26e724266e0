//! S3: submission in a language nothing live can serve fails the job
//! synchronously with the structured selector error and a catalog
//! suggestion.

use crate::prelude::*;
use dalston_catalog::{Catalog, CatalogEntry};
use dalston_core::{ErrorCategory, JobParams, JobStatus, Knobs};

fn catalog_with_whisper() -> Catalog {
    Catalog::from_entries([CatalogEntry {
        capabilities: transcriber("whisper-large", &[], true),
        image: "registry.dalston.io/engines/whisper-large:1.2".to_string(),
        version: "1.2".to_string(),
    }])
}

#[tokio::test]
async fn croatian_with_english_only_engine_fails_with_suggestion() {
    let mut world = World::new(catalog_with_whisper(), Knobs::default());
    world.start_engine(engine("prep", "prepare"), Script::Succeed);
    world.start_engine(transcriber("parakeet-en", &["en"], true), Script::Succeed);
    world.start_engine(engine("merger", "merge"), Script::Succeed);

    world.submit("job-1", JobParams::new("hr")).await;

    let job = world.job("job-1");
    assert_eq!(job.status, JobStatus::Failed);

    let error = job.error.unwrap();
    assert_eq!(error.code, ErrorCategory::NoCapableEngine);

    let detail = error.detail.unwrap();
    assert_eq!(detail["stage"], "transcribe");
    assert_eq!(detail["requirements"]["language"], "hr");
    // The live engine is listed with its rejection reason.
    assert_eq!(detail["running_engines"][0]["engine_id"], "parakeet-en");
    let reason = detail["running_engines"][0]["reason"].as_str().unwrap();
    assert!(reason.contains("language 'hr' not supported"), "{reason}");
    // The all-languages catalog engine is suggested, with its image.
    assert_eq!(
        detail["catalog_alternatives"][0]["engine_id"],
        "whisper-large"
    );
    assert_eq!(
        detail["catalog_alternatives"][0]["image"],
        "registry.dalston.io/engines/whisper-large:1.2"
    );

    // Nothing was ever queued.
    for stage in ["prepare", "transcribe", "merge"] {
        assert!(world.streams.is_empty(&dalston_core::Stage::new(stage)));
    }
    assert!(world.store.tasks_for_job(&dalston_core::JobId::new("job-1")).is_empty());
}

#[tokio::test]
async fn no_live_engines_at_all_still_fails_cleanly() {
    let mut world = World::new(catalog_with_whisper(), Knobs::default());

    world.submit("job-1", JobParams::new("en")).await;

    let job = world.job("job-1");
    assert_eq!(job.status, JobStatus::Failed);
    let detail = job.error.unwrap().detail.unwrap();
    assert!(detail["running_engines"].as_array().unwrap().is_empty());
    assert_eq!(
        detail["catalog_alternatives"][0]["engine_id"],
        "whisper-large"
    );
}

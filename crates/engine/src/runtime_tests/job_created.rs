// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tests for the `job.created` handler: claim, selection validation, DAG
//! persistence, root enqueue, and both duplicate-delivery guards.

use super::*;
use dalston_catalog::CatalogEntry;
use dalston_core::test_support::transcriber;
use dalston_core::{ErrorCategory, JobStatus, SpeakerDetection, TaskStatus};

#[tokio::test]
async fn happy_path_builds_dag_and_enqueues_prepare() {
    let ctx = setup();
    ctx.register_core_engines();

    ctx.submit("job-1", JobParams::new("en")).await;

    let job = ctx.store.job(&JobId::new("job-1")).unwrap();
    assert_eq!(job.status, JobStatus::Running);
    assert_eq!(ctx.stages("job-1"), ["merge", "prepare", "transcribe"]);

    // Only the root is READY and on its stream.
    assert_eq!(ctx.task("job-1", "prepare").status, TaskStatus::Ready);
    assert_eq!(ctx.task("job-1", "transcribe").status, TaskStatus::Pending);
    assert_eq!(ctx.stream_len("prepare"), 1);
    assert_eq!(ctx.stream_len("transcribe"), 0);
}

#[tokio::test]
async fn duplicate_event_is_dropped_by_job_claim() {
    let ctx = setup();
    ctx.register_core_engines();
    ctx.submit("job-1", JobParams::new("en")).await;

    // Same broadcast delivered again: the PENDING→RUNNING CAS loses.
    ctx.runtime
        .handle_event(dalston_core::test_support::job_created_event("job-1"))
        .await
        .unwrap();

    assert_eq!(ctx.stages("job-1").len(), 3);
    assert_eq!(ctx.stream_len("prepare"), 1);
}

#[tokio::test]
async fn racing_controller_is_dropped_by_unique_index() {
    let ctx = setup();
    ctx.register_core_engines();
    let job = ctx.submit("job-1", JobParams::new("en")).await;

    // Simulate a second controller that raced past the claim: reset the
    // job row to PENDING so the claim succeeds again, then re-handle.
    ctx.store.insert_job(&job).await.unwrap();
    ctx.runtime
        .handle_event(dalston_core::test_support::job_created_event("job-1"))
        .await
        .unwrap();

    // The task insert hit the (job_id, stage) unique index and the event
    // was dropped: one DAG, one enqueue.
    assert_eq!(ctx.stages("job-1").len(), 3);
    assert_eq!(ctx.stream_len("prepare"), 1);
}

#[tokio::test]
async fn no_capable_engine_fails_job_with_catalog_suggestion() {
    let all_langs = native_transcriber("whisper-large");
    let catalog = Catalog::from_entries([CatalogEntry {
        capabilities: all_langs,
        image: "registry.dalston.io/engines/whisper-large:1.2".to_string(),
        version: "1.2".to_string(),
    }]);
    let ctx = setup_with(Knobs::default(), catalog);
    // Only an English-only transcriber is live.
    ctx.registry.register(caps("prep", "prepare"));
    ctx.registry.register(transcriber("parakeet-en", &["en"]));
    ctx.registry.register(caps("merger", "merge"));

    ctx.submit("job-1", JobParams::new("hr")).await;

    let job = ctx.store.job(&JobId::new("job-1")).unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    let error = job.error.unwrap();
    assert_eq!(error.code, ErrorCategory::NoCapableEngine);

    let detail = error.detail.unwrap();
    assert_eq!(detail["stage"], "transcribe");
    assert_eq!(detail["running_engines"][0]["engine_id"], "parakeet-en");
    assert_eq!(
        detail["catalog_alternatives"][0]["engine_id"],
        "whisper-large"
    );
    assert_eq!(
        detail["catalog_alternatives"][0]["image"],
        "registry.dalston.io/engines/whisper-large:1.2"
    );

    // Nothing was queued, and observers heard about the failure.
    assert_eq!(ctx.stream_len("prepare"), 0);
    assert_eq!(ctx.bus.published_of_kind("job.failed").len(), 1);
}

#[tokio::test]
async fn align_added_when_transcriber_lacks_word_timestamps() {
    let ctx = setup();
    ctx.registry.register(caps("prep", "prepare"));
    ctx.registry.register(caps("whisper-large", "transcribe")); // no native timestamps
    ctx.registry.register(caps("aligner", "align"));
    ctx.registry.register(caps("merger", "merge"));

    let mut params = JobParams::new("en");
    params.word_timestamps = true;
    ctx.submit("job-1", params).await;

    assert_eq!(ctx.stages("job-1"), ["align", "merge", "prepare", "transcribe"]);
}

#[tokio::test]
async fn align_omitted_when_transcriber_is_native() {
    let ctx = setup();
    ctx.register_core_engines(); // native word timestamps

    let mut params = JobParams::new("en");
    params.word_timestamps = true;
    ctx.submit("job-1", params).await;

    assert_eq!(ctx.stages("job-1"), ["merge", "prepare", "transcribe"]);
}

#[tokio::test]
async fn diarize_omitted_when_transcriber_includes_it() {
    let ctx = setup();
    ctx.registry.register(caps("prep", "prepare"));
    let mut combined = native_transcriber("whisperx");
    combined.includes_diarization = true;
    ctx.registry.register(combined);
    ctx.registry.register(caps("merger", "merge"));

    let mut params = JobParams::new("en");
    params.speaker_detection = SpeakerDetection::Auto;
    ctx.submit("job-1", params).await;

    assert_eq!(ctx.stages("job-1"), ["merge", "prepare", "transcribe"]);
}

#[tokio::test]
async fn diarize_added_for_auto_speaker_detection() {
    let ctx = setup();
    ctx.register_core_engines();
    ctx.registry.register(caps("pyannote", "diarize"));

    let mut params = JobParams::new("en");
    params.speaker_detection = SpeakerDetection::Auto;
    ctx.submit("job-1", params).await;

    assert_eq!(ctx.stages("job-1"), ["diarize", "merge", "prepare", "transcribe"]);
}

#[tokio::test]
async fn per_channel_jobs_never_diarize() {
    let ctx = setup();
    ctx.register_core_engines();
    ctx.registry.register(caps("pyannote", "diarize"));

    let mut params = JobParams::new("en");
    params.speaker_detection = SpeakerDetection::PerChannel;
    params.channels = Some(2);
    ctx.submit("job-1", params).await;

    assert_eq!(
        ctx.stages("job-1"),
        ["merge", "prepare", "transcribe_ch0", "transcribe_ch1"]
    );
}

#[tokio::test]
async fn preferred_engine_is_honored() {
    let ctx = setup();
    ctx.register_core_engines();
    ctx.registry.register(transcriber("parakeet-en", &["en"]));

    let mut params = JobParams::new("en");
    params.engine = Some("parakeet-en".into());
    ctx.submit("job-1", params).await;

    assert_eq!(ctx.task("job-1", "transcribe").engine_id, "parakeet-en");
}

#[tokio::test]
async fn cancelled_job_is_not_claimed() {
    let ctx = setup();
    ctx.register_core_engines();
    let job = pending_job_with("job-1", JobParams::new("en"));
    ctx.store.insert_job(&job).await.unwrap();
    ctx.store
        .cancel_job(&JobId::new("job-1"), ctx.clock.now())
        .await
        .unwrap();

    ctx.runtime
        .handle_event(job_created_event("job-1"))
        .await
        .unwrap();

    assert!(ctx.store.tasks_for_job(&JobId::new("job-1")).is_empty());
    assert_eq!(
        ctx.store.job(&JobId::new("job-1")).unwrap().status,
        JobStatus::Cancelled
    );
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use dalston_core::test_support::{caps, transcriber};
use dalston_core::FakeClock;

#[tokio::test]
async fn heartbeat_then_get() {
    let registry = FakeRegistry::default();
    registry
        .heartbeat(&caps("whisper-large", "transcribe"), Duration::from_secs(30))
        .await
        .unwrap();

    let found = registry
        .get(&EngineId::new("whisper-large"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.engine_id, "whisper-large");
    assert!(registry
        .is_available(&EngineId::new("whisper-large"))
        .await
        .unwrap());
}

#[tokio::test]
async fn expiry_makes_engine_invisible() {
    let clock = FakeClock::default();
    let registry = FakeRegistry::new(clock.clone());
    registry
        .heartbeat(&caps("whisper-large", "transcribe"), Duration::from_secs(30))
        .await
        .unwrap();

    clock.advance(chrono::Duration::seconds(31));

    assert!(!registry
        .is_available(&EngineId::new("whisper-large"))
        .await
        .unwrap());
    assert!(registry
        .get(&EngineId::new("whisper-large"))
        .await
        .unwrap()
        .is_none());
    assert!(registry
        .get_engines_for_stage(&Stage::transcribe())
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn renewed_heartbeat_extends_ttl() {
    let clock = FakeClock::default();
    let registry = FakeRegistry::new(clock.clone());
    let engine = caps("whisper-large", "transcribe");
    registry
        .heartbeat(&engine, Duration::from_secs(30))
        .await
        .unwrap();

    clock.advance(chrono::Duration::seconds(20));
    registry
        .heartbeat(&engine, Duration::from_secs(30))
        .await
        .unwrap();
    clock.advance(chrono::Duration::seconds(20));

    assert!(registry
        .is_available(&EngineId::new("whisper-large"))
        .await
        .unwrap());
}

#[tokio::test]
async fn stage_enumeration_filters() {
    let registry = FakeRegistry::default();
    registry.register(caps("whisper-large", "transcribe"));
    registry.register(transcriber("parakeet-en", &["en"]));
    registry.register(caps("pyannote", "diarize"));

    let transcribers = registry
        .get_engines_for_stage(&Stage::transcribe())
        .await
        .unwrap();
    assert_eq!(transcribers.len(), 2);

    // Channel variants match the base stage.
    let for_channel = registry
        .get_engines_for_stage(&Stage::transcribe().with_channel(0))
        .await
        .unwrap();
    assert_eq!(for_channel.len(), 2);
}

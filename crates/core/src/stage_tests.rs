// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[test]
fn core_stage_constructors() {
    assert_eq!(Stage::prepare(), "prepare");
    assert_eq!(Stage::transcribe(), "transcribe");
    assert_eq!(Stage::align(), "align");
    assert_eq!(Stage::diarize(), "diarize");
    assert_eq!(Stage::merge(), "merge");
}

#[test]
fn with_channel_appends_suffix() {
    assert_eq!(Stage::transcribe().with_channel(0), "transcribe_ch0");
    assert_eq!(Stage::align().with_channel(1), "align_ch1");
}

#[parameterized(
    plain = { "transcribe", "transcribe", None },
    channel_zero = { "transcribe_ch0", "transcribe", Some(0) },
    channel_nine = { "align_ch9", "align", Some(9) },
    underscore_name = { "detect_emotions", "detect_emotions", None },
    trailing_ch_no_digit = { "transcribe_ch", "transcribe_ch", None },
    ch_in_middle = { "foo_ch1_bar", "foo_ch1_bar", None },
)]
fn base_and_channel(name: &str, base: &str, channel: Option<u8>) {
    let stage = Stage::new(name);
    assert_eq!(stage.base(), base);
    assert_eq!(stage.channel(), channel);
}

#[parameterized(
    emotions = { "detect_emotions", true },
    events = { "detect_events", true },
    refine = { "refine", true },
    pii = { "pii_detect", true },
    redact = { "audio_redact", true },
    transcribe = { "transcribe", false },
    merge = { "merge", false },
)]
fn enrichment_classification(name: &str, expected: bool) {
    assert_eq!(Stage::new(name).is_enrichment(), expected);
}

#[test]
fn serde_is_transparent() {
    let stage = Stage::transcribe().with_channel(1);
    let json = serde_json::to_string(&stage).unwrap();
    assert_eq!(json, "\"transcribe_ch1\"");
    let back: Stage = serde_json::from_str(&json).unwrap();
    assert_eq!(back, stage);
}

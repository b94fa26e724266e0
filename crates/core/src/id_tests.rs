// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::borrow::Borrow;
use std::collections::HashMap;

// --- define_id! macro tests ---

#[test]
fn define_id_new_and_as_str() {
    let id = JobId::new("abc");
    assert_eq!(id.as_str(), "abc");
}

#[test]
fn define_id_display() {
    let id = TaskId::new("hello");
    assert_eq!(format!("{}", id), "hello");
    assert_eq!(id.to_string(), "hello");
}

#[test]
fn define_id_from_string() {
    let id: EngineId = String::from("owned").into();
    assert_eq!(id.as_str(), "owned");
}

#[test]
fn define_id_from_str() {
    let id: JobId = "borrowed".into();
    assert_eq!(id.as_str(), "borrowed");
}

#[test]
fn define_id_partial_eq_str() {
    let id = EngineId::new("whisper-large");
    assert_eq!(id, *"whisper-large");
    assert_eq!(id, "whisper-large");
}

#[test]
fn define_id_borrow_str() {
    let id = TaskId::new("key");
    let borrowed: &str = id.borrow();
    assert_eq!(borrowed, "key");
}

#[test]
fn define_id_hash_map_lookup() {
    let mut map = HashMap::new();
    map.insert(TaskId::new("k"), 42);
    assert_eq!(map.get("k"), Some(&42));
}

#[test]
fn define_id_serde_roundtrip() {
    let id = JobId::new("serde-test");
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, "\"serde-test\"");
    let deserialized: JobId = serde_json::from_str(&json).unwrap();
    assert_eq!(deserialized, id);
}

#[test]
fn engine_id_orders_lexicographically() {
    // Selection tie-breaks on engine id, so ordering must be stable.
    let mut ids = vec![
        EngineId::new("whisper-small"),
        EngineId::new("parakeet"),
        EngineId::new("whisper-large"),
    ];
    ids.sort();
    assert_eq!(
        ids,
        vec![
            EngineId::new("parakeet"),
            EngineId::new("whisper-large"),
            EngineId::new("whisper-small"),
        ]
    );
}

// --- short() tests ---

#[test]
fn define_id_short_truncates() {
    let id = JobId::new("abcdefghijklmnop");
    assert_eq!(id.short(8), "abcdefgh");
}

#[test]
fn define_id_short_returns_full_when_shorter() {
    let id = JobId::new("abc");
    assert_eq!(id.short(8), "abc");
}

#[test]
fn short_id_trait_on_str() {
    use crate::id::ShortId;
    let s = "abcdefghijklmnop";
    assert_eq!(s.short(8), "abcdefgh");
    assert_eq!(s.short(100), s);
    assert_eq!("abc".short(8), "abc");
}

// --- IdGen tests ---

#[test]
fn uuid_gen_creates_unique_ids() {
    let id_gen = UuidIdGen;
    let id1 = id_gen.next();
    let id2 = id_gen.next();
    assert_ne!(id1, id2);
    assert_eq!(id1.len(), 36); // UUID format
}

#[test]
fn sequential_gen_creates_predictable_ids() {
    let id_gen = SequentialIdGen::new("test");
    assert_eq!(id_gen.next(), "test-1");
    assert_eq!(id_gen.next(), "test-2");
    assert_eq!(id_gen.next(), "test-3");
}

#[test]
fn sequential_gen_is_cloneable_and_shared() {
    let id_gen1 = SequentialIdGen::new("shared");
    let id_gen2 = id_gen1.clone();
    assert_eq!(id_gen1.next(), "shared-1");
    assert_eq!(id_gen2.next(), "shared-2");
    assert_eq!(id_gen1.next(), "shared-3");
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use dalston_core::FakeClock;

const TTL: Duration = Duration::from_secs(30);

#[tokio::test]
async fn only_one_contender_holds_the_lease() {
    let clock = FakeClock::default();
    let a = FakeLease::new(clock.clone(), "ctrl-a");
    let b = a.contender("ctrl-b");

    assert!(a.acquire(TTL).await.unwrap());
    assert!(!b.acquire(TTL).await.unwrap());
    assert_eq!(a.holder().as_deref(), Some("ctrl-a"));
}

#[tokio::test]
async fn holder_renews_its_own_lease() {
    let clock = FakeClock::default();
    let a = FakeLease::new(clock.clone(), "ctrl-a");

    assert!(a.acquire(TTL).await.unwrap());
    clock.advance(chrono::Duration::seconds(20));
    // Renewal extends from now, not from the original acquisition.
    assert!(a.acquire(TTL).await.unwrap());
    clock.advance(chrono::Duration::seconds(20));
    assert_eq!(a.holder().as_deref(), Some("ctrl-a"));
}

#[tokio::test]
async fn expired_lease_fails_over() {
    let clock = FakeClock::default();
    let a = FakeLease::new(clock.clone(), "ctrl-a");
    let b = a.contender("ctrl-b");

    assert!(a.acquire(TTL).await.unwrap());
    clock.advance(chrono::Duration::seconds(31));

    assert!(b.acquire(TTL).await.unwrap());
    assert_eq!(a.holder().as_deref(), Some("ctrl-b"));
    // The old leader cannot renew a lease it lost.
    assert!(!a.acquire(TTL).await.unwrap());
}

#[tokio::test]
async fn release_only_affects_own_lease() {
    let clock = FakeClock::default();
    let a = FakeLease::new(clock.clone(), "ctrl-a");
    let b = a.contender("ctrl-b");

    assert!(a.acquire(TTL).await.unwrap());
    b.release().await.unwrap();
    assert_eq!(a.holder().as_deref(), Some("ctrl-a"));

    a.release().await.unwrap();
    assert!(a.holder().is_none());
    assert!(b.acquire(TTL).await.unwrap());
}

//! Architectural Contract Test: Lock Gate
//!
//! This test verifies mutual exclusion between synchronization runs.
//!
//! Constraints verified:
//! - A second pull for the same account fails immediately, without retry
//! - Locks are released after success and after failure
//! - Bidirectional, pull and push hold distinct keys and can nest
//! - The shared keyspace makes pull and push exclude each other
//! - File-backed locks exclude across independent store instances
//!
//! If this test fails, two runs can write the same mirror concurrently.

mod common;

use common::*;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use zonesync_core::config::{LockConfig, LockKeyspace};
use zonesync_core::sync::SyncOperation;
use zonesync_core::traits::{LockStore, PullSynchronizer, PushSynchronizer};
use zonesync_core::{Error, FileLockStore, LockGate, MemoryLockStore, PullReconciler};

#[tokio::test]
async fn concurrent_pull_fails_with_lock_error() {
    let client = StubRemoteClient::new()
        .with_zone(
            "Z1",
            "example.com.",
            vec![remote_record("www.example.com.", "A")],
        )
        .with_delay(Duration::from_millis(300));
    let harness = Harness::new(client);
    let pull = harness.pull();

    let first = pull.pull_from_remote(&harness.account, None, false);
    let second = async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        pull.pull_from_remote(&harness.account, None, false).await
    };
    let (first, second) = tokio::join!(first, second);

    assert_eq!(first.unwrap().records, 1);
    let err = second.unwrap_err();
    assert!(matches!(err, Error::LockAcquisition(SyncOperation::Pull)));
    assert_eq!(err.to_string(), "Cannot acquire lock for pull synchronization");

    // Only the winner reached the provider
    assert_eq!(harness.client.list_zones_calls(), 1);
}

#[tokio::test]
async fn held_lock_blocks_without_touching_the_provider() {
    let harness = Harness::new(StubRemoteClient::new());
    let _held = harness
        .locks
        .acquire(SyncOperation::Pull, &harness.account, None)
        .await
        .unwrap();

    let err = harness
        .pull()
        .pull_from_remote(&harness.account, None, false)
        .await
        .unwrap_err();

    assert!(err.is_lock_contention());
    assert_eq!(harness.factory.created(), 0);
    assert_eq!(harness.client.list_zones_calls(), 0);
}

#[tokio::test]
async fn lock_is_released_after_each_run() {
    let harness = Harness::new(StubRemoteClient::new().with_zone("Z1", "example.com.", vec![]));
    let pull = harness.pull();

    for _ in 0..3 {
        tokio_test::assert_ok!(pull.pull_from_remote(&harness.account, None, false).await);
    }
    assert!(
        !harness
            .locks
            .is_locked(SyncOperation::Pull, &harness.account, None)
            .await
            .unwrap()
    );
}

#[tokio::test]
async fn zone_scoped_lock_is_distinct_from_account_lock() {
    let harness = Harness::new(StubRemoteClient::new().with_zone("Z1", "example.com.", vec![]));
    let zone = harness.seed_zone("Z1", "example.com.").await;
    let _held = harness
        .locks
        .acquire(SyncOperation::Pull, &harness.account, None)
        .await
        .unwrap();

    let report = harness
        .pull()
        .pull_from_remote(&harness.account, Some(&zone), false)
        .await
        .unwrap();
    assert_eq!(report.zones, 1);
}

#[tokio::test]
async fn pull_and_push_run_side_by_side_by_default() {
    let harness = Harness::new(StubRemoteClient::new());
    let _pull_held = harness
        .locks
        .acquire(SyncOperation::Pull, &harness.account, None)
        .await
        .unwrap();

    let report = harness
        .push()
        .push_to_remote(&harness.account, None, false)
        .await
        .unwrap();
    assert!(report.errors.is_empty());
}

#[tokio::test]
async fn shared_keyspace_serializes_pull_and_push() {
    let config = LockConfig {
        keyspace: LockKeyspace::Shared,
        ..LockConfig::default()
    };
    let locks = LockGate::new(Arc::new(MemoryLockStore::new()), config);
    let harness = Harness::new(StubRemoteClient::new());
    let _push_held = locks
        .acquire(SyncOperation::Push, &harness.account, None)
        .await
        .unwrap();

    let pull = PullReconciler::new(
        Arc::clone(&harness.clients),
        harness.store.clone(),
        locks.clone(),
    );
    let err = pull
        .pull_from_remote(&harness.account, None, false)
        .await
        .unwrap_err();

    // Contention is still reported against the operation that was refused
    assert!(matches!(err, Error::LockAcquisition(SyncOperation::Pull)));

    // Bidirectional keeps its own key
    assert!(
        locks
            .acquire(SyncOperation::Bidirectional, &harness.account, None)
            .await
            .is_ok()
    );
}

#[tokio::test]
async fn expired_lease_can_be_taken_over() {
    let store = MemoryLockStore::new();
    let stale = store
        .try_acquire("route53_pull_stale", Duration::ZERO)
        .await
        .unwrap()
        .expect("granted");

    let fresh = store
        .try_acquire("route53_pull_stale", Duration::from_secs(60))
        .await
        .unwrap()
        .expect("expired lease is reclaimable");
    assert_ne!(fresh.token, stale.token);

    // The stale holder cannot release the new owner's lease
    store.release(&stale).unwrap();
    assert!(store.is_locked("route53_pull_stale").await.unwrap());
}

#[tokio::test]
async fn file_locks_exclude_across_instances() {
    let dir = TempDir::new().unwrap();
    let first = FileLockStore::new(dir.path()).await.unwrap();
    let second = FileLockStore::new(dir.path()).await.unwrap();
    let key = "route53_pull_00000000-0000-0000-0000-000000000000";

    let lease = first
        .try_acquire(key, Duration::from_secs(60))
        .await
        .unwrap()
        .expect("first instance wins");
    assert!(
        second
            .try_acquire(key, Duration::from_secs(60))
            .await
            .unwrap()
            .is_none()
    );
    assert!(second.is_locked(key).await.unwrap());

    first.release(&lease).unwrap();
    assert!(
        second
            .try_acquire(key, Duration::from_secs(60))
            .await
            .unwrap()
            .is_some()
    );
}

#[tokio::test]
async fn file_backed_gate_guards_a_pull() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(FileLockStore::new(dir.path()).await.unwrap());
    let locks = LockGate::new(store.clone(), LockConfig::default());
    let harness = Harness::new(StubRemoteClient::new().with_zone("Z1", "example.com.", vec![]));

    let guard = locks
        .acquire(SyncOperation::Pull, &harness.account, None)
        .await
        .unwrap();
    let key = guard.key().to_string();
    assert!(store.is_locked(&key).await.unwrap());

    drop(guard);
    assert!(!store.is_locked(&key).await.unwrap());

    let pull = PullReconciler::new(Arc::clone(&harness.clients), harness.store.clone(), locks);
    assert_eq!(
        pull.pull_from_remote(&harness.account, None, false)
            .await
            .unwrap()
            .zones,
        1
    );
}

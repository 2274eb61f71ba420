//! Architectural Contract Test: Bidirectional Orchestration
//!
//! This test verifies how a bidirectional run drives pull and push.
//!
//! Constraints verified:
//! - An unsupported mode never reaches pull or push, and the lock is freed
//! - Each mode runs its preview step as a dry run
//! - `merge` only previews pull and push, then resolves conflicts
//! - Nested pull/push locks inside a bidirectional run do not collide
//!
//! If this test fails, a bidirectional run may mutate state it was only
//! meant to preview.

mod common;

use common::*;
use std::sync::Arc;
use zonesync_core::model::{RecordSet, SourceOfTruth};
use zonesync_core::sync::{ResolutionAction, SyncOperation};
use zonesync_core::traits::{PullSynchronizer, PushSynchronizer, RecordSetRepository, ZoneRepository};
use zonesync_core::{Error, Synchronizer};

struct Mocked {
    synchronizer: Synchronizer,
    pull: CountingPull,
    push: CountingPush,
    harness: Harness,
}

fn mocked(dry_run_push: bool) -> Mocked {
    let harness = Harness::new(StubRemoteClient::new());
    let pull = CountingPull::returning(sample_pull_report());
    let push = CountingPush::returning(sample_push_report(dry_run_push));
    let synchronizer = Synchronizer::from_parts(
        Arc::new(CountingPull::sharing_counters_with(&pull)),
        Arc::new(CountingPush::sharing_counters_with(&push)),
        harness.store.clone(),
        harness.locks.clone(),
    );
    Mocked {
        synchronizer,
        pull,
        push,
        harness,
    }
}

#[tokio::test]
async fn merge_dry_run_returns_populated_reports() {
    let m = mocked(true);

    let report = m
        .synchronizer
        .bidirectional_sync(&m.harness.account, None, "merge", true)
        .await
        .unwrap();

    assert_eq!(report.pull.zones, 1);
    assert_eq!(report.pull.changes.len(), 1);
    assert_eq!(report.push.changes.len(), 1);
    assert!(report.conflicts.is_empty());
    assert!(report.resolved.is_empty());

    assert_eq!(m.pull.dry_runs(), vec![true]);
    assert_eq!(m.push.dry_runs(), vec![true]);
}

#[tokio::test]
async fn unsupported_mode_never_reaches_pull_or_push() {
    let m = mocked(false);

    let err = m
        .synchronizer
        .bidirectional_sync(&m.harness.account, None, "invalid_mode", false)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::UnsupportedMode(ref mode) if mode == "invalid_mode"));
    assert_eq!(m.pull.calls(), 0);
    assert_eq!(m.push.calls(), 0);

    // The bidirectional lock was taken and released
    assert!(
        !m.harness
            .locks
            .is_locked(SyncOperation::Bidirectional, &m.harness.account, None)
            .await
            .unwrap()
    );
}

#[tokio::test]
async fn local_wins_previews_pull_then_pushes() {
    let m = mocked(false);

    m.synchronizer
        .bidirectional_sync(&m.harness.account, None, "local_wins", false)
        .await
        .unwrap();

    assert_eq!(m.pull.dry_runs(), vec![true]);
    assert_eq!(m.push.dry_runs(), vec![false]);
}

#[tokio::test]
async fn remote_wins_previews_push_then_pulls() {
    let m = mocked(true);

    let report = m
        .synchronizer
        .bidirectional_sync(&m.harness.account, None, "remote_wins", false)
        .await
        .unwrap();

    assert_eq!(m.push.dry_runs(), vec![true]);
    assert_eq!(m.pull.dry_runs(), vec![false]);
    assert!(report.conflicts.is_empty());
}

#[tokio::test]
async fn caller_dry_run_flows_into_the_second_step() {
    let m = mocked(true);

    m.synchronizer
        .bidirectional_sync(&m.harness.account, None, "local_wins", true)
        .await
        .unwrap();
    m.synchronizer
        .bidirectional_sync(&m.harness.account, None, "remote_wins", true)
        .await
        .unwrap();

    assert_eq!(m.pull.dry_runs(), vec![true, true]);
    assert_eq!(m.push.dry_runs(), vec![true, true]);
}

#[tokio::test]
async fn busy_bidirectional_lock_fails_fast() {
    let m = mocked(false);
    let _held = m
        .harness
        .locks
        .acquire(SyncOperation::Bidirectional, &m.harness.account, None)
        .await
        .unwrap();

    let err = m
        .synchronizer
        .bidirectional_sync(&m.harness.account, None, "merge", false)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::LockAcquisition(SyncOperation::Bidirectional)));
    assert_eq!(
        err.to_string(),
        "Cannot acquire lock for bidirectional synchronization"
    );
    assert_eq!(m.pull.calls(), 0);
}

/// Real reconcilers: one record edited locally and present remotely
async fn conflicting(source_of_truth: SourceOfTruth) -> (Harness, Synchronizer, RecordSet) {
    let client = StubRemoteClient::new().with_zone(
        "Z1",
        "example.com.",
        vec![remote_record("www.example.com.", "A")],
    );
    let harness = Harness::new(client);
    let mut zone = harness.seed_zone("Z1", "example.com.").await;
    zone.set_source_of_truth(source_of_truth);
    harness.store.save_zone(zone.clone()).await.unwrap();
    let record = harness
        .seed_record(&zone, "www.example.com.", "A", Some("L"), Some("R"), false)
        .await;

    let synchronizer = Synchronizer::new(
        Arc::clone(&harness.clients),
        harness.store.clone(),
        harness.locks.clone(),
    );
    (harness, synchronizer, record)
}

#[tokio::test]
async fn merge_with_local_truth_marks_record_pushed() {
    let (harness, synchronizer, record) = conflicting(SourceOfTruth::Local).await;

    let report = synchronizer
        .bidirectional_sync(&harness.account, None, "merge", false)
        .await
        .unwrap();

    assert_eq!(report.pull.records, 1);
    assert_eq!(report.push.changes.len(), 1);
    assert!(report.push.changes[0].dry_run);
    assert_eq!(report.conflicts.len(), 1);
    assert_eq!(report.conflicts[0].record, "www.example.com. A");
    assert_eq!(report.conflicts[0].winner, SourceOfTruth::Local);
    assert_eq!(report.resolved[0].action, ResolutionAction::Push);

    let stored = harness.stored(&record).await;
    assert_eq!(stored.remote_fingerprint(), Some("L"));
    assert_eq!(stored.local_fingerprint(), Some("L"));
}

#[tokio::test]
async fn merge_with_remote_truth_restores_remote_content() {
    let (harness, synchronizer, record) = conflicting(SourceOfTruth::Remote).await;
    let mut edited = harness.stored(&record).await;
    edited.set_ttl(Some(60));
    harness.store.save_record_set(edited).await.unwrap();

    let report = synchronizer
        .bidirectional_sync(&harness.account, None, "merge", false)
        .await
        .unwrap();

    assert_eq!(report.conflicts.len(), 1);
    assert_eq!(report.resolved[0].action, ResolutionAction::DiscardLocal);

    let stored = harness.stored(&record).await;
    assert_eq!(stored.ttl(), Some(300));
    assert_eq!(stored.resource_records(), Some(&["192.0.2.10".to_string()][..]));
    assert!(stored.local_fingerprint().is_some());
    assert_eq!(stored.local_fingerprint(), stored.remote_fingerprint());

    let push = harness
        .push()
        .push_to_remote(&harness.account, None, false)
        .await
        .unwrap();
    assert!(push.changes.is_empty());
}

#[tokio::test]
async fn merge_leaves_edits_the_provider_has_not_moved_pending() {
    let harness = Harness::new(StubRemoteClient::new().with_zone(
        "Z1",
        "example.com.",
        vec![remote_record("www.example.com.", "A")],
    ));
    harness
        .pull()
        .pull_from_remote(&harness.account, None, false)
        .await
        .unwrap();

    let mut zone = harness
        .store
        .find_one_by_account_and_remote_id(harness.account.id(), "Z1")
        .await
        .unwrap()
        .unwrap();
    zone.set_source_of_truth(SourceOfTruth::Remote);
    harness.store.save_zone(zone.clone()).await.unwrap();

    let mut record = harness.store.find_by_zone(zone.id()).await.unwrap().remove(0);
    assert_eq!(record.local_fingerprint(), record.remote_fingerprint());
    record.set_ttl(Some(60));
    harness.store.save_record_set(record.clone()).await.unwrap();

    let synchronizer = Synchronizer::new(
        Arc::clone(&harness.clients),
        harness.store.clone(),
        harness.locks.clone(),
    );
    let report = synchronizer
        .bidirectional_sync(&harness.account, None, "merge", false)
        .await
        .unwrap();

    assert!(report.conflicts.is_empty());
    assert_eq!(report.push.changes.len(), 1);
    assert_eq!(harness.stored(&record).await.ttl(), Some(60));

    let push = harness
        .push()
        .push_to_remote(&harness.account, None, false)
        .await
        .unwrap();
    assert_eq!(push.changes.len(), 1);
}

#[tokio::test]
async fn merge_preview_leaves_store_untouched() {
    let (harness, synchronizer, record) = conflicting(SourceOfTruth::Local).await;

    let report = synchronizer
        .bidirectional_sync(&harness.account, None, "merge", true)
        .await
        .unwrap();

    assert_eq!(report.conflicts.len(), 1);
    assert!(report.resolved[0].dry_run);
    assert_eq!(harness.stored(&record).await, record);
}

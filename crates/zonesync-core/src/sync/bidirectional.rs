//! Bidirectional orchestration
//!
//! One bidirectional lock wraps the whole run. The pull and push it drives
//! take their own locks under different key prefixes, so nesting never
//! deadlocks on the same resource.
//!
//! | mode          | first                 | then                         |
//! |---------------|-----------------------|------------------------------|
//! | `local_wins`  | pull (dry run)        | push (caller's `dry_run`)    |
//! | `remote_wins` | push (dry run)        | pull (caller's `dry_run`)    |
//! | `merge`       | pull + push (dry run) | resolve conflicts            |
//!
//! The mode string is validated inside the lock, so an unsupported mode
//! still takes and releases the bidirectional lock, and never reaches pull
//! or push.

use std::sync::Arc;

use crate::client::ClientCache;
use crate::lock::LockGate;
use crate::model::{Account, HostedZone};
use crate::sync::{
    BidirectionalReport, MergeResolver, PullReconciler, PullReport, PushReconciler, PushReport,
    SyncMode, SyncOperation,
};
use crate::traits::{PullSynchronizer, PushSynchronizer, SyncStore};
use crate::Result;

/// Entry point for pull, push and bidirectional runs
pub struct Synchronizer {
    pull: Arc<dyn PullSynchronizer>,
    push: Arc<dyn PushSynchronizer>,
    merge: MergeResolver,
    locks: LockGate,
}

impl Synchronizer {
    /// Wire the standard reconcilers around one store, cache and lock gate
    pub fn new(clients: Arc<ClientCache>, store: Arc<dyn SyncStore>, locks: LockGate) -> Self {
        let pull = Arc::new(PullReconciler::new(
            Arc::clone(&clients),
            Arc::clone(&store),
            locks.clone(),
        ));
        let push = Arc::new(PushReconciler::new(clients, Arc::clone(&store), locks.clone()));
        Self::from_parts(pull, push, store, locks)
    }

    /// Build from explicit one-directional synchronizers
    pub fn from_parts(
        pull: Arc<dyn PullSynchronizer>,
        push: Arc<dyn PushSynchronizer>,
        store: Arc<dyn SyncStore>,
        locks: LockGate,
    ) -> Self {
        Self {
            pull,
            push,
            merge: MergeResolver::new(store),
            locks,
        }
    }

    /// Pull with logging
    pub async fn pull_from_remote(
        &self,
        account: &Account,
        zone: Option<&HostedZone>,
        dry_run: bool,
    ) -> Result<PullReport> {
        tracing::debug!(account = %account, dry_run, "Delegating to pull");
        self.pull.pull_from_remote(account, zone, dry_run).await
    }

    /// Push with logging
    pub async fn push_to_remote(
        &self,
        account: &Account,
        zone: Option<&HostedZone>,
        dry_run: bool,
    ) -> Result<PushReport> {
        tracing::debug!(account = %account, dry_run, "Delegating to push");
        self.push.push_to_remote(account, zone, dry_run).await
    }

    /// Run pull and push under `mode`
    ///
    /// # Errors
    ///
    /// - [`Error::LockAcquisition`](crate::Error::LockAcquisition) when the
    ///   bidirectional lock (or a nested pull/push lock) is busy
    /// - [`Error::UnsupportedMode`](crate::Error::UnsupportedMode) for any
    ///   mode other than `local_wins`, `remote_wins` or `merge`
    pub async fn bidirectional_sync(
        &self,
        account: &Account,
        zone: Option<&HostedZone>,
        mode: &str,
        dry_run: bool,
    ) -> Result<BidirectionalReport> {
        tracing::info!(
            account = %account,
            zone = zone.map(|z| z.remote_id()),
            mode,
            dry_run,
            "Starting bidirectional sync"
        );

        let report = self
            .locks
            .run_exclusive(
                SyncOperation::Bidirectional,
                account,
                zone,
                self.perform(account, zone, mode, dry_run),
            )
            .await?;

        tracing::info!(
            account = %account,
            pulled = report.pull.records,
            pushed = report.push.changes.len(),
            conflicts = report.conflicts.len(),
            "Bidirectional sync complete"
        );
        Ok(report)
    }

    async fn perform(
        &self,
        account: &Account,
        zone: Option<&HostedZone>,
        mode: &str,
        dry_run: bool,
    ) -> Result<BidirectionalReport> {
        let mode: SyncMode = mode.parse()?;

        match mode {
            SyncMode::LocalWins => {
                let pull = self.pull.pull_from_remote(account, zone, true).await?;
                let push = self.push.push_to_remote(account, zone, dry_run).await?;
                Ok(BidirectionalReport {
                    pull,
                    push,
                    ..Default::default()
                })
            }
            SyncMode::RemoteWins => {
                let push = self.push.push_to_remote(account, zone, true).await?;
                let pull = self.pull.pull_from_remote(account, zone, dry_run).await?;
                Ok(BidirectionalReport {
                    pull,
                    push,
                    ..Default::default()
                })
            }
            SyncMode::Merge => {
                let pull = self.pull.pull_from_remote(account, zone, true).await?;
                let push = self.push.push_to_remote(account, zone, true).await?;
                self.merge.resolve(account, zone, pull, push, dry_run).await
            }
        }
    }
}

impl std::fmt::Debug for Synchronizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Synchronizer")
            .field("locks", &self.locks)
            .finish_non_exhaustive()
    }
}

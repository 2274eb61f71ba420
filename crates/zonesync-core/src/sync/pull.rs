//! Provider → local mirror reconciliation
//!
//! Remote listing failures never fail a pull: they are logged and the
//! affected zone (or its records) is skipped. Only lock contention, client
//! construction and the final commit surface as errors.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::client::ClientCache;
use crate::lock::LockGate;
use crate::model::{Account, HostedZone, RecordKey, RecordSet};
use crate::sync::{PullChange, PullReport, SyncOperation};
use crate::traits::{
    ChangeSet, PullSynchronizer, RemoteDnsClient, RemoteHostedZone, RemoteRecordSet, SyncStore,
};
use crate::Result;

/// Mirrors hosted zones and record sets from the provider
pub struct PullReconciler {
    clients: Arc<ClientCache>,
    store: Arc<dyn SyncStore>,
    locks: LockGate,
}

impl PullReconciler {
    pub fn new(clients: Arc<ClientCache>, store: Arc<dyn SyncStore>, locks: LockGate) -> Self {
        Self {
            clients,
            store,
            locks,
        }
    }

    async fn perform_pull(
        &self,
        account: &Account,
        zone: Option<&HostedZone>,
        dry_run: bool,
    ) -> Result<PullReport> {
        let client = self.clients.get_or_create(account)?;
        let mut run = PullRun {
            account,
            client: client.as_ref(),
            store: self.store.as_ref(),
            changes: ChangeSet::new(),
            report: PullReport::default(),
            now: Utc::now(),
        };

        match zone {
            Some(zone) => run.pull_zone(zone).await,
            None => run.pull_all_zones().await,
        }

        let PullRun {
            changes, report, ..
        } = run;

        if !dry_run {
            let staged = changes.len();
            self.store.commit(changes).await?;
            tracing::debug!(account = %account, staged, "Committed pull");
        }

        Ok(report)
    }
}

#[async_trait]
impl PullSynchronizer for PullReconciler {
    async fn pull_from_remote(
        &self,
        account: &Account,
        zone: Option<&HostedZone>,
        dry_run: bool,
    ) -> Result<PullReport> {
        tracing::info!(
            account = %account,
            zone = zone.map(|z| z.remote_id()),
            dry_run,
            "Starting pull"
        );

        let report = self
            .locks
            .run_exclusive(
                SyncOperation::Pull,
                account,
                zone,
                self.perform_pull(account, zone, dry_run),
            )
            .await?;

        tracing::info!(
            account = %account,
            zones = report.zones,
            records = report.records,
            dry_run,
            "Pull complete"
        );
        Ok(report)
    }
}

impl std::fmt::Debug for PullReconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PullReconciler")
            .field("clients", &self.clients)
            .field("locks", &self.locks)
            .finish_non_exhaustive()
    }
}

/// State of one pull while it runs
struct PullRun<'a> {
    account: &'a Account,
    client: &'a dyn RemoteDnsClient,
    store: &'a dyn SyncStore,
    changes: ChangeSet,
    report: PullReport,
    now: DateTime<Utc>,
}

impl PullRun<'_> {
    /// Pull every zone the provider lists, in listing order
    async fn pull_all_zones(&mut self) {
        let remote_zones = match self.client.list_hosted_zones().await {
            Ok(zones) => zones,
            Err(e) => {
                tracing::warn!(account = %self.account, "Failed to list hosted zones: {}", e);
                return;
            }
        };

        for remote_zone in &remote_zones {
            match self.sync_hosted_zone(remote_zone, None).await {
                Ok(Some(local_zone)) => {
                    self.report.zones += 1;
                    self.pull_zone_records(&local_zone).await;
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(
                        zone_id = %remote_zone.normalized_id(),
                        "Failed to pull zone: {}",
                        e
                    );
                }
            }
        }
    }

    /// Pull one known zone, found by scanning the full listing
    async fn pull_zone(&mut self, zone: &HostedZone) {
        if let Err(e) = self.try_pull_zone(zone).await {
            tracing::warn!(zone_id = %zone.remote_id(), "Failed to pull zone: {}", e);
        }
    }

    async fn try_pull_zone(&mut self, zone: &HostedZone) -> Result<()> {
        let remote_zones = self.client.list_hosted_zones().await?;
        let Some(remote_zone) = remote_zones
            .iter()
            .find(|z| z.normalized_id() == zone.remote_id())
        else {
            tracing::debug!(zone_id = %zone.remote_id(), "Zone not found on provider");
            return Ok(());
        };

        if let Some(local_zone) = self.sync_hosted_zone(remote_zone, Some(zone)).await? {
            self.report.zones += 1;
            self.pull_zone_records(&local_zone).await;
        }
        Ok(())
    }

    /// Upsert the local mirror of a remote zone
    ///
    /// Returns `None` for a malformed entry (empty id or name).
    async fn sync_hosted_zone(
        &mut self,
        remote: &RemoteHostedZone,
        known: Option<&HostedZone>,
    ) -> Result<Option<HostedZone>> {
        let remote_id = remote.normalized_id();
        if remote_id.is_empty() || remote.name.is_empty() {
            tracing::debug!(zone_id = %remote.id, "Skipping malformed remote zone");
            return Ok(None);
        }

        let account_id = self.account.id();
        let existing = match self.changes.staged_zone(account_id, remote_id) {
            Some(staged) => Some(staged.clone()),
            None => {
                self.store
                    .find_one_by_account_and_remote_id(account_id, remote_id)
                    .await?
            }
        };

        let mut local_zone = existing
            .or_else(|| known.filter(|k| k.remote_id() == remote_id).cloned())
            .unwrap_or_else(|| HostedZone::new(account_id, remote_id));

        local_zone.apply_remote(remote, self.now);
        self.changes.stage_zone(local_zone.clone());
        Ok(Some(local_zone))
    }

    /// Pull the record sets of one zone; listing failures are logged
    async fn pull_zone_records(&mut self, zone: &HostedZone) {
        if let Err(e) = self.try_pull_zone_records(zone).await {
            tracing::warn!(
                zone_id = %zone.remote_id(),
                "Failed to pull records for zone: {}",
                e
            );
        }
    }

    async fn try_pull_zone_records(&mut self, zone: &HostedZone) -> Result<()> {
        let remote_records = self
            .client
            .list_resource_record_sets(zone.remote_id())
            .await?;

        for remote in &remote_records {
            if self.sync_record_set(zone, remote).await?.is_some() {
                self.report.records += 1;
                self.report
                    .changes
                    .push(PullChange::observed(zone.name(), remote));
            }
        }
        Ok(())
    }

    /// Upsert the local mirror of a remote record set
    ///
    /// Returns `None` for a record with an empty name.
    async fn sync_record_set(
        &mut self,
        zone: &HostedZone,
        remote: &RemoteRecordSet,
    ) -> Result<Option<RecordSet>> {
        if remote.name.is_empty() {
            return Ok(None);
        }

        let key = RecordKey::new(
            remote.name.clone(),
            remote.record_type.clone(),
            remote.set_identifier.clone(),
        );

        let existing = match self.changes.staged_record_set(zone.id(), &key) {
            Some(staged) => Some(staged.clone()),
            None => {
                self.store
                    .find_one_by_zone_name_type_and_set_identifier(zone.id(), &key)
                    .await?
            }
        };

        let local = match existing {
            Some(mut local) => {
                local.apply_remote(remote, self.now);
                local
            }
            None => {
                let mut local = RecordSet::new(zone.id(), key);
                local.apply_remote(remote, self.now);
                local.mark_in_sync();
                local
            }
        };
        self.changes.stage_record_set(local.clone());
        Ok(Some(local))
    }
}

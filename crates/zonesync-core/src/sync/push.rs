//! Local mirror → provider reconciliation
//!
//! A record needs pushing when its local fingerprint differs from the last
//! remote fingerprint. System-managed records (SOA, NS) are never pushed and
//! nothing is ever deleted. Each zone is committed on its own, so a failing
//! zone does not hold back the others.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::client::ClientCache;
use crate::lock::LockGate;
use crate::model::{Account, ChangeAction, ChangeLog, HostedZone};
use crate::sync::fingerprint::record_has_local_changes;
use crate::sync::{PushChange, PushError, PushReport, SyncOperation};
use crate::traits::{ChangeSet, PushSynchronizer, SyncStore};
use crate::Result;

/// Finds diverging record sets and records them as applied
///
/// The provider call itself is not issued here: a successful push means the
/// fingerprints were aligned and an `applied` change log entry was written.
pub struct PushReconciler {
    clients: Arc<ClientCache>,
    store: Arc<dyn SyncStore>,
    locks: LockGate,
}

impl PushReconciler {
    pub fn new(clients: Arc<ClientCache>, store: Arc<dyn SyncStore>, locks: LockGate) -> Self {
        Self {
            clients,
            store,
            locks,
        }
    }

    async fn perform_push(
        &self,
        account: &Account,
        zone: Option<&HostedZone>,
        dry_run: bool,
    ) -> Result<PushReport> {
        let zones = match zone {
            Some(zone) => vec![zone.clone()],
            None => self.store.find_by_account(account.id()).await?,
        };

        let mut report = PushReport::default();

        // Client construction is all-or-nothing for the batch
        if let Err(e) = self.clients.get_or_create(account) {
            tracing::error!(account = %account, "Failed to create remote client: {}", e);
            report.errors = zones
                .iter()
                .map(|z| PushError {
                    zone: z.name().to_string(),
                    error: e.to_string(),
                })
                .collect();
            return Ok(report);
        }

        let plan_id = Uuid::new_v4().to_string();

        for zone in &zones {
            if let Err(e) = self
                .push_zone(account, zone, dry_run, &plan_id, &mut report)
                .await
            {
                tracing::error!(
                    account = %account,
                    zone = %zone.name(),
                    "Failed to push zone: {}",
                    e
                );
                report.errors.push(PushError {
                    zone: zone.name().to_string(),
                    error: e.to_string(),
                });
            }
        }

        Ok(report)
    }

    async fn push_zone(
        &self,
        account: &Account,
        zone: &HostedZone,
        dry_run: bool,
        plan_id: &str,
        report: &mut PushReport,
    ) -> Result<()> {
        let records = self.store.find_by_zone(zone.id()).await?;
        let mut changes = ChangeSet::new();
        let now = Utc::now();

        for mut record in records {
            if record.is_managed_by_system() || !record_has_local_changes(&record) {
                continue;
            }

            report
                .changes
                .push(PushChange::upsert(zone.name(), record.to_string(), dry_run));

            if dry_run {
                continue;
            }

            let before = serde_json::to_value(&record)?;
            record.mark_pushed(now);
            let after = serde_json::to_value(&record)?;

            let mut entry = ChangeLog::new(
                account.id(),
                Some(zone.id()),
                record.key().to_string(),
                ChangeAction::Upsert,
            )
            .with_snapshots(Some(before), Some(after))
            .with_plan_id(plan_id);
            entry.mark_applied(None, now)?;

            changes.stage_change_log(entry);
            changes.stage_record_set(record);
        }

        if !dry_run {
            let staged = changes.len();
            self.store.commit(changes).await?;
            tracing::debug!(zone = %zone.name(), staged, "Committed push for zone");
        }

        Ok(())
    }
}

#[async_trait]
impl PushSynchronizer for PushReconciler {
    async fn push_to_remote(
        &self,
        account: &Account,
        zone: Option<&HostedZone>,
        dry_run: bool,
    ) -> Result<PushReport> {
        tracing::info!(
            account = %account,
            zone = zone.map(|z| z.remote_id()),
            dry_run,
            "Starting push"
        );

        let report = self
            .locks
            .run_exclusive(
                SyncOperation::Push,
                account,
                zone,
                self.perform_push(account, zone, dry_run),
            )
            .await?;

        tracing::info!(
            account = %account,
            changes = report.changes.len(),
            errors = report.errors.len(),
            dry_run,
            "Push complete"
        );
        Ok(report)
    }
}

impl std::fmt::Debug for PushReconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PushReconciler")
            .field("clients", &self.clients)
            .field("locks", &self.locks)
            .finish_non_exhaustive()
    }
}

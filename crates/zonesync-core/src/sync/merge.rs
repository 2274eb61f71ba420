//! Conflict resolution for `merge` runs
//!
//! A conflict is a record that is not system-managed, carries a pending
//! local edit (fingerprints differ), and whose content as observed by the
//! dry-run pull differs from both the local content and the last confirmed
//! remote fingerprint. The owning zone's source of truth picks the winner:
//!
//! - `local`: the local state is treated as pushed
//! - `remote`: the local edit is discarded and the observed content restored
//!
//! Local edits the provider has not moved away from stay pending for a later
//! `local_wins` run.

use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;

use crate::model::{Account, HostedZone, RecordKey, SourceOfTruth};
use crate::sync::fingerprint::record_has_local_changes;
use crate::sync::{
    BidirectionalReport, Conflict, PullReport, PushReport, Resolution, ResolutionAction,
};
use crate::traits::{ChangeSet, RemoteRecordSet, SyncStore};
use crate::Result;

/// Decides and (outside dry runs) persists merge resolutions
#[derive(Clone)]
pub struct MergeResolver {
    store: Arc<dyn SyncStore>,
}

impl MergeResolver {
    pub fn new(store: Arc<dyn SyncStore>) -> Self {
        Self { store }
    }

    /// Combine two dry-run reports and resolve their conflicts
    pub async fn resolve(
        &self,
        account: &Account,
        zone: Option<&HostedZone>,
        pull: PullReport,
        push: PushReport,
        dry_run: bool,
    ) -> Result<BidirectionalReport> {
        let observed: HashMap<(&str, RecordKey), &RemoteRecordSet> = pull
            .changes
            .iter()
            .filter_map(|c| {
                let remote = c.remote.as_ref()?;
                let key = RecordKey::new(
                    remote.name.clone(),
                    remote.record_type.clone(),
                    remote.set_identifier.clone(),
                );
                Some(((c.zone.as_str(), key), remote))
            })
            .collect();

        let zones = match zone {
            Some(zone) => vec![zone.clone()],
            None => self.store.find_by_account(account.id()).await?,
        };

        let mut conflicts = Vec::new();
        let mut resolved = Vec::new();
        let mut changes = ChangeSet::new();
        let now = Utc::now();

        for zone in &zones {
            for mut record in self.store.find_by_zone(zone.id()).await? {
                if record.is_managed_by_system() || !record_has_local_changes(&record) {
                    continue;
                }

                let Some(remote) = observed.get(&(zone.name(), record.key())).copied() else {
                    continue;
                };

                let theirs = record.remote_content_fingerprint(remote);
                if record.remote_fingerprint() == Some(theirs.as_str())
                    || record.local_fingerprint() == Some(theirs.as_str())
                {
                    continue;
                }

                let label = record.to_string();
                let winner = zone.source_of_truth();
                conflicts.push(Conflict {
                    zone: zone.name().to_string(),
                    record: label.clone(),
                    local_fingerprint: record.local_fingerprint().map(str::to_string),
                    remote_fingerprint: Some(theirs),
                    winner,
                });

                let action = match winner {
                    SourceOfTruth::Local => ResolutionAction::Push,
                    SourceOfTruth::Remote => ResolutionAction::DiscardLocal,
                };
                resolved.push(Resolution {
                    zone: zone.name().to_string(),
                    record: label,
                    action,
                    dry_run,
                });

                if !dry_run {
                    match action {
                        ResolutionAction::Push => record.mark_pushed(now),
                        ResolutionAction::DiscardLocal => record.discard_local(remote, now),
                    }
                    changes.stage_record_set(record);
                }
            }
        }

        if !changes.is_empty() {
            self.store.commit(changes).await?;
        }

        tracing::info!(
            account = %account,
            conflicts = conflicts.len(),
            dry_run,
            "Merge resolution complete"
        );

        Ok(BidirectionalReport {
            pull,
            push,
            conflicts,
            resolved,
        })
    }
}

impl std::fmt::Debug for MergeResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MergeResolver").finish_non_exhaustive()
    }
}

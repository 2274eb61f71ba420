// # Sync Store Traits
//
// The local mirror the reconcilers read from and write to.
//
// ## Purpose
//
// Reconcilers never write entities one by one. They look entities up through
// the repository traits, stage new and modified entities in a `ChangeSet`,
// and hand the whole batch to `SyncStore::commit` at a well-defined point
// (end of a pull, end of each zone in a push).
//
// ## Implementations
//
// - In-memory: `store::MemoryStore`
// - JSON file with crash recovery: `store::FileStore`

use async_trait::async_trait;
use uuid::Uuid;

use crate::model::{Account, ChangeLog, ChangeStatus, HostedZone, RecordKey, RecordSet};

/// Account lookups
#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Accounts matching a comma-separated filter, ordered by name
    ///
    /// Each token matches the account name, the numeric provider account id
    /// or the UUID; tokens are ORed. `None` or a blank filter returns every
    /// account.
    async fn find_accounts_with_filter(
        &self,
        filter: Option<&str>,
    ) -> Result<Vec<Account>, crate::Error>;

    /// First account whose name, numeric id or UUID equals `identifier`
    async fn find_account_by_identifier(
        &self,
        identifier: &str,
    ) -> Result<Option<Account>, crate::Error>;

    /// Enabled accounts, ordered by name
    async fn find_enabled_accounts(&self) -> Result<Vec<Account>, crate::Error>;

    async fn save_account(&self, account: Account) -> Result<(), crate::Error>;

    async fn remove_account(&self, id: Uuid) -> Result<(), crate::Error>;
}

/// Hosted zone lookups
#[async_trait]
pub trait ZoneRepository: Send + Sync {
    async fn find_one_by_account_and_remote_id(
        &self,
        account_id: Uuid,
        remote_id: &str,
    ) -> Result<Option<HostedZone>, crate::Error>;

    /// Zones owned by an account, in insertion order
    async fn find_by_account(&self, account_id: Uuid) -> Result<Vec<HostedZone>, crate::Error>;

    async fn save_zone(&self, zone: HostedZone) -> Result<(), crate::Error>;

    /// Remove a zone together with its record sets
    async fn remove_zone(&self, id: Uuid) -> Result<(), crate::Error>;
}

/// Record set lookups
#[async_trait]
pub trait RecordSetRepository: Send + Sync {
    async fn find_one_by_zone_name_type_and_set_identifier(
        &self,
        zone_id: Uuid,
        key: &RecordKey,
    ) -> Result<Option<RecordSet>, crate::Error>;

    /// Record sets of a zone, in insertion order
    async fn find_by_zone(&self, zone_id: Uuid) -> Result<Vec<RecordSet>, crate::Error>;

    async fn save_record_set(&self, record_set: RecordSet) -> Result<(), crate::Error>;

    async fn remove_record_set(&self, id: Uuid) -> Result<(), crate::Error>;
}

/// Audit trail lookups
#[async_trait]
pub trait ChangeLogRepository: Send + Sync {
    async fn find_by_plan_id(&self, plan_id: &str) -> Result<Vec<ChangeLog>, crate::Error>;

    async fn find_by_status(&self, status: ChangeStatus) -> Result<Vec<ChangeLog>, crate::Error>;

    async fn save_change_log(&self, entry: ChangeLog) -> Result<(), crate::Error>;
}

/// The complete local mirror
///
/// # Atomicity
///
/// `commit` applies a whole [`ChangeSet`] or nothing. A batch that would
/// break either uniqueness constraint, `(account, remote_id)` for zones or
/// `(zone, name, type, set_identifier)` for record sets, is rejected with
/// [`Error::Conflict`](crate::Error::Conflict).
#[async_trait]
pub trait SyncStore:
    AccountRepository + ZoneRepository + RecordSetRepository + ChangeLogRepository
{
    async fn commit(&self, changes: ChangeSet) -> Result<(), crate::Error>;
}

/// Entities staged for one commit
///
/// Staging an entity whose id is already staged replaces the earlier copy.
/// Lookups through the `staged_*` helpers let a reconciler see its own
/// uncommitted work, so the same remote item seen twice maps to one entity.
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    zones: Vec<HostedZone>,
    record_sets: Vec<RecordSet>,
    change_logs: Vec<ChangeLog>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage_zone(&mut self, zone: HostedZone) {
        match self.zones.iter_mut().find(|z| z.id() == zone.id()) {
            Some(slot) => *slot = zone,
            None => self.zones.push(zone),
        }
    }

    pub fn stage_record_set(&mut self, record_set: RecordSet) {
        match self
            .record_sets
            .iter_mut()
            .find(|r| r.id() == record_set.id())
        {
            Some(slot) => *slot = record_set,
            None => self.record_sets.push(record_set),
        }
    }

    pub fn stage_change_log(&mut self, entry: ChangeLog) {
        match self.change_logs.iter_mut().find(|c| c.id() == entry.id()) {
            Some(slot) => *slot = entry,
            None => self.change_logs.push(entry),
        }
    }

    /// Staged zone with this natural key, if any
    pub fn staged_zone(&self, account_id: Uuid, remote_id: &str) -> Option<&HostedZone> {
        self.zones
            .iter()
            .find(|z| z.account_id() == account_id && z.remote_id() == remote_id)
    }

    /// Staged record set with this natural key, if any
    pub fn staged_record_set(&self, zone_id: Uuid, key: &RecordKey) -> Option<&RecordSet> {
        self.record_sets.iter().find(|r| {
            r.zone_id() == zone_id
                && r.name() == key.name
                && r.record_type() == key.record_type
                && r.set_identifier() == key.set_identifier.as_deref()
        })
    }

    pub fn zones(&self) -> &[HostedZone] {
        &self.zones
    }

    pub fn record_sets(&self) -> &[RecordSet] {
        &self.record_sets
    }

    pub fn change_logs(&self) -> &[ChangeLog] {
        &self.change_logs
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty() && self.record_sets.is_empty() && self.change_logs.is_empty()
    }

    /// Number of staged entities
    pub fn len(&self) -> usize {
        self.zones.len() + self.record_sets.len() + self.change_logs.len()
    }

    pub fn into_parts(self) -> (Vec<HostedZone>, Vec<RecordSet>, Vec<ChangeLog>) {
        (self.zones, self.record_sets, self.change_logs)
    }
}

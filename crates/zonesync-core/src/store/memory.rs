// # Memory Store
//
// In-memory implementation of SyncStore.
//
// ## Purpose
//
// Fast, non-persistent mirror for tests, dry-run tooling and one-shot runs
// that pull into memory and report.
//
// ## Crash Behavior
//
// - Everything is lost on restart
// - The next pull rebuilds the mirror from the provider
// - Pending local edits (fingerprint divergence) do not survive

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::Tables;
use crate::account::AccountFilter;
use crate::model::{Account, ChangeLog, ChangeStatus, HostedZone, RecordKey, RecordSet};
use crate::traits::{
    AccountRepository, ChangeLogRepository, ChangeSet, RecordSetRepository, SyncStore,
    ZoneRepository,
};
use crate::Error;

/// In-memory store implementation
///
/// Clones share the same tables.
///
/// # Example
///
/// ```rust,no_run
/// use zonesync_core::model::{Account, CredentialKind};
/// use zonesync_core::store::MemoryStore;
/// use zonesync_core::traits::AccountRepository;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = MemoryStore::new();
///     store.save_account(Account::new("prod", CredentialKind::Env)).await?;
///
///     let found = store.find_account_by_identifier("prod").await?;
///     assert!(found.is_some());
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    /// Create a new empty memory store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of committed zones
    pub async fn zone_count(&self) -> usize {
        self.inner.read().await.counts().1
    }

    /// Number of committed record sets
    pub async fn record_set_count(&self) -> usize {
        self.inner.read().await.counts().2
    }

    /// Check if the store holds nothing at all
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.counts() == (0, 0, 0, 0)
    }
}

#[async_trait]
impl AccountRepository for MemoryStore {
    async fn find_accounts_with_filter(&self, filter: Option<&str>) -> Result<Vec<Account>, Error> {
        let filter = AccountFilter::parse(filter);
        Ok(self.inner.read().await.accounts_with_filter(&filter))
    }

    async fn find_account_by_identifier(&self, identifier: &str) -> Result<Option<Account>, Error> {
        Ok(self.inner.read().await.account_by_identifier(identifier))
    }

    async fn find_enabled_accounts(&self) -> Result<Vec<Account>, Error> {
        Ok(self.inner.read().await.enabled_accounts())
    }

    async fn save_account(&self, account: Account) -> Result<(), Error> {
        self.inner.write().await.upsert_account(account);
        Ok(())
    }

    async fn remove_account(&self, id: Uuid) -> Result<(), Error> {
        self.inner.write().await.remove_account(id);
        Ok(())
    }
}

#[async_trait]
impl ZoneRepository for MemoryStore {
    async fn find_one_by_account_and_remote_id(
        &self,
        account_id: Uuid,
        remote_id: &str,
    ) -> Result<Option<HostedZone>, Error> {
        Ok(self.inner.read().await.zone_by_key(account_id, remote_id))
    }

    async fn find_by_account(&self, account_id: Uuid) -> Result<Vec<HostedZone>, Error> {
        Ok(self.inner.read().await.zones_by_account(account_id))
    }

    async fn save_zone(&self, zone: HostedZone) -> Result<(), Error> {
        self.inner.write().await.upsert_zone(zone)
    }

    async fn remove_zone(&self, id: Uuid) -> Result<(), Error> {
        self.inner.write().await.remove_zone(id);
        Ok(())
    }
}

#[async_trait]
impl RecordSetRepository for MemoryStore {
    async fn find_one_by_zone_name_type_and_set_identifier(
        &self,
        zone_id: Uuid,
        key: &RecordKey,
    ) -> Result<Option<RecordSet>, Error> {
        Ok(self.inner.read().await.record_by_key(zone_id, key))
    }

    async fn find_by_zone(&self, zone_id: Uuid) -> Result<Vec<RecordSet>, Error> {
        Ok(self.inner.read().await.records_by_zone(zone_id))
    }

    async fn save_record_set(&self, record_set: RecordSet) -> Result<(), Error> {
        self.inner.write().await.upsert_record(record_set)
    }

    async fn remove_record_set(&self, id: Uuid) -> Result<(), Error> {
        self.inner.write().await.remove_record(id);
        Ok(())
    }
}

#[async_trait]
impl ChangeLogRepository for MemoryStore {
    async fn find_by_plan_id(&self, plan_id: &str) -> Result<Vec<ChangeLog>, Error> {
        Ok(self.inner.read().await.change_logs_by_plan(plan_id))
    }

    async fn find_by_status(&self, status: ChangeStatus) -> Result<Vec<ChangeLog>, Error> {
        Ok(self.inner.read().await.change_logs_by_status(status))
    }

    async fn save_change_log(&self, entry: ChangeLog) -> Result<(), Error> {
        self.inner.write().await.upsert_change_log(entry);
        Ok(())
    }
}

#[async_trait]
impl SyncStore for MemoryStore {
    async fn commit(&self, changes: ChangeSet) -> Result<(), Error> {
        if changes.is_empty() {
            return Ok(());
        }
        let staged = changes.len();
        let mut tables = self.inner.write().await;
        *tables = tables.with_changes(changes)?;
        tracing::trace!("Committed {} staged entities to memory store", staged);
        Ok(())
    }
}

//! Test doubles and common utilities for synchronization contract tests
//!
//! The doubles are scriptable and count their calls, so tests can assert
//! both on results and on which collaborators were (not) reached.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use uuid::Uuid;
use zonesync_core::error::{Error, Result};
use zonesync_core::model::{
    Account, ChangeLog, ChangeStatus, CredentialKind, HostedZone, RecordKey, RecordSet,
};
use zonesync_core::sync::{PullChange, PullReport, PushChange, PushReport};
use zonesync_core::traits::{
    AccountRepository, ChangeLogRepository, ChangeSet, PullSynchronizer, PushSynchronizer,
    RecordSetRepository, RemoteClientFactory, RemoteDnsClient, RemoteHostedZone,
    RemoteRecordSet, RemoteZoneConfig, SyncStore, ZoneRepository,
};
use zonesync_core::{ClientCache, LockGate, MemoryStore, PullReconciler, PushReconciler};

/// A scriptable remote client
#[derive(Default)]
pub struct StubRemoteClient {
    zones: Vec<RemoteHostedZone>,
    records: HashMap<String, Vec<RemoteRecordSet>>,
    fail_zone_listing: bool,
    failing_record_zones: HashSet<String>,
    delay: Option<Duration>,
    list_zones_calls: Arc<AtomicUsize>,
    list_records_calls: Arc<AtomicUsize>,
}

impl StubRemoteClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a zone (id without prefix) and its record sets
    pub fn with_zone(mut self, id: &str, name: &str, records: Vec<RemoteRecordSet>) -> Self {
        self.zones.push(remote_zone(id, name));
        self.records.insert(id.to_string(), records);
        self
    }

    /// Add a raw zone entry without records
    pub fn with_raw_zone(mut self, zone: RemoteHostedZone) -> Self {
        self.zones.push(zone);
        self
    }

    /// Make `list_hosted_zones` fail
    pub fn failing_zone_listing(mut self) -> Self {
        self.fail_zone_listing = true;
        self
    }

    /// Make `list_resource_record_sets` fail for one zone
    pub fn failing_records_for(mut self, zone_id: &str) -> Self {
        self.failing_record_zones.insert(zone_id.to_string());
        self
    }

    /// Sleep inside every listing call
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Get the number of times list_hosted_zones() was called
    pub fn list_zones_calls(&self) -> usize {
        self.list_zones_calls.load(Ordering::SeqCst)
    }

    /// Get the number of times list_resource_record_sets() was called
    pub fn list_records_calls(&self) -> usize {
        self.list_records_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteDnsClient for StubRemoteClient {
    async fn list_hosted_zones(&self) -> Result<Vec<RemoteHostedZone>> {
        self.list_zones_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_zone_listing {
            return Err(Error::provider("stub", "zone listing unavailable"));
        }
        Ok(self.zones.clone())
    }

    async fn list_resource_record_sets(&self, zone_id: &str) -> Result<Vec<RemoteRecordSet>> {
        self.list_records_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_record_zones.contains(zone_id) {
            return Err(Error::rate_limited("Throttling: Rate exceeded"));
        }
        Ok(self.records.get(zone_id).cloned().unwrap_or_default())
    }

    fn provider_name(&self) -> &'static str {
        "stub"
    }
}

/// A factory handing out one shared stub client
pub struct StubClientFactory {
    client: Option<Arc<StubRemoteClient>>,
    created: Arc<AtomicUsize>,
}

impl StubClientFactory {
    pub fn new(client: Arc<StubRemoteClient>) -> Self {
        Self {
            client: Some(client),
            created: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// A factory whose every `create` fails
    pub fn failing() -> Self {
        Self {
            client: None,
            created: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Get the number of times create() was called
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }
}

impl RemoteClientFactory for StubClientFactory {
    fn create(&self, account: &Account) -> Result<Arc<dyn RemoteDnsClient>> {
        self.created.fetch_add(1, Ordering::SeqCst);
        match &self.client {
            Some(client) => Ok(Arc::clone(client) as Arc<dyn RemoteDnsClient>),
            None => Err(Error::unsupported_credentials(
                account.credentials().type_name(),
            )),
        }
    }
}

/// Store, locks and client wiring shared by the reconciler tests
pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub locks: LockGate,
    pub client: Arc<StubRemoteClient>,
    pub factory: Arc<StubClientFactory>,
    pub clients: Arc<ClientCache>,
    pub account: Account,
}

impl Harness {
    pub fn new(client: StubRemoteClient) -> Self {
        let client = Arc::new(client);
        let factory = Arc::new(StubClientFactory::new(Arc::clone(&client)));
        Self::with_factory(client, factory)
    }

    /// Wiring whose client factory always fails
    pub fn with_failing_factory() -> Self {
        Self::with_factory(
            Arc::new(StubRemoteClient::new()),
            Arc::new(StubClientFactory::failing()),
        )
    }

    fn with_factory(client: Arc<StubRemoteClient>, factory: Arc<StubClientFactory>) -> Self {
        let clients = Arc::new(ClientCache::new(factory.clone(), true));
        Self {
            store: Arc::new(MemoryStore::new()),
            locks: LockGate::in_memory(),
            client,
            factory,
            clients,
            account: test_account(),
        }
    }

    pub fn pull(&self) -> PullReconciler {
        PullReconciler::new(
            Arc::clone(&self.clients),
            self.store.clone(),
            self.locks.clone(),
        )
    }

    pub fn push(&self) -> PushReconciler {
        PushReconciler::new(
            Arc::clone(&self.clients),
            self.store.clone(),
            self.locks.clone(),
        )
    }

    /// Save a zone owned by the harness account
    pub async fn seed_zone(&self, remote_id: &str, name: &str) -> HostedZone {
        let mut zone = HostedZone::new(self.account.id(), remote_id);
        zone.set_name(name);
        self.store.save_zone(zone.clone()).await.unwrap();
        zone
    }

    /// Save a record with explicit fingerprints
    pub async fn seed_record(
        &self,
        zone: &HostedZone,
        name: &str,
        record_type: &str,
        local: Option<&str>,
        remote: Option<&str>,
        managed: bool,
    ) -> RecordSet {
        let mut record = RecordSet::new(zone.id(), RecordKey::new(name, record_type, None));
        record.set_local_fingerprint(local.map(str::to_string));
        record.set_remote_fingerprint(remote.map(str::to_string));
        record.set_managed_by_system(managed);
        self.store.save_record_set(record.clone()).await.unwrap();
        record
    }

    /// Re-read one record from the store
    pub async fn stored(&self, record: &RecordSet) -> RecordSet {
        self.store
            .find_one_by_zone_name_type_and_set_identifier(record.zone_id(), &record.key())
            .await
            .unwrap()
            .expect("record is stored")
    }

    /// Push reconciler over `store` instead of the harness store
    pub fn push_with(&self, store: Arc<dyn SyncStore>) -> PushReconciler {
        PushReconciler::new(Arc::clone(&self.clients), store, self.locks.clone())
    }
}

/// A MemoryStore that fails record reads or commits for chosen zones
pub struct FlakyStore {
    inner: Arc<MemoryStore>,
    failing_reads: HashSet<Uuid>,
    failing_commits: HashSet<Uuid>,
    commits: Arc<AtomicUsize>,
}

impl FlakyStore {
    pub fn new(inner: Arc<MemoryStore>) -> Self {
        Self {
            inner,
            failing_reads: HashSet::new(),
            failing_commits: HashSet::new(),
            commits: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Make `find_by_zone` fail for one zone
    pub fn failing_reads_for(mut self, zone_id: Uuid) -> Self {
        self.failing_reads.insert(zone_id);
        self
    }

    /// Make `commit` fail when it stages a record set of this zone
    pub fn failing_commits_for(mut self, zone_id: Uuid) -> Self {
        self.failing_commits.insert(zone_id);
        self
    }

    /// Number of commits that reached the inner store
    pub fn commits(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AccountRepository for FlakyStore {
    async fn find_accounts_with_filter(&self, filter: Option<&str>) -> Result<Vec<Account>> {
        self.inner.find_accounts_with_filter(filter).await
    }

    async fn find_account_by_identifier(&self, identifier: &str) -> Result<Option<Account>> {
        self.inner.find_account_by_identifier(identifier).await
    }

    async fn find_enabled_accounts(&self) -> Result<Vec<Account>> {
        self.inner.find_enabled_accounts().await
    }

    async fn save_account(&self, account: Account) -> Result<()> {
        self.inner.save_account(account).await
    }

    async fn remove_account(&self, id: Uuid) -> Result<()> {
        self.inner.remove_account(id).await
    }
}

#[async_trait]
impl ZoneRepository for FlakyStore {
    async fn find_one_by_account_and_remote_id(
        &self,
        account_id: Uuid,
        remote_id: &str,
    ) -> Result<Option<HostedZone>> {
        self.inner
            .find_one_by_account_and_remote_id(account_id, remote_id)
            .await
    }

    async fn find_by_account(&self, account_id: Uuid) -> Result<Vec<HostedZone>> {
        self.inner.find_by_account(account_id).await
    }

    async fn save_zone(&self, zone: HostedZone) -> Result<()> {
        self.inner.save_zone(zone).await
    }

    async fn remove_zone(&self, id: Uuid) -> Result<()> {
        self.inner.remove_zone(id).await
    }
}

#[async_trait]
impl RecordSetRepository for FlakyStore {
    async fn find_one_by_zone_name_type_and_set_identifier(
        &self,
        zone_id: Uuid,
        key: &RecordKey,
    ) -> Result<Option<RecordSet>> {
        self.inner
            .find_one_by_zone_name_type_and_set_identifier(zone_id, key)
            .await
    }

    async fn find_by_zone(&self, zone_id: Uuid) -> Result<Vec<RecordSet>> {
        if self.failing_reads.contains(&zone_id) {
            return Err(Error::store(format!("record sets of zone {} unavailable", zone_id)));
        }
        self.inner.find_by_zone(zone_id).await
    }

    async fn save_record_set(&self, record_set: RecordSet) -> Result<()> {
        self.inner.save_record_set(record_set).await
    }

    async fn remove_record_set(&self, id: Uuid) -> Result<()> {
        self.inner.remove_record_set(id).await
    }
}

#[async_trait]
impl ChangeLogRepository for FlakyStore {
    async fn find_by_plan_id(&self, plan_id: &str) -> Result<Vec<ChangeLog>> {
        self.inner.find_by_plan_id(plan_id).await
    }

    async fn find_by_status(&self, status: ChangeStatus) -> Result<Vec<ChangeLog>> {
        self.inner.find_by_status(status).await
    }

    async fn save_change_log(&self, entry: ChangeLog) -> Result<()> {
        self.inner.save_change_log(entry).await
    }
}

#[async_trait]
impl SyncStore for FlakyStore {
    async fn commit(&self, changes: ChangeSet) -> Result<()> {
        if changes
            .record_sets()
            .iter()
            .any(|r| self.failing_commits.contains(&r.zone_id()))
        {
            return Err(Error::store("commit rejected"));
        }
        self.commits.fetch_add(1, Ordering::SeqCst);
        self.inner.commit(changes).await
    }
}

/// A PullSynchronizer that counts calls and returns a canned report
#[derive(Default)]
pub struct CountingPull {
    calls: Arc<AtomicUsize>,
    dry_runs: Arc<std::sync::Mutex<Vec<bool>>>,
    report: PullReport,
}

impl CountingPull {
    pub fn returning(report: PullReport) -> Self {
        Self {
            report,
            ..Default::default()
        }
    }

    /// Get the number of times pull_from_remote() was called
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// The dry_run flag of each call, in call order
    pub fn dry_runs(&self) -> Vec<bool> {
        self.dry_runs.lock().unwrap().clone()
    }

    /// Create a new CountingPull that shares counters with an existing one
    pub fn sharing_counters_with(other: &Self) -> Self {
        Self {
            calls: Arc::clone(&other.calls),
            dry_runs: Arc::clone(&other.dry_runs),
            report: other.report.clone(),
        }
    }
}

#[async_trait]
impl PullSynchronizer for CountingPull {
    async fn pull_from_remote(
        &self,
        _account: &Account,
        _zone: Option<&HostedZone>,
        dry_run: bool,
    ) -> Result<PullReport> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.dry_runs.lock().unwrap().push(dry_run);
        Ok(self.report.clone())
    }
}

/// A PushSynchronizer that counts calls and returns a canned report
#[derive(Default)]
pub struct CountingPush {
    calls: Arc<AtomicUsize>,
    dry_runs: Arc<std::sync::Mutex<Vec<bool>>>,
    report: PushReport,
}

impl CountingPush {
    pub fn returning(report: PushReport) -> Self {
        Self {
            report,
            ..Default::default()
        }
    }

    /// Get the number of times push_to_remote() was called
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// The dry_run flag of each call, in call order
    pub fn dry_runs(&self) -> Vec<bool> {
        self.dry_runs.lock().unwrap().clone()
    }

    /// Create a new CountingPush that shares counters with an existing one
    pub fn sharing_counters_with(other: &Self) -> Self {
        Self {
            calls: Arc::clone(&other.calls),
            dry_runs: Arc::clone(&other.dry_runs),
            report: other.report.clone(),
        }
    }
}

#[async_trait]
impl PushSynchronizer for CountingPush {
    async fn push_to_remote(
        &self,
        _account: &Account,
        _zone: Option<&HostedZone>,
        dry_run: bool,
    ) -> Result<PushReport> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.dry_runs.lock().unwrap().push(dry_run);
        Ok(self.report.clone())
    }
}

/// Canned one-zone pull report
pub fn sample_pull_report() -> PullReport {
    PullReport {
        zones: 1,
        records: 1,
        changes: vec![PullChange::sync("example.com.", "www.example.com. A")],
    }
}

/// Canned one-change push report
pub fn sample_push_report(dry_run: bool) -> PushReport {
    PushReport {
        changes: vec![PushChange::upsert("example.com.", "api.example.com. A", dry_run)],
        errors: Vec::new(),
    }
}

pub fn test_account() -> Account {
    let mut account = Account::new("test-account", CredentialKind::Env);
    account.set_account_id(Some("123456789012".to_string()));
    account
}

/// Remote zone as the provider lists it (prefixed id)
pub fn remote_zone(id: &str, name: &str) -> RemoteHostedZone {
    RemoteHostedZone {
        id: format!("/hostedzone/{}", id),
        name: name.to_string(),
        caller_reference: Some(format!("ref-{}", id)),
        config: Some(RemoteZoneConfig {
            comment: None,
            private_zone: false,
        }),
        resource_record_set_count: Some(2),
    }
}

/// Simple A-style record with one value
pub fn remote_record(name: &str, record_type: &str) -> RemoteRecordSet {
    RemoteRecordSet {
        name: name.to_string(),
        record_type: record_type.to_string(),
        ttl: Some(300),
        resource_records: vec!["192.0.2.10".to_string()],
        ..Default::default()
    }
}

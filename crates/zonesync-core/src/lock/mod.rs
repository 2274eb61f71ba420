// # Lock Gate
//
// Per-operation mutual exclusion for synchronization runs.
//
// ## Keys
//
// `route53_{operation}_{account_uuid}` with an optional `_{zone_remote_id}`
// suffix when the run is scoped to one zone. Pull, push and bidirectional
// use distinct prefixes, so a bidirectional run can hold its own lock while
// the pull and push it drives take theirs.
//
// ## Release
//
// A granted lock is wrapped in a `LockGuard`. The guard releases on drop,
// which covers normal return, `?` propagation, panics and a dropped future.
// There is no retry: a busy key fails the operation immediately.

mod file;
mod memory;

pub use file::FileLockStore;
pub use memory::MemoryLockStore;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::config::{LockConfig, LockKeyspace};
use crate::model::{Account, HostedZone};
use crate::sync::SyncOperation;
use crate::traits::{Lease, LockStore};
use crate::{Error, Result};

/// Deterministic lock key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LockKey {
    operation: SyncOperation,
    account_id: Uuid,
    zone_remote_id: Option<String>,
    keyspace: LockKeyspace,
}

impl LockKey {
    pub fn new(
        operation: SyncOperation,
        account_id: Uuid,
        zone_remote_id: Option<String>,
        keyspace: LockKeyspace,
    ) -> Self {
        Self {
            operation,
            account_id,
            zone_remote_id,
            keyspace,
        }
    }

    pub fn operation(&self) -> SyncOperation {
        self.operation
    }

    fn prefix(&self) -> &'static str {
        match (self.keyspace, self.operation) {
            (LockKeyspace::Shared, SyncOperation::Pull | SyncOperation::Push) => "sync",
            (_, operation) => operation.as_str(),
        }
    }
}

impl std::fmt::Display for LockKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "route53_{}_{}", self.prefix(), self.account_id)?;
        if let Some(zone) = &self.zone_remote_id {
            write!(f, "_{}", zone)?;
        }
        Ok(())
    }
}

/// Held lock; released when dropped
pub struct LockGuard {
    store: Arc<dyn LockStore>,
    lease: Option<Lease>,
}

impl LockGuard {
    pub fn key(&self) -> &str {
        self.lease.as_ref().map(|l| l.key.as_str()).unwrap_or_default()
    }

    /// Release now and report the outcome
    pub fn release(mut self) -> Result<()> {
        match self.lease.take() {
            Some(lease) => self.store.release(&lease),
            None => Ok(()),
        }
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if let Some(lease) = self.lease.take() {
            match self.store.release(&lease) {
                Ok(()) => tracing::debug!(key = %lease.key, "Released lock"),
                Err(e) => tracing::warn!(key = %lease.key, "Failed to release lock: {}", e),
            }
        }
    }
}

impl std::fmt::Debug for LockGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockGuard").field("lease", &self.lease).finish()
    }
}

/// Entry point for taking synchronization locks
#[derive(Clone)]
pub struct LockGate {
    store: Arc<dyn LockStore>,
    config: LockConfig,
}

impl LockGate {
    pub fn new(store: Arc<dyn LockStore>, config: LockConfig) -> Self {
        Self { store, config }
    }

    /// Gate over a process-local store with default leases
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryLockStore::new()), LockConfig::default())
    }

    pub fn config(&self) -> &LockConfig {
        &self.config
    }

    pub fn key(
        &self,
        operation: SyncOperation,
        account: &Account,
        zone: Option<&HostedZone>,
    ) -> LockKey {
        LockKey::new(
            operation,
            account.id(),
            zone.map(|z| z.remote_id().to_string()),
            self.config.keyspace,
        )
    }

    /// Take the lock for `operation` with its configured lease
    pub async fn acquire(
        &self,
        operation: SyncOperation,
        account: &Account,
        zone: Option<&HostedZone>,
    ) -> Result<LockGuard> {
        let key = self.key(operation, account, zone);
        self.acquire_key(&key, self.config.lease_for(operation)).await
    }

    /// Take an explicit key with an explicit lease
    pub async fn acquire_key(&self, key: &LockKey, lease: Duration) -> Result<LockGuard> {
        let key_str = key.to_string();
        match self.store.try_acquire(&key_str, lease).await? {
            Some(lease) => {
                tracing::debug!(key = %key_str, expires_at = %lease.expires_at, "Acquired lock");
                Ok(LockGuard {
                    store: Arc::clone(&self.store),
                    lease: Some(lease),
                })
            }
            None => {
                tracing::warn!(key = %key_str, "Lock is held elsewhere");
                Err(Error::LockAcquisition(key.operation()))
            }
        }
    }

    /// Run `body` while holding the lock for `operation`
    ///
    /// Fails with [`Error::LockAcquisition`] without polling `body` when the
    /// key is busy.
    pub async fn run_exclusive<T, F>(
        &self,
        operation: SyncOperation,
        account: &Account,
        zone: Option<&HostedZone>,
        body: F,
    ) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let _guard = self.acquire(operation, account, zone).await?;
        body.await
    }

    pub async fn is_locked(
        &self,
        operation: SyncOperation,
        account: &Account,
        zone: Option<&HostedZone>,
    ) -> Result<bool> {
        let key = self.key(operation, account, zone);
        self.store.is_locked(&key.to_string()).await
    }
}

impl std::fmt::Debug for LockGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockGate").field("config", &self.config).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CredentialKind;

    fn account() -> Account {
        Account::new("prod", CredentialKind::Env)
    }

    #[test]
    fn key_format() {
        let id = Uuid::nil();
        let key = LockKey::new(SyncOperation::Pull, id, None, LockKeyspace::PerOperation);
        assert_eq!(
            key.to_string(),
            "route53_pull_00000000-0000-0000-0000-000000000000"
        );

        let zoned = LockKey::new(
            SyncOperation::Bidirectional,
            id,
            Some("Z1".to_string()),
            LockKeyspace::PerOperation,
        );
        assert_eq!(
            zoned.to_string(),
            "route53_bidirectional_00000000-0000-0000-0000-000000000000_Z1"
        );
    }

    #[test]
    fn shared_keyspace_unifies_pull_and_push() {
        let id = Uuid::new_v4();
        let pull = LockKey::new(SyncOperation::Pull, id, None, LockKeyspace::Shared);
        let push = LockKey::new(SyncOperation::Push, id, None, LockKeyspace::Shared);
        let bidi = LockKey::new(SyncOperation::Bidirectional, id, None, LockKeyspace::Shared);
        assert_eq!(pull.to_string(), push.to_string());
        assert!(pull.to_string().starts_with("route53_sync_"));
        assert!(bidi.to_string().starts_with("route53_bidirectional_"));
    }

    #[test]
    fn keys_distinguish_keyspace_in_sets() {
        let id = Uuid::new_v4();
        let keys: std::collections::HashSet<LockKey> = [
            LockKey::new(SyncOperation::Pull, id, None, LockKeyspace::PerOperation),
            LockKey::new(SyncOperation::Pull, id, None, LockKeyspace::PerOperation),
            LockKey::new(SyncOperation::Pull, id, None, LockKeyspace::Shared),
        ]
        .into_iter()
        .collect();
        assert_eq!(keys.len(), 2);
    }

    #[tokio::test]
    async fn second_acquire_fails_until_release() {
        let gate = LockGate::in_memory();
        let account = account();

        let guard = gate.acquire(SyncOperation::Pull, &account, None).await.unwrap();
        let err = gate
            .acquire(SyncOperation::Pull, &account, None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::LockAcquisition(SyncOperation::Pull)));

        // Different operation kinds do not collide by default
        assert!(gate.acquire(SyncOperation::Push, &account, None).await.is_ok());

        guard.release().unwrap();
        assert!(gate.acquire(SyncOperation::Pull, &account, None).await.is_ok());
    }

    #[tokio::test]
    async fn run_exclusive_releases_on_error() {
        let gate = LockGate::in_memory();
        let account = account();

        let result: Result<()> = gate
            .run_exclusive(SyncOperation::Push, &account, None, async {
                Err(Error::store("boom"))
            })
            .await;
        assert!(result.is_err());
        assert!(!gate.is_locked(SyncOperation::Push, &account, None).await.unwrap());
    }

    #[tokio::test]
    async fn run_exclusive_holds_lock_during_body() {
        let gate = LockGate::in_memory();
        let account = account();

        let observed = gate
            .run_exclusive(SyncOperation::Pull, &account, None, async {
                gate.is_locked(SyncOperation::Pull, &account, None).await
            })
            .await
            .unwrap();
        assert!(observed);
        assert!(!gate.is_locked(SyncOperation::Pull, &account, None).await.unwrap());
    }
}

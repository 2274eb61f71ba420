//! In-memory lock store
//!
//! Excludes callers inside one process only.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use crate::traits::{Lease, LockStore};
use crate::{Error, Result};

/// Process-local lock store
#[derive(Debug, Default)]
pub struct MemoryLockStore {
    leases: Mutex<HashMap<String, Lease>>,
}

impl MemoryLockStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn leases(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Lease>>> {
        self.leases
            .lock()
            .map_err(|_| Error::lock_store("lock table poisoned"))
    }
}

#[async_trait]
impl LockStore for MemoryLockStore {
    async fn try_acquire(&self, key: &str, lease: Duration) -> Result<Option<Lease>> {
        let mut leases = self.leases()?;
        let now = Utc::now();

        if let Some(existing) = leases.get(key) {
            if !existing.is_expired(now) {
                return Ok(None);
            }
            tracing::debug!(key = %key, "Taking over expired lease");
        }

        let granted = Lease::grant(key, lease);
        leases.insert(key.to_string(), granted.clone());
        Ok(Some(granted))
    }

    fn release(&self, lease: &Lease) -> Result<()> {
        let mut leases = self.leases()?;
        if leases.get(&lease.key).is_some_and(|l| l.token == lease.token) {
            leases.remove(&lease.key);
        }
        Ok(())
    }

    async fn is_locked(&self, key: &str) -> Result<bool> {
        let leases = self.leases()?;
        Ok(leases.get(key).is_some_and(|l| !l.is_expired(Utc::now())))
    }
}

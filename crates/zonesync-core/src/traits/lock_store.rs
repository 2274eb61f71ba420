// # Lock Store Trait
//
// Lease-based mutual exclusion keyed by string.
//
// ## Semantics
//
// - `try_acquire` never waits: it either grants a lease or reports the key busy
// - A lease that outlives its duration is abandoned and may be taken over
// - `release` only removes the lease it was handed (owner token check)
//
// `release` is synchronous so that a guard can call it from `Drop`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;
use uuid::Uuid;

/// A granted lease
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lease {
    /// Lock key
    pub key: String,
    /// Owner token; only the holder of this token may release
    pub token: Uuid,
    /// When the lease is considered abandoned
    pub expires_at: DateTime<Utc>,
}

impl Lease {
    /// Grant a fresh lease starting now
    pub fn grant(key: impl Into<String>, duration: Duration) -> Self {
        // Out-of-range leases are capped at a century
        let duration = chrono::Duration::from_std(duration)
            .ok()
            .filter(|d| *d <= chrono::Duration::days(36_500))
            .unwrap_or_else(|| chrono::Duration::days(36_500));
        Self {
            key: key.into(),
            token: Uuid::new_v4(),
            expires_at: Utc::now() + duration,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Trait for lock store implementations
///
/// Implementations must be thread-safe and usable across async tasks.
#[async_trait]
pub trait LockStore: Send + Sync {
    /// Try to take the lock for `key`
    ///
    /// # Returns
    ///
    /// - `Ok(Some(lease))`: The lock is held until released or expired
    /// - `Ok(None)`: Someone else holds an unexpired lease
    /// - `Err(Error)`: The backing store failed
    async fn try_acquire(
        &self,
        key: &str,
        lease: Duration,
    ) -> Result<Option<Lease>, crate::Error>;

    /// Release a lease previously returned by `try_acquire`
    ///
    /// Releasing a lease that already expired and was taken over by someone
    /// else is a no-op.
    fn release(&self, lease: &Lease) -> Result<(), crate::Error>;

    /// Whether an unexpired lease exists for `key`
    async fn is_locked(&self, key: &str) -> Result<bool, crate::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grant_sets_expiry_in_future() {
        let lease = Lease::grant("k", Duration::from_secs(60));
        assert!(!lease.is_expired(Utc::now()));
        assert!(lease.is_expired(lease.expires_at));
    }

    #[test]
    fn zero_duration_is_immediately_expired() {
        let lease = Lease::grant("k", Duration::ZERO);
        assert!(lease.is_expired(Utc::now()));
    }
}

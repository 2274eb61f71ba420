// # Synchronizer Traits
//
// One-directional reconciliation between the local mirror and the provider.
// The bidirectional `Synchronizer` composes one of each, which is also how
// tests substitute counting doubles.

use async_trait::async_trait;

use crate::model::{Account, HostedZone};
use crate::sync::{PullReport, PushReport};

/// Provider → local mirror
#[async_trait]
pub trait PullSynchronizer: Send + Sync {
    /// Mirror the account's zones (or just `zone`) and their record sets
    ///
    /// With `dry_run` nothing is persisted, but the report still lists what
    /// would have been written. Only lock contention and client construction
    /// fail the call; provider listing failures are absorbed.
    async fn pull_from_remote(
        &self,
        account: &Account,
        zone: Option<&HostedZone>,
        dry_run: bool,
    ) -> Result<PullReport, crate::Error>;
}

/// Local mirror → provider
#[async_trait]
pub trait PushSynchronizer: Send + Sync {
    /// Report (and unless `dry_run`, record as applied) every record set
    /// whose local fingerprint diverges from the last remote fingerprint
    ///
    /// Per-zone failures are returned in the report's `errors`; only lock
    /// contention fails the call.
    async fn push_to_remote(
        &self,
        account: &Account,
        zone: Option<&HostedZone>,
        dry_run: bool,
    ) -> Result<PushReport, crate::Error>;
}

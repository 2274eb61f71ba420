//! Core traits for zone synchronization
//!
//! This module defines the seams between the reconcilers and the outside
//! world.
//!
//! - [`RemoteDnsClient`] / [`RemoteClientFactory`]: Read hosted zones and record sets from the provider
//! - [`SyncStore`]: The local mirror (accounts, zones, record sets, change log)
//! - [`LockStore`]: Lease-based mutual exclusion
//! - [`PullSynchronizer`] / [`PushSynchronizer`]: One-directional reconciliation

pub mod lock_store;
pub mod remote_client;
pub mod store;
pub mod synchronizer;

pub use lock_store::{Lease, LockStore};
pub use remote_client::{
    RemoteClientFactory, RemoteDnsClient, RemoteHostedZone, RemoteRecordSet, RemoteZoneConfig,
};
pub use store::{
    AccountRepository, ChangeLogRepository, ChangeSet, RecordSetRepository, SyncStore,
    ZoneRepository,
};
pub use synchronizer::{PullSynchronizer, PushSynchronizer};

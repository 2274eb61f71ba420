// # zonesync-core
//
// Core library for keeping a local zone store and Route 53 consistent in
// both directions.
//
// ## Architecture Overview
//
// - **RemoteDnsClient**: Trait for listing hosted zones and record sets on the provider
// - **SyncStore**: Trait for the local mirror (accounts, zones, record sets, change log)
// - **LockStore / LockGate**: Lease-based mutual exclusion per (operation, account, zone)
// - **ClientCache**: Per-account cache of remote client handles
// - **PullReconciler / PushReconciler**: One-directional reconciliation
// - **Synchronizer**: Bidirectional orchestration under a mode policy
//
// ## Design Principles
//
// 1. **Traits at the seams**: Provider, persistence and locking are pluggable
// 2. **Sequential reconciliation**: No internal parallelism, deterministic ordering
// 3. **Batched writes**: Staged in a `ChangeSet`, committed at well-defined points
// 4. **Scoped locks**: Every critical section releases its lease on all exit paths
// 5. **Dry runs**: Report what would change without persisting anything

pub mod account;
pub mod client;
pub mod config;
pub mod error;
pub mod lock;
pub mod model;
pub mod store;
pub mod sync;
pub mod traits;

// Re-export core types for convenience
pub use account::{AccountFilter, AccountResolver};
pub use client::ClientCache;
pub use config::{
    ClientCacheConfig, LockConfig, LockKeyspace, LockStoreConfig, StoreConfig, SyncConfig,
};
pub use error::{Error, Result};
pub use lock::{FileLockStore, LockGate, LockGuard, LockKey, MemoryLockStore};
pub use model::{
    Account, ChangeLog, CredentialKind, HostedZone, RecordKey, RecordSet, SourceOfTruth,
};
pub use store::{FileStore, MemoryStore};
pub use sync::{
    BidirectionalReport, MergeResolver, PullReconciler, PullReport, PushReconciler, PushReport,
    SyncMode, SyncOperation, Synchronizer,
};
pub use traits::{
    LockStore, PullSynchronizer, PushSynchronizer, RemoteClientFactory, RemoteDnsClient, SyncStore,
};

//! Configuration types for zone synchronization
//!
//! This module defines all configuration structures used throughout the crate.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::sync::SyncOperation;

/// Main synchronization configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Lock leases and key layout
    #[serde(default)]
    pub locks: LockConfig,

    /// Remote client caching
    #[serde(default)]
    pub client_cache: ClientCacheConfig,

    /// Local mirror backend
    #[serde(default)]
    pub store: StoreConfig,

    /// Lock backend
    #[serde(default)]
    pub lock_store: LockStoreConfig,
}

impl SyncConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.locks.validate()?;
        self.store.validate()?;
        self.lock_store.validate()?;
        Ok(())
    }
}

/// How lock keys are laid out
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockKeyspace {
    /// Pull and push each have their own key prefix and do not exclude
    /// each other
    #[default]
    PerOperation,

    /// Pull and push contend on one `route53_sync_*` key; bidirectional
    /// keeps its own prefix
    Shared,
}

impl std::str::FromStr for LockKeyspace {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "per_operation" => Ok(LockKeyspace::PerOperation),
            "shared" => Ok(LockKeyspace::Shared),
            other => Err(crate::Error::config(format!(
                "Unknown lock keyspace: {} (expected per_operation or shared)",
                other
            ))),
        }
    }
}

/// Lease durations and key layout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockConfig {
    /// Pull lease (in seconds)
    #[serde(default = "default_pull_lease_secs")]
    pub pull_lease_secs: u64,

    /// Push lease (in seconds)
    #[serde(default = "default_push_lease_secs")]
    pub push_lease_secs: u64,

    /// Bidirectional lease (in seconds)
    ///
    /// Wraps a pull and a push, so it must be at least their sum.
    #[serde(default = "default_bidirectional_lease_secs")]
    pub bidirectional_lease_secs: u64,

    /// Key layout
    #[serde(default)]
    pub keyspace: LockKeyspace,
}

impl LockConfig {
    /// Lease for one operation kind
    pub fn lease_for(&self, operation: SyncOperation) -> Duration {
        let secs = match operation {
            SyncOperation::Pull => self.pull_lease_secs,
            SyncOperation::Push => self.push_lease_secs,
            SyncOperation::Bidirectional => self.bidirectional_lease_secs,
        };
        Duration::from_secs(secs)
    }

    /// Validate the lock configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.pull_lease_secs == 0
            || self.push_lease_secs == 0
            || self.bidirectional_lease_secs == 0
        {
            return Err(crate::Error::config("Lock leases must be > 0"));
        }
        if self.bidirectional_lease_secs < self.pull_lease_secs + self.push_lease_secs {
            return Err(crate::Error::config(format!(
                "Bidirectional lease ({}s) must cover pull + push ({}s)",
                self.bidirectional_lease_secs,
                self.pull_lease_secs + self.push_lease_secs
            )));
        }
        Ok(())
    }
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            pull_lease_secs: default_pull_lease_secs(),
            push_lease_secs: default_push_lease_secs(),
            bidirectional_lease_secs: default_bidirectional_lease_secs(),
            keyspace: LockKeyspace::default(),
        }
    }
}

fn default_pull_lease_secs() -> u64 {
    1800
}

fn default_push_lease_secs() -> u64 {
    1800
}

fn default_bidirectional_lease_secs() -> u64 {
    3600
}

/// Remote client cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientCacheConfig {
    /// Reuse one client per account
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,
}

impl Default for ClientCacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_cache_enabled(),
        }
    }
}

fn default_cache_enabled() -> bool {
    true
}

/// Local mirror backend
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoreConfig {
    /// In-memory store (not persistent)
    #[default]
    Memory,

    /// JSON file store
    File {
        /// Path to the store file
        path: String,
    },
}

impl StoreConfig {
    /// Validate the store configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            StoreConfig::File { path } if path.trim().is_empty() => {
                Err(crate::Error::config("Store file path cannot be empty"))
            }
            _ => Ok(()),
        }
    }
}

/// Lock backend
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LockStoreConfig {
    /// Process-local locks
    #[default]
    Memory,

    /// Lock files, shared by every process that sees the directory
    File {
        /// Directory holding the lock files
        dir: String,
    },
}

impl LockStoreConfig {
    /// Validate the lock store configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            LockStoreConfig::File { dir } if dir.trim().is_empty() => {
                Err(crate::Error::config("Lock directory cannot be empty"))
            }
            _ => Ok(()),
        }
    }
}

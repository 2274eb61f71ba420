//! Reconciliation between the local mirror and the provider
//!
//! - [`PullReconciler`]: provider → local
//! - [`PushReconciler`]: local → provider
//! - [`Synchronizer`]: both directions under a [`SyncMode`] policy

mod bidirectional;
pub mod fingerprint;
mod merge;
mod pull;
mod push;
mod report;

pub use bidirectional::Synchronizer;
pub use merge::MergeResolver;
pub use pull::PullReconciler;
pub use push::PushReconciler;
pub use report::{
    BidirectionalReport, Conflict, PullChange, PullReport, PushChange, PushError, PushReport,
    Resolution, ResolutionAction,
};

use serde::{Deserialize, Serialize};

/// Kind of synchronization, used for lock keys and error messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncOperation {
    Pull,
    Push,
    Bidirectional,
}

impl SyncOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncOperation::Pull => "pull",
            SyncOperation::Push => "push",
            SyncOperation::Bidirectional => "bidirectional",
        }
    }
}

impl std::fmt::Display for SyncOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SyncOperation {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pull" => Ok(SyncOperation::Pull),
            "push" => Ok(SyncOperation::Push),
            "bidirectional" => Ok(SyncOperation::Bidirectional),
            other => Err(crate::Error::config(format!(
                "Unknown synchronization operation: {}",
                other
            ))),
        }
    }
}

/// Policy for a bidirectional run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// Observe remote, then push local truth
    LocalWins,
    /// Observe local drift, then pull remote truth
    RemoteWins,
    /// Observe both, then resolve conflicts per zone
    Merge,
}

impl SyncMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncMode::LocalWins => "local_wins",
            SyncMode::RemoteWins => "remote_wins",
            SyncMode::Merge => "merge",
        }
    }
}

impl std::fmt::Display for SyncMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SyncMode {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local_wins" => Ok(SyncMode::LocalWins),
            "remote_wins" => Ok(SyncMode::RemoteWins),
            "merge" => Ok(SyncMode::Merge),
            other => Err(crate::Error::UnsupportedMode(other.to_string())),
        }
    }
}

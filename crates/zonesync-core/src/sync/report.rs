//! Reports returned by the reconcilers
//!
//! Field names are part of the JSON surface consumed by callers.

use serde::{Deserialize, Serialize};

use crate::model::SourceOfTruth;
use crate::traits::RemoteRecordSet;

/// One record mirrored by a pull
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullChange {
    /// Always `"sync"`
    pub action: String,
    /// Zone name
    pub zone: String,
    /// `"<name> <type>"`
    pub record: String,
    /// Provider state that was observed; merge resolution reads it
    #[serde(skip)]
    pub remote: Option<RemoteRecordSet>,
}

impl PullChange {
    pub fn sync(zone: impl Into<String>, record: impl Into<String>) -> Self {
        Self {
            action: "sync".to_string(),
            zone: zone.into(),
            record: record.into(),
            remote: None,
        }
    }

    /// A change for an observed remote record set
    pub fn observed(zone: impl Into<String>, remote: &RemoteRecordSet) -> Self {
        Self {
            remote: Some(remote.clone()),
            ..Self::sync(zone, format!("{} {}", remote.name, remote.record_type))
        }
    }
}

/// Result of a pull
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullReport {
    /// Zones reconciled
    pub zones: usize,
    /// Record sets reconciled
    pub records: usize,
    pub changes: Vec<PullChange>,
}

/// One record a push found diverging
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushChange {
    /// Always `"upsert"`
    pub action: String,
    pub zone: String,
    pub record: String,
    pub dry_run: bool,
}

impl PushChange {
    pub fn upsert(zone: impl Into<String>, record: impl Into<String>, dry_run: bool) -> Self {
        Self {
            action: "upsert".to_string(),
            zone: zone.into(),
            record: record.into(),
            dry_run,
        }
    }
}

/// A zone a push could not process
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushError {
    pub zone: String,
    pub error: String,
}

/// Result of a push
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushReport {
    pub changes: Vec<PushChange>,
    pub errors: Vec<PushError>,
}

/// A record with a pending local edit whose provider content differs from
/// both the local content and the last confirmed remote state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conflict {
    pub zone: String,
    pub record: String,
    pub local_fingerprint: Option<String>,
    pub remote_fingerprint: Option<String>,
    /// Side that wins, taken from the zone's source of truth
    pub winner: SourceOfTruth,
}

/// What a merge decided for one conflict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionAction {
    /// Local state is treated as pushed
    Push,
    /// Local edit is dropped and the provider's content restored
    DiscardLocal,
}

/// A resolved conflict
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub zone: String,
    pub record: String,
    pub action: ResolutionAction,
    /// Whether the resolution was only planned
    pub dry_run: bool,
}

/// Result of a bidirectional run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BidirectionalReport {
    pub pull: PullReport,
    pub push: PushReport,
    pub conflicts: Vec<Conflict>,
    pub resolved: Vec<Resolution>,
}

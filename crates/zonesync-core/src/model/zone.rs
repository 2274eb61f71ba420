use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::traits::RemoteHostedZone;

/// Which side is authoritative when local and remote disagree
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceOfTruth {
    /// Local edits win
    #[default]
    Local,
    /// The provider wins
    Remote,
}

impl SourceOfTruth {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceOfTruth::Local => "local",
            SourceOfTruth::Remote => "remote",
        }
    }
}

impl std::fmt::Display for SourceOfTruth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Local mirror of a provider hosted zone
///
/// Unique on `(account_id, remote_id)`. The `remote_id` never carries the
/// `/hostedzone/` prefix the provider API uses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostedZone {
    id: Uuid,
    account_id: Uuid,
    remote_id: String,
    name: String,
    #[serde(default)]
    caller_ref: Option<String>,
    #[serde(default)]
    comment: Option<String>,
    #[serde(default)]
    is_private: bool,
    #[serde(default)]
    tags: Option<BTreeMap<String, String>>,
    #[serde(default)]
    rrset_count: Option<u64>,
    #[serde(default)]
    source_of_truth: SourceOfTruth,
    #[serde(default)]
    remote_fingerprint: Option<String>,
    #[serde(default)]
    last_sync_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl HostedZone {
    /// Create an empty mirror for a remote zone id
    pub fn new(account_id: Uuid, remote_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            account_id,
            remote_id: remote_id.into(),
            name: String::new(),
            caller_ref: None,
            comment: None,
            is_private: false,
            tags: None,
            rrset_count: None,
            source_of_truth: SourceOfTruth::default(),
            remote_fingerprint: None,
            last_sync_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Owning account's UUID
    pub fn account_id(&self) -> Uuid {
        self.account_id
    }

    pub fn remote_id(&self) -> &str {
        &self.remote_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
        self.touch();
    }

    pub fn caller_ref(&self) -> Option<&str> {
        self.caller_ref.as_deref()
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    pub fn set_comment(&mut self, comment: Option<String>) {
        self.comment = comment;
        self.touch();
    }

    pub fn is_private(&self) -> bool {
        self.is_private
    }

    pub fn tags(&self) -> Option<&BTreeMap<String, String>> {
        self.tags.as_ref()
    }

    pub fn set_tags(&mut self, tags: Option<BTreeMap<String, String>>) {
        self.tags = tags;
        self.touch();
    }

    pub fn rrset_count(&self) -> Option<u64> {
        self.rrset_count
    }

    pub fn source_of_truth(&self) -> SourceOfTruth {
        self.source_of_truth
    }

    pub fn set_source_of_truth(&mut self, source_of_truth: SourceOfTruth) {
        self.source_of_truth = source_of_truth;
        self.touch();
    }

    pub fn remote_fingerprint(&self) -> Option<&str> {
        self.remote_fingerprint.as_deref()
    }

    pub fn set_remote_fingerprint(&mut self, fingerprint: Option<String>) {
        self.remote_fingerprint = fingerprint;
        self.touch();
    }

    pub fn last_sync_at(&self) -> Option<DateTime<Utc>> {
        self.last_sync_at
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Overwrite the mirrored fields from the provider's description
    ///
    /// Stamps `last_sync_at` with `now`. Local-only fields (source of truth,
    /// tags, fingerprint) are left alone.
    pub fn apply_remote(&mut self, remote: &RemoteHostedZone, now: DateTime<Utc>) {
        self.name = remote.name.clone();
        self.caller_ref = remote.caller_reference.clone();
        self.comment = remote.config.as_ref().and_then(|c| c.comment.clone());
        self.is_private = remote.config.as_ref().is_some_and(|c| c.private_zone);
        self.rrset_count = remote.resource_record_set_count;
        self.last_sync_at = Some(now);
        self.updated_at = now;
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

impl std::fmt::Display for HostedZone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.remote_id)
    }
}

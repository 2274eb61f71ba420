use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::sync::fingerprint::content_fingerprint;
use crate::traits::RemoteRecordSet;

/// Record types the provider maintains at the zone apex
const INFRASTRUCTURE_TYPES: &[&str] = &["SOA", "NS"];

/// Alias target of an alias record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasTarget {
    pub dns_name: String,
    pub evaluate_target_health: bool,
    pub hosted_zone_id: String,
}

/// Geolocation routing selector
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeoLocation {
    #[serde(default)]
    pub continent_code: Option<String>,
    #[serde(default)]
    pub country_code: Option<String>,
    #[serde(default)]
    pub subdivision_code: Option<String>,
}

/// Natural key of a record set inside its zone
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordKey {
    pub name: String,
    pub record_type: String,
    pub set_identifier: Option<String>,
}

impl RecordKey {
    pub fn new(
        name: impl Into<String>,
        record_type: impl Into<String>,
        set_identifier: Option<String>,
    ) -> Self {
        Self {
            name: name.into(),
            record_type: record_type.into(),
            set_identifier,
        }
    }

    /// `"<name> <type>"`, the label used in sync reports
    pub fn label(&self) -> String {
        format!("{} {}", self.name, self.record_type)
    }
}

impl std::fmt::Display for RecordKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.set_identifier {
            Some(set) => write!(f, "{} {} [{}]", self.name, self.record_type, set),
            None => write!(f, "{} {}", self.name, self.record_type),
        }
    }
}

/// Local mirror of one resource record set
///
/// Unique on `(zone_id, name, record_type, set_identifier)`.
///
/// Two kinds of writes exist and they must not be mixed up:
///
/// - Local edits (`set_ttl`, `set_resource_records`, ...) stamp
///   `last_local_modified_at` and recompute `local_fingerprint`.
/// - [`RecordSet::apply_remote`] mirrors the provider's state and leaves
///   both fingerprints untouched, so pulling never hides a pending local edit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordSet {
    id: Uuid,
    zone_id: Uuid,
    name: String,
    record_type: String,
    #[serde(default)]
    ttl: Option<i64>,
    #[serde(default)]
    alias_target: Option<AliasTarget>,
    #[serde(default)]
    resource_records: Option<Vec<String>>,
    #[serde(default)]
    routing_policy: Option<serde_json::Value>,
    #[serde(default)]
    health_check_id: Option<String>,
    #[serde(default)]
    set_identifier: Option<String>,
    #[serde(default)]
    region: Option<String>,
    #[serde(default)]
    geo_location: Option<GeoLocation>,
    #[serde(default)]
    multi_value_answer: Option<bool>,
    #[serde(default)]
    local_fingerprint: Option<String>,
    #[serde(default)]
    remote_fingerprint: Option<String>,
    #[serde(default)]
    last_local_modified_at: Option<DateTime<Utc>>,
    #[serde(default)]
    last_seen_remote_at: Option<DateTime<Utc>>,
    #[serde(default)]
    last_change_info_id: Option<String>,
    #[serde(default)]
    managed_by_system: bool,
    #[serde(default)]
    protected: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl RecordSet {
    /// Create an empty record set for a natural key
    pub fn new(zone_id: Uuid, key: RecordKey) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            zone_id,
            name: key.name,
            record_type: key.record_type,
            ttl: None,
            alias_target: None,
            resource_records: None,
            routing_policy: None,
            health_check_id: None,
            set_identifier: key.set_identifier,
            region: None,
            geo_location: None,
            multi_value_answer: None,
            local_fingerprint: None,
            remote_fingerprint: None,
            last_local_modified_at: None,
            last_seen_remote_at: None,
            last_change_info_id: None,
            managed_by_system: false,
            protected: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether a record type is apex infrastructure (SOA, NS)
    pub fn is_infrastructure_type(record_type: &str) -> bool {
        INFRASTRUCTURE_TYPES.contains(&record_type)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn zone_id(&self) -> Uuid {
        self.zone_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn record_type(&self) -> &str {
        &self.record_type
    }

    pub fn set_identifier(&self) -> Option<&str> {
        self.set_identifier.as_deref()
    }

    pub fn key(&self) -> RecordKey {
        RecordKey::new(
            self.name.clone(),
            self.record_type.clone(),
            self.set_identifier.clone(),
        )
    }

    pub fn ttl(&self) -> Option<i64> {
        self.ttl
    }

    pub fn alias_target(&self) -> Option<&AliasTarget> {
        self.alias_target.as_ref()
    }

    /// Resource record values in provider order
    pub fn resource_records(&self) -> Option<&[String]> {
        self.resource_records.as_deref()
    }

    /// Resource record values keyed `record_0`, `record_1`, ...
    pub fn indexed_resource_records(&self) -> Vec<(String, &str)> {
        self.resource_records
            .iter()
            .flatten()
            .enumerate()
            .map(|(i, value)| (format!("record_{}", i), value.as_str()))
            .collect()
    }

    pub fn routing_policy(&self) -> Option<&serde_json::Value> {
        self.routing_policy.as_ref()
    }

    pub fn health_check_id(&self) -> Option<&str> {
        self.health_check_id.as_deref()
    }

    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }

    pub fn geo_location(&self) -> Option<&GeoLocation> {
        self.geo_location.as_ref()
    }

    pub fn multi_value_answer(&self) -> Option<bool> {
        self.multi_value_answer
    }

    pub fn local_fingerprint(&self) -> Option<&str> {
        self.local_fingerprint.as_deref()
    }

    pub fn remote_fingerprint(&self) -> Option<&str> {
        self.remote_fingerprint.as_deref()
    }

    pub fn last_local_modified_at(&self) -> Option<DateTime<Utc>> {
        self.last_local_modified_at
    }

    pub fn last_seen_remote_at(&self) -> Option<DateTime<Utc>> {
        self.last_seen_remote_at
    }

    pub fn last_change_info_id(&self) -> Option<&str> {
        self.last_change_info_id.as_deref()
    }

    pub fn is_managed_by_system(&self) -> bool {
        self.managed_by_system
    }

    pub fn is_protected(&self) -> bool {
        self.protected
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    // Local edits

    pub fn set_ttl(&mut self, ttl: Option<i64>) {
        self.ttl = ttl;
        self.local_edit();
    }

    pub fn set_alias_target(&mut self, alias_target: Option<AliasTarget>) {
        self.alias_target = alias_target;
        self.local_edit();
    }

    pub fn set_resource_records(&mut self, values: Option<Vec<String>>) {
        self.resource_records = values;
        self.local_edit();
    }

    pub fn set_routing_policy(&mut self, policy: Option<serde_json::Value>) {
        self.routing_policy = policy;
        self.local_edit();
    }

    pub fn set_health_check_id(&mut self, health_check_id: Option<String>) {
        self.health_check_id = health_check_id;
        self.local_edit();
    }

    pub fn set_region(&mut self, region: Option<String>) {
        self.region = region;
        self.local_edit();
    }

    pub fn set_geo_location(&mut self, geo_location: Option<GeoLocation>) {
        self.geo_location = geo_location;
        self.local_edit();
    }

    pub fn set_multi_value_answer(&mut self, multi_value_answer: Option<bool>) {
        self.multi_value_answer = multi_value_answer;
        self.local_edit();
    }

    // Bookkeeping

    pub fn set_local_fingerprint(&mut self, fingerprint: Option<String>) {
        self.local_fingerprint = fingerprint;
        self.touch();
    }

    pub fn set_remote_fingerprint(&mut self, fingerprint: Option<String>) {
        self.remote_fingerprint = fingerprint;
        self.touch();
    }

    pub fn set_last_change_info_id(&mut self, change_id: Option<String>) {
        self.last_change_info_id = change_id;
        self.touch();
    }

    pub fn set_managed_by_system(&mut self, managed: bool) {
        self.managed_by_system = managed;
        self.touch();
    }

    pub fn set_protected(&mut self, protected: bool) {
        self.protected = protected;
        self.touch();
    }

    /// Mirror the provider's view of this record
    ///
    /// Alias target and geolocation are only replaced when the provider
    /// reports one, and resource records only when the provider's list is
    /// non-empty. SOA and NS records become system-managed.
    pub fn apply_remote(&mut self, remote: &RemoteRecordSet, now: DateTime<Utc>) {
        self.ttl = remote.ttl;

        if let Some(alias) = &remote.alias_target {
            self.alias_target = Some(alias.clone());
        }

        if !remote.resource_records.is_empty() {
            self.resource_records = Some(remote.resource_records.clone());
        }

        self.health_check_id = remote.health_check_id.clone();
        self.region = remote.region.clone();
        self.multi_value_answer = remote.multi_value_answer;

        if let Some(geo) = &remote.geo_location {
            self.geo_location = Some(geo.clone());
        }

        self.last_seen_remote_at = Some(now);

        if Self::is_infrastructure_type(&self.record_type) {
            self.managed_by_system = true;
        }

        self.updated_at = now;
    }

    /// Record that the local state has reached the provider
    pub fn mark_pushed(&mut self, now: DateTime<Utc>) {
        self.remote_fingerprint = self.local_fingerprint.clone();
        self.last_seen_remote_at = Some(now);
        self.updated_at = now;
    }

    /// Give up the pending local edit in favour of the provider's state
    ///
    /// The DNS content is replaced by `remote` (values the provider does not
    /// report are cleared) and both fingerprints are set to its hash.
    pub fn discard_local(&mut self, remote: &RemoteRecordSet, now: DateTime<Utc>) {
        self.replace_content(remote, now);
        self.mark_in_sync();
    }

    /// Take the current content as confirmed on both sides
    ///
    /// Pull calls this for record sets it creates, so later local edits have
    /// a remote baseline to diverge from.
    pub fn mark_in_sync(&mut self) {
        let fingerprint = content_fingerprint(self);
        self.local_fingerprint = Some(fingerprint.clone());
        self.remote_fingerprint = Some(fingerprint);
    }

    /// Fingerprint this record would have with exactly `remote`'s content
    pub fn remote_content_fingerprint(&self, remote: &RemoteRecordSet) -> String {
        let mut theirs = self.clone();
        theirs.replace_content(remote, self.updated_at);
        content_fingerprint(&theirs)
    }

    fn replace_content(&mut self, remote: &RemoteRecordSet, now: DateTime<Utc>) {
        self.alias_target = None;
        self.resource_records = None;
        self.geo_location = None;
        self.apply_remote(remote, now);
    }

    fn local_edit(&mut self) {
        let now = Utc::now();
        self.local_fingerprint = Some(content_fingerprint(self));
        self.last_local_modified_at = Some(now);
        self.updated_at = now;
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

impl std::fmt::Display for RecordSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.name, self.record_type)
    }
}

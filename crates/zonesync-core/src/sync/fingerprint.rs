//! Fingerprint comparison
//!
//! A fingerprint is an opaque content hash. Equal local and remote
//! fingerprints mean the record has no pending local change.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::model::{AliasTarget, GeoLocation, RecordSet};

/// Whether the local state diverges from the last confirmed remote state
///
/// Two absent fingerprints are equal; one absent and one present are not.
pub fn has_local_changes(local: Option<&str>, remote: Option<&str>) -> bool {
    local != remote
}

/// Record-level shorthand for [`has_local_changes`]
pub fn record_has_local_changes(record: &RecordSet) -> bool {
    has_local_changes(record.local_fingerprint(), record.remote_fingerprint())
}

/// The content that goes into a record fingerprint, in a fixed field order
#[derive(Serialize)]
struct FingerprintContent<'a> {
    name: &'a str,
    record_type: &'a str,
    set_identifier: Option<&'a str>,
    ttl: Option<i64>,
    alias_target: Option<&'a AliasTarget>,
    resource_records: Option<&'a [String]>,
    routing_policy: Option<&'a serde_json::Value>,
    health_check_id: Option<&'a str>,
    region: Option<&'a str>,
    geo_location: Option<&'a GeoLocation>,
    multi_value_answer: Option<bool>,
}

/// SHA-256 (hex) of a record's DNS content
///
/// Bookkeeping fields (timestamps, fingerprints, flags) do not contribute.
pub fn content_fingerprint(record: &RecordSet) -> String {
    let content = FingerprintContent {
        name: record.name(),
        record_type: record.record_type(),
        set_identifier: record.set_identifier(),
        ttl: record.ttl(),
        alias_target: record.alias_target(),
        resource_records: record.resource_records(),
        routing_policy: record.routing_policy(),
        health_check_id: record.health_check_id(),
        region: record.region(),
        geo_location: record.geo_location(),
        multi_value_answer: record.multi_value_answer(),
    };

    // Serializing borrowed strings, numbers and maps of strings cannot fail
    let bytes = serde_json::to_vec(&content).unwrap_or_default();
    hex::encode(Sha256::digest(&bytes))
}

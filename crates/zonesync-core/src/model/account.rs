use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use super::CredentialKind;

/// Provider account that owns hosted zones
///
/// The identity (`id`) never changes. Every configuration setter stamps
/// `updated_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    id: Uuid,
    name: String,
    #[serde(default)]
    account_id: Option<String>,
    #[serde(default = "default_partition")]
    partition: String,
    #[serde(default = "default_region")]
    default_region: String,
    #[serde(default)]
    endpoint: Option<String>,
    #[serde(default)]
    credentials: CredentialKind,
    #[serde(default)]
    tags: Option<BTreeMap<String, String>>,
    #[serde(default = "default_enabled")]
    enabled: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn default_partition() -> String {
    "aws".to_string()
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_enabled() -> bool {
    true
}

impl Account {
    /// Create a new enabled account with default partition and region
    pub fn new(name: impl Into<String>, credentials: CredentialKind) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            account_id: None,
            partition: default_partition(),
            default_region: default_region(),
            endpoint: None,
            credentials,
            tags: None,
            enabled: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
        self.touch();
    }

    /// Numeric provider account id, when known
    pub fn account_id(&self) -> Option<&str> {
        self.account_id.as_deref()
    }

    pub fn set_account_id(&mut self, account_id: Option<String>) {
        self.account_id = account_id;
        self.touch();
    }

    pub fn partition(&self) -> &str {
        &self.partition
    }

    pub fn set_partition(&mut self, partition: impl Into<String>) {
        self.partition = partition.into();
        self.touch();
    }

    pub fn default_region(&self) -> &str {
        &self.default_region
    }

    pub fn set_default_region(&mut self, region: impl Into<String>) {
        self.default_region = region.into();
        self.touch();
    }

    /// Endpoint override (e.g. a local API emulator)
    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }

    pub fn set_endpoint(&mut self, endpoint: Option<String>) {
        self.endpoint = endpoint;
        self.touch();
    }

    pub fn credentials(&self) -> &CredentialKind {
        &self.credentials
    }

    pub fn set_credentials(&mut self, credentials: CredentialKind) {
        self.credentials = credentials;
        self.touch();
    }

    pub fn tags(&self) -> Option<&BTreeMap<String, String>> {
        self.tags.as_ref()
    }

    pub fn set_tags(&mut self, tags: Option<BTreeMap<String, String>>) {
        self.tags = tags;
        self.touch();
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        self.touch();
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

impl std::fmt::Display for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.account_id.as_deref() {
            Some(account_id) if !account_id.is_empty() => {
                write!(f, "{} ({})", self.name, account_id)
            }
            _ => f.write_str(&self.name),
        }
    }
}

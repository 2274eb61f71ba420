// # Remote DNS Client Trait
//
// Read access to a DNS hosting provider: hosted zones and their record sets.
//
// ## Implementations
//
// - Route 53: `zonesync-provider-route53` crate
//
// ## Usage
//
// ```rust,ignore
// use zonesync_core::RemoteDnsClient;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let client = /* RemoteDnsClient implementation */;
//
//     for zone in client.list_hosted_zones().await? {
//         let records = client.list_resource_record_sets(zone.normalized_id()).await?;
//         println!("{}: {} record sets", zone.name, records.len());
//     }
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::model::{Account, AliasTarget, GeoLocation};

/// Prefix the provider puts in front of hosted zone ids
pub const HOSTED_ZONE_PREFIX: &str = "/hostedzone/";

/// Hosted zone as the provider describes it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteHostedZone {
    /// Zone id, possibly prefixed with `/hostedzone/`
    pub id: String,
    pub name: String,
    pub caller_reference: Option<String>,
    pub config: Option<RemoteZoneConfig>,
    pub resource_record_set_count: Option<u64>,
}

impl RemoteHostedZone {
    /// Zone id without the `/hostedzone/` prefix
    pub fn normalized_id(&self) -> &str {
        self.id
            .strip_prefix(HOSTED_ZONE_PREFIX)
            .unwrap_or(&self.id)
    }
}

/// Zone configuration block
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteZoneConfig {
    pub comment: Option<String>,
    pub private_zone: bool,
}

/// Resource record set as the provider describes it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteRecordSet {
    pub name: String,
    pub record_type: String,
    pub set_identifier: Option<String>,
    pub ttl: Option<i64>,
    pub alias_target: Option<AliasTarget>,
    /// Record values in provider order
    pub resource_records: Vec<String>,
    pub health_check_id: Option<String>,
    pub region: Option<String>,
    pub geo_location: Option<GeoLocation>,
    pub multi_value_answer: Option<bool>,
}

/// Trait for remote DNS clients
///
/// Implementations follow the provider's pagination and return complete
/// listings in provider order. They must not retry; reconcilers decide what
/// a failure means.
#[async_trait]
pub trait RemoteDnsClient: Send + Sync {
    /// List every hosted zone visible to the account
    async fn list_hosted_zones(&self) -> Result<Vec<RemoteHostedZone>, crate::Error>;

    /// List every record set of one zone
    ///
    /// # Parameters
    ///
    /// - `zone_id`: Zone id without the `/hostedzone/` prefix
    async fn list_resource_record_sets(
        &self,
        zone_id: &str,
    ) -> Result<Vec<RemoteRecordSet>, crate::Error>;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}

/// Builds a client from an account's credential descriptor
///
/// This is the only place credentials turn into a session. Descriptors the
/// factory cannot honour must fail with
/// [`Error::UnsupportedCredentials`](crate::Error::UnsupportedCredentials).
pub trait RemoteClientFactory: Send + Sync {
    fn create(&self, account: &Account) -> Result<Arc<dyn RemoteDnsClient>, crate::Error>;
}

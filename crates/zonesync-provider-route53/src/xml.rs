//! Route 53 XML response bodies
//!
//! Only the elements the client reads are modelled; everything else in a
//! response is ignored.

use serde::Deserialize;

use zonesync_core::model::{AliasTarget, GeoLocation};
use zonesync_core::traits::{RemoteHostedZone, RemoteRecordSet, RemoteZoneConfig};
use zonesync_core::{Error, Result};

fn parse<'de, T: Deserialize<'de>>(body: &'de str, what: &str) -> Result<T> {
    quick_xml::de::from_str(body)
        .map_err(|e| Error::provider("route53", format!("Failed to parse {}: {}", what, e)))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// `ListHostedZonesResponse`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ListHostedZonesResponse {
    #[serde(default)]
    hosted_zones: HostedZones,
    #[serde(default)]
    is_truncated: bool,
    #[serde(default)]
    next_marker: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct HostedZones {
    #[serde(rename = "HostedZone", default)]
    items: Vec<HostedZone>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct HostedZone {
    id: String,
    name: String,
    #[serde(default)]
    caller_reference: Option<String>,
    #[serde(default)]
    config: Option<HostedZoneConfig>,
    #[serde(default)]
    resource_record_set_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct HostedZoneConfig {
    #[serde(default)]
    comment: Option<String>,
    #[serde(default)]
    private_zone: bool,
}

impl ListHostedZonesResponse {
    pub fn parse(body: &str) -> Result<Self> {
        parse(body, "hosted zone listing")
    }

    /// Marker for the next page, if the listing is truncated
    pub fn next_page(&self) -> Option<String> {
        if self.is_truncated {
            non_empty(self.next_marker.clone())
        } else {
            None
        }
    }

    pub fn into_zones(self) -> Vec<RemoteHostedZone> {
        self.hosted_zones
            .items
            .into_iter()
            .map(|z| RemoteHostedZone {
                id: z.id,
                name: z.name,
                caller_reference: non_empty(z.caller_reference),
                config: z.config.map(|c| RemoteZoneConfig {
                    comment: non_empty(c.comment),
                    private_zone: c.private_zone,
                }),
                resource_record_set_count: z.resource_record_set_count,
            })
            .collect()
    }
}

/// `ListResourceRecordSetsResponse`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ListResourceRecordSetsResponse {
    #[serde(default)]
    resource_record_sets: ResourceRecordSets,
    #[serde(default)]
    is_truncated: bool,
    #[serde(default)]
    next_record_name: Option<String>,
    #[serde(default)]
    next_record_type: Option<String>,
    #[serde(default)]
    next_record_identifier: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ResourceRecordSets {
    #[serde(rename = "ResourceRecordSet", default)]
    items: Vec<ResourceRecordSet>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ResourceRecordSet {
    name: String,
    #[serde(rename = "Type")]
    record_type: String,
    #[serde(default)]
    set_identifier: Option<String>,
    #[serde(rename = "TTL", default)]
    ttl: Option<i64>,
    #[serde(default)]
    resource_records: Option<ResourceRecords>,
    #[serde(default)]
    alias_target: Option<XmlAliasTarget>,
    #[serde(default)]
    health_check_id: Option<String>,
    #[serde(default)]
    region: Option<String>,
    #[serde(default)]
    geo_location: Option<XmlGeoLocation>,
    #[serde(default)]
    multi_value_answer: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct ResourceRecords {
    #[serde(rename = "ResourceRecord", default)]
    items: Vec<ResourceRecord>,
}

#[derive(Debug, Deserialize)]
struct ResourceRecord {
    #[serde(rename = "Value")]
    value: String,
}

#[derive(Debug, Deserialize)]
struct XmlAliasTarget {
    #[serde(rename = "HostedZoneId")]
    hosted_zone_id: String,
    #[serde(rename = "DNSName")]
    dns_name: String,
    #[serde(rename = "EvaluateTargetHealth", default)]
    evaluate_target_health: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct XmlGeoLocation {
    #[serde(default)]
    continent_code: Option<String>,
    #[serde(default)]
    country_code: Option<String>,
    #[serde(default)]
    subdivision_code: Option<String>,
}

/// Start of the next record page: name, type and set identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordPage {
    pub name: String,
    pub record_type: Option<String>,
    pub identifier: Option<String>,
}

impl ListResourceRecordSetsResponse {
    pub fn parse(body: &str) -> Result<Self> {
        parse(body, "record set listing")
    }

    pub fn next_page(&self) -> Option<RecordPage> {
        if !self.is_truncated {
            return None;
        }
        non_empty(self.next_record_name.clone()).map(|name| RecordPage {
            name,
            record_type: non_empty(self.next_record_type.clone()),
            identifier: non_empty(self.next_record_identifier.clone()),
        })
    }

    pub fn into_record_sets(self) -> Vec<RemoteRecordSet> {
        self.resource_record_sets
            .items
            .into_iter()
            .map(|r| RemoteRecordSet {
                name: r.name,
                record_type: r.record_type,
                set_identifier: non_empty(r.set_identifier),
                ttl: r.ttl,
                alias_target: r.alias_target.map(|a| AliasTarget {
                    dns_name: a.dns_name,
                    evaluate_target_health: a.evaluate_target_health,
                    hosted_zone_id: a.hosted_zone_id,
                }),
                resource_records: r
                    .resource_records
                    .map(|rr| rr.items.into_iter().map(|v| v.value).collect())
                    .unwrap_or_default(),
                health_check_id: non_empty(r.health_check_id),
                region: non_empty(r.region),
                geo_location: r.geo_location.map(|g| GeoLocation {
                    continent_code: non_empty(g.continent_code),
                    country_code: non_empty(g.country_code),
                    subdivision_code: non_empty(g.subdivision_code),
                }),
                multi_value_answer: r.multi_value_answer,
            })
            .collect()
    }
}

/// `ErrorResponse`
#[derive(Debug, Deserialize)]
pub struct ErrorResponse {
    #[serde(rename = "Error")]
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ErrorDetail {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

impl ErrorResponse {
    /// Best-effort parse; `None` when the body is not an error document
    pub fn parse(body: &str) -> Option<Self> {
        quick_xml::de::from_str(body).ok()
    }

    pub fn code(&self) -> &str {
        &self.error.code
    }

    pub fn message(&self) -> &str {
        &self.error.message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ZONES: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ListHostedZonesResponse xmlns="https://route53.amazonaws.com/doc/2013-04-01/">
  <HostedZones>
    <HostedZone>
      <Id>/hostedzone/Z1D633PJN98FT9</Id>
      <Name>example.com.</Name>
      <CallerReference>2017-03-01T11:22:14Z</CallerReference>
      <Config>
        <Comment>Primary zone</Comment>
        <PrivateZone>false</PrivateZone>
      </Config>
      <ResourceRecordSetCount>17</ResourceRecordSetCount>
    </HostedZone>
    <HostedZone>
      <Id>/hostedzone/Z2682N5HXP0BZ4</Id>
      <Name>internal.example.</Name>
      <CallerReference>ref-2</CallerReference>
      <Config>
        <PrivateZone>true</PrivateZone>
      </Config>
      <ResourceRecordSetCount>4</ResourceRecordSetCount>
    </HostedZone>
  </HostedZones>
  <IsTruncated>true</IsTruncated>
  <NextMarker>Z3M3LMPEXAMPLE</NextMarker>
  <MaxItems>2</MaxItems>
</ListHostedZonesResponse>"#;

    const RECORDS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ListResourceRecordSetsResponse xmlns="https://route53.amazonaws.com/doc/2013-04-01/">
  <ResourceRecordSets>
    <ResourceRecordSet>
      <Name>example.com.</Name>
      <Type>NS</Type>
      <TTL>172800</TTL>
      <ResourceRecords>
        <ResourceRecord><Value>ns-2048.awsdns-64.com.</Value></ResourceRecord>
        <ResourceRecord><Value>ns-2049.awsdns-65.net.</Value></ResourceRecord>
      </ResourceRecords>
    </ResourceRecordSet>
    <ResourceRecordSet>
      <Name>api.example.com.</Name>
      <Type>A</Type>
      <SetIdentifier>eu</SetIdentifier>
      <GeoLocation>
        <ContinentCode>EU</ContinentCode>
      </GeoLocation>
      <AliasTarget>
        <HostedZoneId>Z2FDTNDATAQYW2</HostedZoneId>
        <DNSName>d111111abcdef8.cloudfront.net.</DNSName>
        <EvaluateTargetHealth>true</EvaluateTargetHealth>
      </AliasTarget>
    </ResourceRecordSet>
  </ResourceRecordSets>
  <IsTruncated>true</IsTruncated>
  <NextRecordName>www.example.com.</NextRecordName>
  <NextRecordType>A</NextRecordType>
  <MaxItems>2</MaxItems>
</ListResourceRecordSetsResponse>"#;

    #[test]
    fn parses_hosted_zone_listing() {
        let response = ListHostedZonesResponse::parse(ZONES).unwrap();
        assert_eq!(response.next_page().as_deref(), Some("Z3M3LMPEXAMPLE"));

        let zones = response.into_zones();
        assert_eq!(zones.len(), 2);
        assert_eq!(zones[0].id, "/hostedzone/Z1D633PJN98FT9");
        assert_eq!(zones[0].normalized_id(), "Z1D633PJN98FT9");
        assert_eq!(zones[0].resource_record_set_count, Some(17));
        let config = zones[0].config.as_ref().unwrap();
        assert_eq!(config.comment.as_deref(), Some("Primary zone"));
        assert!(!config.private_zone);
        assert!(zones[1].config.as_ref().unwrap().private_zone);
        assert_eq!(zones[1].config.as_ref().unwrap().comment, None);
    }

    #[test]
    fn last_zone_page_has_no_marker() {
        let body = r#"<ListHostedZonesResponse>
  <HostedZones></HostedZones>
  <IsTruncated>false</IsTruncated>
  <MaxItems>100</MaxItems>
</ListHostedZonesResponse>"#;
        let response = ListHostedZonesResponse::parse(body).unwrap();
        assert_eq!(response.next_page(), None);
        assert!(response.into_zones().is_empty());
    }

    #[test]
    fn parses_record_listing() {
        let response = ListResourceRecordSetsResponse::parse(RECORDS).unwrap();
        assert_eq!(
            response.next_page(),
            Some(RecordPage {
                name: "www.example.com.".to_string(),
                record_type: Some("A".to_string()),
                identifier: None,
            })
        );

        let records = response.into_record_sets();
        assert_eq!(records.len(), 2);

        assert_eq!(records[0].record_type, "NS");
        assert_eq!(records[0].ttl, Some(172800));
        assert_eq!(
            records[0].resource_records,
            vec!["ns-2048.awsdns-64.com.", "ns-2049.awsdns-65.net."]
        );

        let alias = &records[1];
        assert_eq!(alias.set_identifier.as_deref(), Some("eu"));
        assert_eq!(alias.ttl, None);
        assert!(alias.resource_records.is_empty());
        let target = alias.alias_target.as_ref().unwrap();
        assert_eq!(target.dns_name, "d111111abcdef8.cloudfront.net.");
        assert!(target.evaluate_target_health);
        assert_eq!(
            alias.geo_location.as_ref().unwrap().continent_code.as_deref(),
            Some("EU")
        );
    }

    #[test]
    fn parses_error_document() {
        let body = r#"<?xml version="1.0"?>
<ErrorResponse xmlns="https://route53.amazonaws.com/doc/2013-04-01/">
  <Error>
    <Type>Sender</Type>
    <Code>Throttling</Code>
    <Message>Rate exceeded</Message>
  </Error>
  <RequestId>d8d6b2b5-6c83-4a6d-9a7d-example</RequestId>
</ErrorResponse>"#;
        let error = ErrorResponse::parse(body).unwrap();
        assert_eq!(error.code(), "Throttling");
        assert_eq!(error.message(), "Rate exceeded");
        assert!(ErrorResponse::parse("not xml at all").is_none());
    }

    #[test]
    fn malformed_body_is_a_provider_error() {
        let err = ListHostedZonesResponse::parse("<ListHostedZonesResponse><HostedZones>")
            .unwrap_err();
        assert!(matches!(err, Error::Provider { .. }));
    }
}

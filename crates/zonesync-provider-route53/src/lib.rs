// # Route 53 Remote DNS Client
//
// Read-only Route 53 client for the zonesync reconcilers.
//
// ## Scope
//
// - Lists hosted zones and record sets, following pagination to the end
// - Signs every request with SigV4 (service `route53`)
// - Maps HTTP failures onto `zonesync_core::Error`
// - No retry, no backoff and no caching: a failed call is reported once and
//   the reconcilers decide what to do with it
//
// ## Partitions
//
// | partition    | default endpoint                       | signing region   |
// |--------------|----------------------------------------|------------------|
// | `aws`        | `https://route53.amazonaws.com`        | `us-east-1`      |
// | `aws-cn`     | `https://route53.amazonaws.com.cn`     | `cn-northwest-1` |
// | `aws-us-gov` | `https://route53.us-gov.amazonaws.com` | `us-gov-west-1`  |
//
// An account endpoint overrides the default endpoint but not the signing
// region.
//
// ## Security Requirements
//
// - Secret keys and session tokens NEVER appear in logs or Debug output
// - Credential sources that need a token exchange fail fast
//
// ## API Reference
//
// - List hosted zones: GET `/2013-04-01/hostedzone?marker=...`
// - List record sets: GET `/2013-04-01/hostedzone/{id}/rrset?name=...&type=...&identifier=...`

pub mod credentials;
pub mod sigv4;
pub mod xml;

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

use zonesync_core::model::Account;
use zonesync_core::traits::remote_client::HOSTED_ZONE_PREFIX;
use zonesync_core::traits::{
    RemoteClientFactory, RemoteDnsClient, RemoteHostedZone, RemoteRecordSet,
};
use zonesync_core::{Error, Result};

use credentials::Credentials;
use sigv4::{CanonicalRequest, SigningScope};
use xml::{ErrorResponse, ListHostedZonesResponse, ListResourceRecordSetsResponse};

/// API version prefix of every Route 53 path
const API_VERSION: &str = "2013-04-01";

/// SigV4 service name
const SERVICE: &str = "route53";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Default endpoint and signing region of a partition
pub fn partition_defaults(partition: &str) -> Result<(&'static str, &'static str)> {
    match partition {
        "aws" => Ok(("https://route53.amazonaws.com", "us-east-1")),
        "aws-cn" => Ok(("https://route53.amazonaws.com.cn", "cn-northwest-1")),
        "aws-us-gov" => Ok(("https://route53.us-gov.amazonaws.com", "us-gov-west-1")),
        other => Err(Error::config(format!("Unknown partition: {}", other))),
    }
}

/// Route 53 client for one account
pub struct Route53Client {
    /// ⚠️ NEVER log the secret parts of this value
    credentials: Credentials,

    /// Base URL without trailing slash
    endpoint: String,

    /// `host` header value, signed with every request
    host: String,

    signing_region: &'static str,

    http: reqwest::Client,
}

impl std::fmt::Debug for Route53Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route53Client")
            .field("credentials", &self.credentials)
            .field("endpoint", &self.endpoint)
            .field("signing_region", &self.signing_region)
            .finish()
    }
}

impl Route53Client {
    /// Create a client
    ///
    /// `endpoint` overrides the partition's default endpoint.
    pub fn new(credentials: Credentials, partition: &str, endpoint: Option<&str>) -> Result<Self> {
        let (default_endpoint, signing_region) = partition_defaults(partition)?;
        let endpoint = endpoint
            .filter(|e| !e.is_empty())
            .unwrap_or(default_endpoint)
            .trim_end_matches('/')
            .to_string();

        let url = reqwest::Url::parse(&endpoint)
            .map_err(|e| Error::config(format!("Invalid endpoint {}: {}", endpoint, e)))?;
        let host_name = url
            .host_str()
            .ok_or_else(|| Error::config(format!("Endpoint has no host: {}", endpoint)))?;
        let host = match url.port() {
            Some(port) => format!("{}:{}", host_name, port),
            None => host_name.to_string(),
        };

        let http = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::provider(SERVICE, format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            credentials,
            endpoint,
            host,
            signing_region,
            http,
        })
    }

    /// Create a client from an account's credentials, partition and endpoint
    pub fn for_account(account: &Account) -> Result<Self> {
        let credentials = credentials::resolve(account.credentials())?;
        Self::new(credentials, account.partition(), account.endpoint())
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn signing_region(&self) -> &str {
        self.signing_region
    }

    /// Signed GET returning the response body
    async fn get(&self, path: &str, query: &[(String, String)]) -> Result<String> {
        let now = Utc::now();
        let amz_date = sigv4::amz_date(now);

        let mut headers = vec![
            ("host".to_string(), self.host.clone()),
            ("x-amz-date".to_string(), amz_date.clone()),
        ];
        if let Some(token) = self.credentials.session_token() {
            headers.push(("x-amz-security-token".to_string(), token.to_string()));
        }

        let authorization = sigv4::authorization(
            &self.credentials,
            SigningScope {
                region: self.signing_region,
                service: SERVICE,
            },
            now,
            &CanonicalRequest {
                method: "GET",
                path,
                query,
                headers: &headers,
                payload: b"",
            },
        )?;

        let query_string = sigv4::canonical_query(query);
        let url = if query_string.is_empty() {
            format!("{}{}", self.endpoint, path)
        } else {
            format!("{}{}?{}", self.endpoint, path, query_string)
        };

        tracing::debug!("GET {}", url);

        let mut request = self
            .http
            .get(&url)
            .header("x-amz-date", amz_date)
            .header("authorization", authorization);
        if let Some(token) = self.credentials.session_token() {
            request = request.header("x-amz-security-token", token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::provider(SERVICE, format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::provider(SERVICE, format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(map_status(status.as_u16(), &body));
        }
        Ok(body)
    }
}

/// Map a failed response onto the error taxonomy
pub fn map_status(status: u16, body: &str) -> Error {
    let detail = ErrorResponse::parse(body);
    let (code, message) = detail
        .as_ref()
        .map(|d| (d.code(), d.message()))
        .unwrap_or(("", body));

    let throttled = matches!(
        code,
        "Throttling" | "ThrottlingException" | "PriorRequestNotComplete"
    );

    match status {
        401 | 403 => Error::auth(format!(
            "Invalid credentials or insufficient permissions. Status: {} {}",
            status, code
        )),
        404 => Error::not_found(format!("Route 53 resource not found: {} {}", code, message)),
        429 => Error::rate_limited(format!("Rate limit exceeded. Status: {}", status)),
        400 if throttled => Error::rate_limited(format!("{}: {}", code, message)),
        500..=599 => Error::provider(
            SERVICE,
            format!("Route 53 server error (transient): {} - {}", status, message),
        ),
        _ => Error::provider(
            SERVICE,
            format!("Request failed: {} - {} {}", status, code, message),
        ),
    }
}

fn strip_zone_prefix(zone_id: &str) -> &str {
    zone_id.strip_prefix(HOSTED_ZONE_PREFIX).unwrap_or(zone_id)
}

#[async_trait]
impl RemoteDnsClient for Route53Client {
    async fn list_hosted_zones(&self) -> Result<Vec<RemoteHostedZone>> {
        let path = format!("/{}/hostedzone", API_VERSION);
        let mut zones = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            let query: Vec<(String, String)> = marker
                .iter()
                .map(|m| ("marker".to_string(), m.clone()))
                .collect();

            let body = self.get(&path, &query).await?;
            let page = ListHostedZonesResponse::parse(&body)?;
            let next = page.next_page();
            zones.extend(page.into_zones());

            match next {
                Some(next) if marker.as_deref() != Some(next.as_str()) => marker = Some(next),
                Some(_) => {
                    tracing::warn!("Route 53 returned the same zone marker twice; stopping");
                    break;
                }
                None => break,
            }
        }

        tracing::debug!(zones = zones.len(), "Listed hosted zones");
        Ok(zones)
    }

    async fn list_resource_record_sets(&self, zone_id: &str) -> Result<Vec<RemoteRecordSet>> {
        let zone_id = strip_zone_prefix(zone_id);
        if zone_id.is_empty() {
            return Err(Error::invalid_input("Hosted zone id cannot be empty"));
        }

        let path = format!("/{}/hostedzone/{}/rrset", API_VERSION, zone_id);
        let mut records = Vec::new();
        let mut start: Option<xml::RecordPage> = None;

        loop {
            let mut query = Vec::new();
            if let Some(page) = &start {
                query.push(("name".to_string(), page.name.clone()));
                if let Some(record_type) = &page.record_type {
                    query.push(("type".to_string(), record_type.clone()));
                }
                if let Some(identifier) = &page.identifier {
                    query.push(("identifier".to_string(), identifier.clone()));
                }
            }

            let body = self.get(&path, &query).await?;
            let response = ListResourceRecordSetsResponse::parse(&body)?;
            let next = response.next_page();
            records.extend(response.into_record_sets());

            match next {
                Some(next) if start.as_ref() != Some(&next) => start = Some(next),
                Some(_) => {
                    tracing::warn!(zone_id, "Route 53 returned the same record page twice; stopping");
                    break;
                }
                None => break,
            }
        }

        tracing::debug!(zone_id, records = records.len(), "Listed record sets");
        Ok(records)
    }

    fn provider_name(&self) -> &'static str {
        "route53"
    }
}

/// Factory building one [`Route53Client`] per account
#[derive(Debug, Default, Clone, Copy)]
pub struct Route53ClientFactory;

impl RemoteClientFactory for Route53ClientFactory {
    fn create(&self, account: &Account) -> Result<Arc<dyn RemoteDnsClient>> {
        account.credentials().validate()?;
        let client = Route53Client::for_account(account)?;
        tracing::debug!(
            account = %account,
            credentials = account.credentials().type_name(),
            endpoint = %client.endpoint(),
            "Created Route 53 client"
        );
        Ok(Arc::new(client))
    }
}

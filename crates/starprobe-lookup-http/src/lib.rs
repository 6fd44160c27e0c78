// # HTTP ISP Lookup
//
// This crate provides the ip-api.com style ISP lookup for starprobe.
//
// ## Contract
//
// - Request: `GET {base_url}/{address}` (e.g. `http://ip-api.com/json/203.0.113.9`).
//   Literals that do not parse as an IP address are rejected before any
//   request is made.
// - Success: a JSON object with at least `isp`, `org` and `as`
//   (`as` is formatted "AS<number> <name>")
// - Everything else is an error: transport failures, timeouts, non-2xx
//   statuses, bodies that are not a JSON object, and in-band failures
//   (`"status": "fail"`, which ip-api returns for private and reserved ranges)
//
// Errors are reported, never papered over. The classifier in
// `starprobe-core` turns them into the "Unknown" sentinel.

use starprobe_core::config::{DEFAULT_LOOKUP_TIMEOUT_MS, LookupConfig};
use starprobe_core::traits::{IspLookup, IspLookupFactory, IspLookupResult};
use starprobe_core::{ClientAddress, Error, LookupRegistry, Result};

use serde::Deserialize;
use std::net::IpAddr;
use std::time::Duration;
use tracing::debug;

/// Provider name used in logs and errors
const PROVIDER: &str = "ip_api";

/// The fields of an ip-api response this crate reads
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct IpApiResponse {
    /// "success" or "fail"
    status: Option<String>,
    /// Failure reason when `status` is "fail"
    message: Option<String>,
    isp: Option<String>,
    org: Option<String>,
    #[serde(rename = "as")]
    asn: Option<String>,
}

/// HTTP-based ISP lookup
#[derive(Debug, Clone)]
pub struct IpApiLookup {
    /// Base URL; the address is appended as the last path segment
    base_url: String,

    /// Per-request timeout
    timeout: Duration,

    /// HTTP client
    client: reqwest::Client,
}

impl IpApiLookup {
    /// Create a lookup with the default 3 second timeout
    ///
    /// # Parameters
    ///
    /// - `base_url`: e.g. "http://ip-api.com/json"
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_timeout(base_url, Duration::from_millis(DEFAULT_LOOKUP_TIMEOUT_MS))
    }

    /// Create a lookup with a custom timeout
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            base_url: base_url.into(),
            timeout,
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
        }
    }

    /// The configured request timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// URL queried for `ip`
    fn url_for(&self, ip: IpAddr) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), ip)
    }
}

/// Turn a response document into lookup data
///
/// Missing `isp`/`org`/`as` fields become empty strings.
fn parse_response(raw: serde_json::Value) -> Result<IspLookupResult> {
    if !raw.is_object() {
        return Err(Error::provider(PROVIDER, format!("Expected JSON object, got: {}", raw)));
    }

    let response: IpApiResponse = serde_json::from_value(raw.clone())
        .map_err(|e| Error::provider(PROVIDER, format!("Malformed response: {}", e)))?;

    if response.status.as_deref() == Some("fail") {
        return Err(Error::provider(
            PROVIDER,
            format!(
                "Lookup failed: {}",
                response.message.as_deref().unwrap_or("no reason given")
            ),
        ));
    }

    Ok(IspLookupResult::new(
        response.isp.unwrap_or_default(),
        response.org.unwrap_or_default(),
        response.asn.unwrap_or_default(),
    )
    .with_raw(raw))
}

#[async_trait::async_trait]
impl IspLookup for IpApiLookup {
    async fn lookup(&self, address: &ClientAddress) -> Result<IspLookupResult> {
        let ip = address.ip().ok_or_else(|| {
            Error::invalid_input(format!("Not an IP address: {:?}", address.as_str()))
        })?;
        let url = self.url_for(ip);
        debug!(client_ip = %ip, "Querying ISP lookup service");

        let response = self.client.get(&url).send().await.map_err(|e| {
            if e.is_timeout() {
                Error::Timeout(self.timeout)
            } else {
                Error::provider(PROVIDER, format!("Request failed: {}", e))
            }
        })?;

        if !response.status().is_success() {
            return Err(Error::http(format!("HTTP error: {}", response.status())));
        }

        let raw: serde_json::Value = response
            .json()
            .await
            .map_err(|e| Error::provider(PROVIDER, format!("Failed to read response: {}", e)))?;

        parse_response(raw)
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}

/// Factory for creating HTTP ISP lookups
pub struct IpApiFactory;

impl IspLookupFactory for IpApiFactory {
    fn create(&self, config: &LookupConfig) -> Result<Box<dyn IspLookup>> {
        match config {
            LookupConfig::IpApi {
                base_url,
                timeout_ms,
            } => Ok(Box::new(IpApiLookup::with_timeout(
                base_url.clone(),
                Duration::from_millis(*timeout_ms),
            ))),
            _ => Err(Error::config("Invalid config for ip-api lookup")),
        }
    }
}

/// Register the HTTP lookup with a registry
pub fn register(registry: &LookupRegistry) {
    registry.register_lookup(PROVIDER, Box::new(IpApiFactory));
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_factory_creation() {
        let factory = IpApiFactory;

        let config = LookupConfig::IpApi {
            base_url: "http://ip-api.com/json".to_string(),
            timeout_ms: 3000,
        };

        let lookup = factory.create(&config);
        assert!(lookup.is_ok());
        assert_eq!(lookup.unwrap().provider_name(), "ip_api");
    }

    #[test]
    fn test_factory_rejects_other_configs() {
        let config = LookupConfig::Custom {
            factory: "other".to_string(),
            config: json!({}),
        };
        assert!(IpApiFactory.create(&config).is_err());
    }

    #[test]
    fn test_register() {
        let registry = LookupRegistry::new();
        register(&registry);
        assert!(registry.has_lookup("ip_api"));
        assert!(registry.create_lookup(&LookupConfig::default()).is_ok());
    }

    #[test]
    fn test_url_building() {
        let lookup = IpApiLookup::new("http://ip-api.com/json/");
        assert_eq!(
            lookup.url_for(IpAddr::from([203, 0, 113, 9])),
            "http://ip-api.com/json/203.0.113.9"
        );
        assert_eq!(
            lookup.url_for("2001:db8::1".parse().unwrap()),
            "http://ip-api.com/json/2001:db8::1"
        );
        assert_eq!(lookup.timeout(), Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_non_address_literal_rejected() {
        // Nothing listens on the discard port; a request would fail differently
        let lookup = IpApiLookup::new("http://127.0.0.1:9/json");
        let result = lookup.lookup(&ClientAddress::new("1.2.3.4/../x?y=")).await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_parse_success() {
        let raw = json!({
            "status": "success",
            "isp": "SpaceX Services, Inc.",
            "org": "Starlink",
            "as": "AS14593 Space Exploration Technologies Corporation",
            "query": "98.97.0.1"
        });

        let result = parse_response(raw.clone()).unwrap();
        assert_eq!(result.isp_name, "SpaceX Services, Inc.");
        assert_eq!(result.organization, "Starlink");
        assert!(result.asn_descriptor.starts_with("AS14593"));
        assert_eq!(result.raw, raw);
    }

    #[test]
    fn test_parse_missing_fields_are_empty() {
        let result = parse_response(json!({ "org": "SpaceX Starlink Services" })).unwrap();
        assert_eq!(result.isp_name, "");
        assert_eq!(result.organization, "SpaceX Starlink Services");
        assert_eq!(result.asn_descriptor, "");
    }

    #[test]
    fn test_parse_in_band_failure() {
        let raw = json!({ "status": "fail", "message": "private range", "query": "10.0.0.1" });
        assert!(parse_response(raw).is_err());
    }

    #[test]
    fn test_parse_malformed() {
        assert!(parse_response(json!(["not", "an", "object"])).is_err());
        assert!(parse_response(json!("text")).is_err());
        assert!(parse_response(json!({ "isp": 42 })).is_err());
    }
}

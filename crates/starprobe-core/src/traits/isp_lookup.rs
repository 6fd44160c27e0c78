// # ISP Lookup Trait
//
// Defines the interface to the external address -> ISP lookup service.
//
// ## Implementations
//
// - ip-api.com JSON API: `starprobe-lookup-http` crate
// - Caching decorator: [`crate::cache::CachedIspLookup`]
//
// ## Usage
//
// ```rust,ignore
// use starprobe_core::{ClientAddress, IspLookup};
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let lookup = /* IspLookup implementation */;
//
//     let result = lookup.lookup(&ClientAddress::new("203.0.113.9")).await?;
//     println!("isp={} org={} as={}", result.isp_name, result.organization, result.asn_descriptor);
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::address::ClientAddress;

/// Raw fields returned by an ISP lookup
///
/// Every field may be empty; lookups report what the service reported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IspLookupResult {
    /// ISP name (`isp` in ip-api responses)
    pub isp_name: String,

    /// Organization name (`org`)
    pub organization: String,

    /// AS descriptor, formatted "AS<number> <name>" (`as`)
    pub asn_descriptor: String,

    /// The full response document, kept for diagnostics
    pub raw: serde_json::Value,
}

impl IspLookupResult {
    /// Create a lookup result; `raw` is synthesized from the three fields
    pub fn new(
        isp_name: impl Into<String>,
        organization: impl Into<String>,
        asn_descriptor: impl Into<String>,
    ) -> Self {
        let isp_name = isp_name.into();
        let organization = organization.into();
        let asn_descriptor = asn_descriptor.into();
        let raw = serde_json::json!({
            "isp": isp_name,
            "org": organization,
            "as": asn_descriptor,
        });

        Self {
            isp_name,
            organization,
            asn_descriptor,
            raw,
        }
    }

    /// Attach the raw response document
    pub fn with_raw(mut self, raw: serde_json::Value) -> Self {
        self.raw = raw;
        self
    }

    /// The sentinel used whenever no lookup data is available
    pub fn unknown() -> Self {
        Self {
            isp_name: "Unknown".to_string(),
            organization: "Unknown".to_string(),
            asn_descriptor: String::new(),
            raw: serde_json::json!({ "isp": "Unknown", "org": "Unknown" }),
        }
    }
}

/// Trait for ISP lookup implementations
///
/// Implementations must be thread-safe and usable across async tasks.
///
/// # Failure Contract
///
/// Implementations return `Err` for transport failures, timeouts, non-success
/// statuses and malformed bodies. They never substitute data of their own:
/// degrading to "Unknown" is the classifier's job, so callers can tell a
/// real answer from a fallback.
///
/// # Timeouts
///
/// Implementations should enforce their own request timeout. The classifier
/// bounds every call regardless.
#[async_trait]
pub trait IspLookup: Send + Sync {
    /// Look up ISP data for a client address
    ///
    /// # Returns
    ///
    /// - `Ok(IspLookupResult)`: Data reported by the service
    /// - `Err(Error)`: If no usable data could be obtained
    async fn lookup(&self, address: &ClientAddress) -> Result<IspLookupResult, crate::Error>;

    /// Get the lookup provider name (for logging)
    fn provider_name(&self) -> &'static str;
}

/// Helper trait for constructing lookups from configuration
pub trait IspLookupFactory: Send + Sync {
    /// Create an IspLookup instance from configuration
    ///
    /// # Parameters
    ///
    /// - `config`: Configuration specific to this lookup type
    ///
    /// # Returns
    ///
    /// A boxed IspLookup trait object
    fn create(
        &self,
        config: &crate::config::LookupConfig,
    ) -> Result<Box<dyn IspLookup>, crate::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_sentinel() {
        let unknown = IspLookupResult::unknown();
        assert_eq!(unknown.isp_name, "Unknown");
        assert_eq!(unknown.organization, "Unknown");
        assert!(unknown.asn_descriptor.is_empty());
        assert_eq!(unknown.raw["isp"], "Unknown");
    }

    #[test]
    fn test_new_synthesizes_raw() {
        let result = IspLookupResult::new("Comcast", "Comcast Cable", "AS7922 Comcast");
        assert_eq!(result.raw["as"], "AS7922 Comcast");
        assert_eq!(result.raw["org"], "Comcast Cable");
    }
}

//! ISP classifier
//!
//! Resolves a client address to an ISP and decides whether it is Starlink.
//!
//! ## Decision Order
//!
//! 1. Loopback addresses get a fixed development fixture (no network access)
//! 2. Otherwise the configured [`IspLookup`] runs under a hard timeout; any
//!    failure becomes the "Unknown" sentinel
//! 3. The display name is `isp_name`, or `organization` when that is empty
//! 4. Starlink if the display name contains "Starlink" or "SpaceX", or the AS
//!    descriptor contains "14593"
//!
//! ## Known Limitation
//!
//! Matching is a case-sensitive literal substring test. Differently-cased
//! vendor strings are missed, and unrelated names that happen to contain
//! "SpaceX" match.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::address::ClientAddress;
use crate::config::DEFAULT_LOOKUP_TIMEOUT_MS;
use crate::traits::{IspLookup, IspLookupResult};

/// Name fragments that identify Starlink
pub const STARLINK_NAME_MARKERS: &[&str] = &["Starlink", "SpaceX"];

/// SpaceX Services autonomous system number
pub const STARLINK_ASN: &str = "14593";

/// Classification result for one client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkInfo {
    /// Client address the classification applies to
    pub ip: Option<ClientAddress>,

    /// Display ISP name
    pub isp: String,

    /// Whether the Starlink signature matched
    pub is_starlink: bool,

    /// Raw lookup data rendered as text, for humans
    pub details: String,
}

/// Lookup data used for loopback clients
///
/// Shaped like a Starlink response so the whole decision path can be
/// exercised without network access.
pub fn development_fixture(address: &ClientAddress) -> IspLookupResult {
    IspLookupResult::new(
        "Localhost Development",
        "SpaceX Starlink (Mock)",
        "AS14593 SpaceX Starlink",
    )
    .with_raw(serde_json::json!({
        "query": address.as_str(),
        "status": "success",
        "isp": "Localhost Development",
        "org": "SpaceX Starlink (Mock)",
        "as": "AS14593 SpaceX Starlink",
    }))
}

/// Display name: `isp_name`, falling back to `organization` when empty
pub fn display_isp_name(result: &IspLookupResult) -> &str {
    if result.isp_name.is_empty() {
        &result.organization
    } else {
        &result.isp_name
    }
}

/// Apply the Starlink signature to a display name and AS descriptor
///
/// Either condition alone is sufficient.
pub fn matches_starlink_signature(display_name: &str, asn_descriptor: &str) -> bool {
    STARLINK_NAME_MARKERS
        .iter()
        .any(|marker| display_name.contains(marker))
        || asn_descriptor.contains(STARLINK_ASN)
}

/// Derive [`NetworkInfo`] from lookup data
pub fn classify_result(ip: Option<ClientAddress>, result: &IspLookupResult) -> NetworkInfo {
    let isp = display_isp_name(result);
    let is_starlink = matches_starlink_signature(isp, &result.asn_descriptor);

    NetworkInfo {
        ip,
        isp: isp.to_string(),
        is_starlink,
        details: result.raw.to_string(),
    }
}

/// ISP classifier
///
/// Holds no per-request state and can be shared across tasks.
#[derive(Clone)]
pub struct IspClassifier {
    /// External lookup
    lookup: Arc<dyn IspLookup>,

    /// Upper bound on one lookup
    timeout: Duration,
}

impl IspClassifier {
    /// Create a classifier with the default 3 second lookup budget
    pub fn new(lookup: Arc<dyn IspLookup>) -> Self {
        Self::with_timeout(lookup, Duration::from_millis(DEFAULT_LOOKUP_TIMEOUT_MS))
    }

    /// Create a classifier with a custom lookup budget
    pub fn with_timeout(lookup: Arc<dyn IspLookup>, timeout: Duration) -> Self {
        Self { lookup, timeout }
    }

    /// Classify a client
    ///
    /// Never fails: a missing address, lookup error or timeout all produce
    /// the "Unknown" result with `is_starlink == false`.
    pub async fn classify(&self, address: Option<ClientAddress>) -> NetworkInfo {
        let result = match &address {
            Some(addr) => self.resolve(addr).await,
            None => {
                warn!("No client address available; skipping ISP lookup");
                IspLookupResult::unknown()
            }
        };

        let info = classify_result(address, &result);
        debug!(
            isp = %info.isp,
            is_starlink = info.is_starlink,
            "Classified client network"
        );
        info
    }

    /// Lookup data for an address, degraded to "Unknown" on any failure
    async fn resolve(&self, address: &ClientAddress) -> IspLookupResult {
        if address.is_loopback() {
            debug!(client_ip = %address, "Loopback client, using development fixture");
            return development_fixture(address);
        }

        match tokio::time::timeout(self.timeout, self.lookup.lookup(address)).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                warn!(
                    client_ip = %address,
                    provider = self.lookup.provider_name(),
                    "ISP lookup failed: {}",
                    e
                );
                IspLookupResult::unknown()
            }
            Err(_) => {
                warn!(
                    client_ip = %address,
                    provider = self.lookup.provider_name(),
                    "ISP lookup timed out after {:?}",
                    self.timeout
                );
                IspLookupResult::unknown()
            }
        }
    }
}

impl std::fmt::Debug for IspClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IspClassifier")
            .field("lookup", &self.lookup.provider_name())
            .field("timeout", &self.timeout)
            .finish()
    }
}

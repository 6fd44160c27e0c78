//! Client address resolution
//!
//! The service is expected to run behind a reverse proxy, so the first entry
//! of `X-Forwarded-For` wins over the direct peer address.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;

/// Loopback literals that select the development fixture
const LOOPBACK_LITERALS: &[&str] = &["127.0.0.1", "::1"];

/// The caller's public address as seen by the service
///
/// This is a literal taken from request metadata and may not be an address
/// at all. Use [`ClientAddress::ip`] before putting it on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientAddress(String);

impl ClientAddress {
    /// Wrap an address literal
    pub fn new(literal: impl Into<String>) -> Self {
        Self(literal.into())
    }

    /// The address literal
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The literal parsed as an IP address, if it is one
    pub fn ip(&self) -> Option<IpAddr> {
        self.0.trim().parse().ok()
    }

    /// Whether this is one of the local development addresses
    pub fn is_loopback(&self) -> bool {
        LOOPBACK_LITERALS.contains(&self.0.as_str())
    }
}

impl fmt::Display for ClientAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<IpAddr> for ClientAddress {
    fn from(ip: IpAddr) -> Self {
        Self(ip.to_string())
    }
}

/// Resolve the client address for a request
///
/// # Parameters
///
/// - `forwarded_for`: raw `X-Forwarded-For` header value, if any
/// - `peer`: address of the directly connected peer, if known
/// - `trust_forwarded`: whether forwarding headers are honored at all
///
/// # Returns
///
/// The first non-empty entry of the forwarding header when trusted,
/// otherwise the peer address, otherwise `None`.
pub fn resolve_client_address(
    forwarded_for: Option<&str>,
    peer: Option<IpAddr>,
    trust_forwarded: bool,
) -> Option<ClientAddress> {
    if trust_forwarded
        && let Some(header) = forwarded_for
        && let Some(first) = header.split(',').next()
    {
        let first = first.trim();
        if !first.is_empty() {
            return Some(ClientAddress::new(first));
        }
    }

    peer.map(ClientAddress::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer() -> Option<IpAddr> {
        Some("10.0.0.7".parse().unwrap())
    }

    #[test]
    fn test_forwarded_header_takes_first_entry() {
        let addr = resolve_client_address(Some("203.0.113.9, 10.0.0.1, 10.0.0.2"), peer(), true);
        assert_eq!(addr, Some(ClientAddress::new("203.0.113.9")));
    }

    #[test]
    fn test_falls_back_to_peer() {
        let addr = resolve_client_address(None, peer(), true);
        assert_eq!(addr, Some(ClientAddress::new("10.0.0.7")));

        let addr = resolve_client_address(Some(" , 10.0.0.1"), peer(), true);
        assert_eq!(addr, Some(ClientAddress::new("10.0.0.7")));
    }

    #[test]
    fn test_untrusted_header_ignored() {
        let addr = resolve_client_address(Some("203.0.113.9"), peer(), false);
        assert_eq!(addr, Some(ClientAddress::new("10.0.0.7")));
    }

    #[test]
    fn test_absent_everything() {
        assert_eq!(resolve_client_address(None, None, true), None);
    }

    #[test]
    fn test_loopback_literals() {
        assert!(ClientAddress::new("127.0.0.1").is_loopback());
        assert!(ClientAddress::new("::1").is_loopback());
        assert!(ClientAddress::from(IpAddr::from([127, 0, 0, 1])).is_loopback());
        assert!(!ClientAddress::new("127.0.0.2").is_loopback());
        assert!(!ClientAddress::new("203.0.113.9").is_loopback());
    }

    #[test]
    fn test_ip_parsing() {
        assert_eq!(
            ClientAddress::new("203.0.113.9").ip(),
            Some(IpAddr::from([203, 0, 113, 9]))
        );
        assert!(ClientAddress::new("2001:db8::1").ip().is_some());
        assert_eq!(ClientAddress::new("1.2.3.4/../x?y=").ip(), None);
        assert_eq!(ClientAddress::new("unknown").ip(), None);
    }
}

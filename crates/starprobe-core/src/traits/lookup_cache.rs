// # Lookup Cache Trait
//
// Defines the interface for caching ISP lookup results.
//
// ## Purpose
//
// Repeated speed tests from the same address would otherwise hit the external
// lookup service every time. A cache keyed on the client address literal
// avoids that.
//
// ## Rules
//
// - Keys are client addresses, nothing else
// - Only successful lookups are stored; failures are retried next time
// - The loopback development fixture is never cached (the classifier
//   answers it before any lookup runs)
//
// ## Implementations
//
// - In-memory with TTL and bounded size: [`crate::cache::MemoryLookupCache`]

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::address::ClientAddress;
use crate::traits::isp_lookup::IspLookupResult;

/// A cached lookup result
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CachedLookup {
    /// The stored result
    pub result: IspLookupResult,
    /// When the result was stored
    pub cached_at: DateTime<Utc>,
}

impl CachedLookup {
    /// Create an entry stamped with the current time
    pub(crate) fn new(result: IspLookupResult) -> Self {
        Self {
            result,
            cached_at: Utc::now(),
        }
    }

    /// Whether this entry is older than `ttl`
    pub fn is_expired(&self, ttl: chrono::Duration) -> bool {
        Utc::now() - self.cached_at >= ttl
    }
}

/// Trait for lookup cache implementations
///
/// Implementations must be thread-safe: every in-flight network-info request
/// may hit the cache concurrently.
#[async_trait]
pub trait LookupCache: Send + Sync {
    /// Get a live (non-expired) entry for an address
    async fn get(&self, address: &ClientAddress) -> Result<Option<CachedLookup>, crate::Error>;

    /// Store a result for an address
    async fn put(&self, address: &ClientAddress, result: &IspLookupResult) -> Result<(), crate::Error>;
}

// # Memory Lookup Cache
//
// In-memory implementation of LookupCache.
//
// ## Behavior
//
// - Entries expire after a fixed TTL
// - The number of entries is bounded; inserting into a full cache evicts the
//   oldest entry first
// - Nothing survives a restart

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::address::ClientAddress;
use crate::config::LookupCacheConfig;
use crate::traits::isp_lookup::IspLookupResult;
use crate::traits::lookup_cache::{CachedLookup, LookupCache};
use crate::Error;

/// In-memory lookup cache
///
/// Entries live in a HashMap protected by a RwLock.
///
/// # Example
///
/// ```rust,no_run
/// use starprobe_core::cache::MemoryLookupCache;
/// use starprobe_core::traits::{IspLookupResult, LookupCache};
/// use starprobe_core::ClientAddress;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let cache = MemoryLookupCache::new(std::time::Duration::from_secs(300), 1000);
///     let addr = ClientAddress::new("203.0.113.9");
///
///     cache.put(&addr, &IspLookupResult::new("Comcast", "Comcast Cable", "AS7922 Comcast")).await?;
///     assert!(cache.get(&addr).await?.is_some());
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct MemoryLookupCache {
    inner: Arc<RwLock<HashMap<ClientAddress, CachedLookup>>>,
    ttl: chrono::Duration,
    max_entries: usize,
}

impl MemoryLookupCache {
    /// Create an empty cache
    pub fn new(ttl: std::time::Duration, max_entries: usize) -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
            ttl: chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX),
            max_entries: max_entries.max(1),
        }
    }

    /// Create an empty cache from configuration
    pub fn from_config(config: &LookupCacheConfig) -> Self {
        Self::new(
            std::time::Duration::from_secs(config.ttl_secs),
            config.max_entries,
        )
    }

    /// Get the number of entries (expired ones included until evicted)
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Check if the cache is empty
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

#[async_trait]
impl LookupCache for MemoryLookupCache {
    async fn get(&self, address: &ClientAddress) -> Result<Option<CachedLookup>, Error> {
        let guard = self.inner.read().await;
        Ok(guard
            .get(address)
            .filter(|entry| !entry.is_expired(self.ttl))
            .cloned())
    }

    async fn put(&self, address: &ClientAddress, result: &IspLookupResult) -> Result<(), Error> {
        let mut guard = self.inner.write().await;

        guard.retain(|_, entry| !entry.is_expired(self.ttl));

        if guard.len() >= self.max_entries && !guard.contains_key(address) {
            let oldest = guard
                .iter()
                .min_by_key(|(_, entry)| entry.cached_at)
                .map(|(key, _)| key.clone());
            if let Some(oldest) = oldest {
                guard.remove(&oldest);
            }
        }

        guard.insert(address.clone(), CachedLookup::new(result.clone()));
        Ok(())
    }
}

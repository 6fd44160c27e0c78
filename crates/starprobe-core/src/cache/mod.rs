//! Lookup caching
//!
//! [`CachedIspLookup`] wraps any [`IspLookup`] and consults a [`LookupCache`]
//! first. Only successful lookups are stored.

pub mod memory;

pub use memory::MemoryLookupCache;

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::address::ClientAddress;
use crate::config::LookupCacheConfig;
use crate::traits::{IspLookup, IspLookupResult, LookupCache};
use crate::Result;

/// Caching decorator around an ISP lookup
pub struct CachedIspLookup {
    inner: Arc<dyn IspLookup>,
    cache: Arc<dyn LookupCache>,
}

impl CachedIspLookup {
    /// Wrap `inner` with `cache`
    pub fn new(inner: Arc<dyn IspLookup>, cache: Arc<dyn LookupCache>) -> Self {
        Self { inner, cache }
    }

    /// Wrap `inner` with an in-memory cache built from configuration
    pub fn with_memory_cache(inner: Arc<dyn IspLookup>, config: &LookupCacheConfig) -> Self {
        Self::new(inner, Arc::new(MemoryLookupCache::from_config(config)))
    }
}

#[async_trait]
impl IspLookup for CachedIspLookup {
    async fn lookup(&self, address: &ClientAddress) -> Result<IspLookupResult> {
        match self.cache.get(address).await {
            Ok(Some(entry)) => {
                debug!(client_ip = %address, "Lookup cache hit");
                return Ok(entry.result);
            }
            Ok(None) => {}
            // A broken cache must not break lookups
            Err(e) => warn!(client_ip = %address, "Lookup cache read failed: {}", e),
        }

        let result = self.inner.lookup(address).await?;

        if let Err(e) = self.cache.put(address, &result).await {
            warn!(client_ip = %address, "Lookup cache write failed: {}", e);
        }

        Ok(result)
    }

    fn provider_name(&self) -> &'static str {
        self.inner.provider_name()
    }
}

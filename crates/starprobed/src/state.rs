//! Application state.

use starprobe_core::{
    CachedIspLookup, IspClassifier, IspLookup, LookupRegistry, SpeedTestConfig, UploadConsumer,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Shared application state.
///
/// Everything here is read-only after startup; requests never share
/// mutable state through it.
#[derive(Clone)]
pub struct AppState {
    /// Measurement configuration.
    pub config: Arc<SpeedTestConfig>,
    /// ISP classifier, wrapping the (possibly cached) lookup.
    pub classifier: IspClassifier,
    /// Upload consumer.
    pub uploads: UploadConsumer,
    /// Whether `X-Forwarded-For` is trusted for the client address.
    pub trust_forwarded: bool,
}

impl AppState {
    /// Create state around an already-built lookup.
    ///
    /// The lookup is wrapped in an in-memory cache when the configuration
    /// enables one.
    pub fn new(config: SpeedTestConfig, lookup: Arc<dyn IspLookup>, trust_forwarded: bool) -> Self {
        let lookup: Arc<dyn IspLookup> = if config.lookup_cache.enabled {
            info!(
                ttl_secs = config.lookup_cache.ttl_secs,
                max_entries = config.lookup_cache.max_entries,
                "Caching ISP lookups in memory"
            );
            Arc::new(CachedIspLookup::with_memory_cache(lookup, &config.lookup_cache))
        } else {
            lookup
        };

        let timeout = match &config.lookup {
            starprobe_core::LookupConfig::IpApi { timeout_ms, .. } => {
                Duration::from_millis(*timeout_ms)
            }
            starprobe_core::LookupConfig::Custom { .. } => {
                Duration::from_millis(starprobe_core::config::DEFAULT_LOOKUP_TIMEOUT_MS)
            }
        };

        Self {
            classifier: IspClassifier::with_timeout(lookup, timeout),
            uploads: UploadConsumer::from_config(&config.upload),
            config: Arc::new(config),
            trust_forwarded,
        }
    }

    /// Create state, building the lookup through the registry.
    pub fn from_registry(
        config: SpeedTestConfig,
        registry: &LookupRegistry,
        trust_forwarded: bool,
    ) -> starprobe_core::Result<Self> {
        let lookup: Arc<dyn IspLookup> = Arc::from(registry.create_lookup(&config.lookup)?);
        info!(provider = lookup.provider_name(), "ISP lookup ready");
        Ok(Self::new(config, lookup, trust_forwarded))
    }
}

//! Configuration types for starprobe
//!
//! This module defines all configuration structures used throughout the crate.

use serde::{Deserialize, Serialize};

use crate::MIB;

/// Default download size when the caller does not ask for one (10 MiB)
pub const DEFAULT_DOWNLOAD_BYTES: u64 = 10 * MIB;

/// Hard cap on a single download (100 MiB)
pub const MAX_DOWNLOAD_BYTES: u64 = 100 * MIB;

/// Chunk size shared by the download generator and upload consumer (64 KiB)
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Default lookup base URL (ip-api.com JSON endpoint)
pub const DEFAULT_LOOKUP_URL: &str = "http://ip-api.com/json";

/// Default lookup timeout in milliseconds
pub const DEFAULT_LOOKUP_TIMEOUT_MS: u64 = 3000;

/// Main starprobe configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpeedTestConfig {
    /// Download generator settings
    #[serde(default)]
    pub download: DownloadConfig,

    /// Upload consumer settings
    #[serde(default)]
    pub upload: UploadConfig,

    /// ISP lookup service configuration
    #[serde(default)]
    pub lookup: LookupConfig,

    /// Optional lookup cache
    #[serde(default)]
    pub lookup_cache: LookupCacheConfig,
}

impl SpeedTestConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.download.validate()?;
        self.upload.validate()?;
        self.lookup.validate()?;
        self.lookup_cache.validate()?;
        Ok(())
    }
}

/// Download generator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Size served when the request carries no usable size
    #[serde(default = "default_download_bytes")]
    pub default_bytes: u64,

    /// Upper bound on any single download
    #[serde(default = "default_max_download_bytes")]
    pub max_bytes: u64,

    /// Size of each generated chunk
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

impl DownloadConfig {
    /// Validate the download configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.chunk_size == 0 {
            return Err(crate::Error::config("Download chunk size must be > 0"));
        }
        if self.max_bytes == 0 {
            return Err(crate::Error::config("Download max bytes must be > 0"));
        }
        if self.max_bytes > MAX_DOWNLOAD_BYTES {
            return Err(crate::Error::config(format!(
                "Download max bytes must be <= {} (100 MiB)",
                MAX_DOWNLOAD_BYTES
            )));
        }
        if self.default_bytes == 0 || self.default_bytes > self.max_bytes {
            return Err(crate::Error::config(format!(
                "Download default bytes must be between 1 and {} (max bytes)",
                self.max_bytes
            )));
        }
        Ok(())
    }
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            default_bytes: default_download_bytes(),
            max_bytes: default_max_download_bytes(),
            chunk_size: default_chunk_size(),
        }
    }
}

/// Upload consumer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Maximum size of each chunk pulled from the inbound stream
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

impl UploadConfig {
    /// Validate the upload configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.chunk_size == 0 {
            return Err(crate::Error::config("Upload chunk size must be > 0"));
        }
        Ok(())
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
        }
    }
}

/// ISP lookup configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LookupConfig {
    /// ip-api.com style JSON lookup (`GET {base_url}/{address}`)
    IpApi {
        /// Base URL; the address literal is appended as the last path segment
        base_url: String,
        /// Request timeout in milliseconds
        #[serde(default = "default_lookup_timeout_ms")]
        timeout_ms: u64,
    },

    /// Custom lookup
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl LookupConfig {
    /// Validate the lookup configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            LookupConfig::IpApi {
                base_url,
                timeout_ms,
            } => {
                if base_url.is_empty() {
                    return Err(crate::Error::config("Lookup base URL cannot be empty"));
                }
                if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
                    return Err(crate::Error::config(format!(
                        "Lookup base URL must use HTTP or HTTPS scheme. Got: {}",
                        base_url
                    )));
                }
                if *timeout_ms == 0 {
                    return Err(crate::Error::config("Lookup timeout must be > 0"));
                }
                Ok(())
            }
            LookupConfig::Custom { factory, config } => {
                if factory.is_empty() {
                    return Err(crate::Error::config("Custom lookup factory cannot be empty"));
                }
                if config.is_null() {
                    return Err(crate::Error::config("Custom lookup config cannot be null"));
                }
                Ok(())
            }
        }
    }

    /// Get the lookup type name used for registry resolution
    pub fn type_name(&self) -> &str {
        match self {
            LookupConfig::IpApi { .. } => "ip_api",
            LookupConfig::Custom { factory, .. } => factory,
        }
    }
}

impl Default for LookupConfig {
    fn default() -> Self {
        LookupConfig::IpApi {
            base_url: DEFAULT_LOOKUP_URL.to_string(),
            timeout_ms: default_lookup_timeout_ms(),
        }
    }
}

/// Lookup cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookupCacheConfig {
    /// Whether lookups are cached at all
    #[serde(default)]
    pub enabled: bool,

    /// How long a cached result stays valid (in seconds)
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,

    /// Maximum number of cached addresses
    ///
    /// When full, the oldest entry is evicted to make room.
    #[serde(default = "default_cache_max_entries")]
    pub max_entries: usize,
}

impl LookupCacheConfig {
    /// Validate the cache configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.enabled && self.max_entries == 0 {
            return Err(crate::Error::config(
                "Lookup cache max entries must be > 0 when the cache is enabled",
            ));
        }
        Ok(())
    }
}

impl Default for LookupCacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            ttl_secs: default_cache_ttl_secs(),
            max_entries: default_cache_max_entries(),
        }
    }
}

fn default_download_bytes() -> u64 {
    DEFAULT_DOWNLOAD_BYTES
}

fn default_max_download_bytes() -> u64 {
    MAX_DOWNLOAD_BYTES
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_lookup_timeout_ms() -> u64 {
    DEFAULT_LOOKUP_TIMEOUT_MS
}

fn default_cache_ttl_secs() -> u64 {
    300
}

fn default_cache_max_entries() -> usize {
    10_000
}

// # Daemon Configuration
//
// All configuration is done via environment variables:
//
// ### Server
// - `STARPROBE_BIND_ADDR`: Listen address (default `0.0.0.0:8000`)
// - `STARPROBE_TRUST_FORWARDED`: Honor `X-Forwarded-For` (default `true`)
// - `STARPROBE_CORS_ALLOW_ORIGIN`: `*` or a comma-separated origin list (default `*`)
//
// ### Download
// - `STARPROBE_DOWNLOAD_DEFAULT_BYTES`: Size served when none is requested
// - `STARPROBE_DOWNLOAD_MAX_BYTES`: Cap on one download, at most 100 MiB
//
// ### ISP Lookup
// - `STARPROBE_LOOKUP_TYPE`: Lookup type (`ip_api`)
// - `STARPROBE_LOOKUP_URL`: Base URL the address is appended to
// - `STARPROBE_LOOKUP_TIMEOUT_MS`: Per-lookup budget
// - `STARPROBE_LOOKUP_CACHE_TTL_SECS`: Cache lifetime, `0` disables caching
// - `STARPROBE_LOOKUP_CACHE_MAX_ENTRIES`: Cache capacity
//
// ### Logging
// - `STARPROBE_LOG_LEVEL`: trace, debug, info, warn, error

use anyhow::{Context, Result};
use axum::http::HeaderValue;
use starprobe_core::config::{
    DEFAULT_CHUNK_SIZE, DEFAULT_DOWNLOAD_BYTES, DEFAULT_LOOKUP_TIMEOUT_MS, DEFAULT_LOOKUP_URL,
    DownloadConfig, LookupCacheConfig, LookupConfig, MAX_DOWNLOAD_BYTES, SpeedTestConfig,
    UploadConfig,
};
use std::net::SocketAddr;
use std::str::FromStr;
use tracing::Level;

/// Default listen address
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";

/// Lookup types this build knows how to construct
pub const SUPPORTED_LOOKUP_TYPES: &[&str] = &["ip_api"];

/// Cross-origin policy for the measurement endpoints
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorsOrigins {
    /// Any origin may call
    Any,
    /// Only the listed origins
    List(Vec<HeaderValue>),
}

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub bind_addr: SocketAddr,
    pub trust_forwarded: bool,
    pub cors_allow_origin: String,
    pub lookup_type: String,
    pub lookup_url: String,
    pub lookup_timeout_ms: u64,
    pub download_default_bytes: u64,
    pub download_max_bytes: u64,
    pub lookup_cache_ttl_secs: u64,
    pub lookup_cache_max_entries: usize,
    pub log_level: String,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8000)),
            trust_forwarded: true,
            cors_allow_origin: "*".to_string(),
            lookup_type: "ip_api".to_string(),
            lookup_url: DEFAULT_LOOKUP_URL.to_string(),
            lookup_timeout_ms: DEFAULT_LOOKUP_TIMEOUT_MS,
            download_default_bytes: DEFAULT_DOWNLOAD_BYTES,
            download_max_bytes: MAX_DOWNLOAD_BYTES,
            lookup_cache_ttl_secs: 0,
            lookup_cache_max_entries: 10_000,
            log_level: "info".to_string(),
        }
    }
}

impl DaemonConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source
    ///
    /// Unset variables take their defaults. Set but malformed values are
    /// errors rather than silently defaulted.
    pub fn from_vars<F>(var: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        Ok(Self {
            bind_addr: parse_var(&var, "STARPROBE_BIND_ADDR", defaults.bind_addr)?,
            trust_forwarded: parse_bool(&var, "STARPROBE_TRUST_FORWARDED", defaults.trust_forwarded)?,
            cors_allow_origin: var("STARPROBE_CORS_ALLOW_ORIGIN")
                .unwrap_or(defaults.cors_allow_origin),
            lookup_type: var("STARPROBE_LOOKUP_TYPE").unwrap_or(defaults.lookup_type),
            lookup_url: var("STARPROBE_LOOKUP_URL").unwrap_or(defaults.lookup_url),
            lookup_timeout_ms: parse_var(
                &var,
                "STARPROBE_LOOKUP_TIMEOUT_MS",
                defaults.lookup_timeout_ms,
            )?,
            download_default_bytes: parse_var(
                &var,
                "STARPROBE_DOWNLOAD_DEFAULT_BYTES",
                defaults.download_default_bytes,
            )?,
            download_max_bytes: parse_var(
                &var,
                "STARPROBE_DOWNLOAD_MAX_BYTES",
                defaults.download_max_bytes,
            )?,
            lookup_cache_ttl_secs: parse_var(
                &var,
                "STARPROBE_LOOKUP_CACHE_TTL_SECS",
                defaults.lookup_cache_ttl_secs,
            )?,
            lookup_cache_max_entries: parse_var(
                &var,
                "STARPROBE_LOOKUP_CACHE_MAX_ENTRIES",
                defaults.lookup_cache_max_entries,
            )?,
            log_level: var("STARPROBE_LOG_LEVEL").unwrap_or(defaults.log_level),
        })
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if !SUPPORTED_LOOKUP_TYPES.contains(&self.lookup_type.as_str()) {
            anyhow::bail!(
                "STARPROBE_LOOKUP_TYPE '{}' is not supported. \
                Supported types: {}",
                self.lookup_type,
                SUPPORTED_LOOKUP_TYPES.join(", ")
            );
        }

        if !(100..=60_000).contains(&self.lookup_timeout_ms) {
            anyhow::bail!(
                "STARPROBE_LOOKUP_TIMEOUT_MS must be between 100 and 60000. Got: {}",
                self.lookup_timeout_ms
            );
        }

        if self.lookup_cache_ttl_secs > 0 && self.lookup_cache_max_entries == 0 {
            anyhow::bail!(
                "STARPROBE_LOOKUP_CACHE_MAX_ENTRIES must be > 0 when caching is enabled"
            );
        }

        self.cors_origins()?;
        self.log_level()?;

        self.speed_test_config()
            .validate()
            .context("Invalid measurement configuration")?;

        Ok(())
    }

    /// Core configuration derived from the environment
    pub fn speed_test_config(&self) -> SpeedTestConfig {
        SpeedTestConfig {
            download: DownloadConfig {
                default_bytes: self.download_default_bytes,
                max_bytes: self.download_max_bytes,
                chunk_size: DEFAULT_CHUNK_SIZE,
            },
            upload: UploadConfig {
                chunk_size: DEFAULT_CHUNK_SIZE,
            },
            lookup: LookupConfig::IpApi {
                base_url: self.lookup_url.clone(),
                timeout_ms: self.lookup_timeout_ms,
            },
            lookup_cache: LookupCacheConfig {
                enabled: self.lookup_cache_ttl_secs > 0,
                ttl_secs: self.lookup_cache_ttl_secs,
                max_entries: self.lookup_cache_max_entries,
            },
        }
    }

    /// Parsed cross-origin policy
    pub fn cors_origins(&self) -> Result<CorsOrigins> {
        let raw = self.cors_allow_origin.trim();
        if raw == "*" {
            return Ok(CorsOrigins::Any);
        }

        let origins = raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|origin| {
                HeaderValue::from_str(origin)
                    .with_context(|| format!("Invalid STARPROBE_CORS_ALLOW_ORIGIN entry: {}", origin))
            })
            .collect::<Result<Vec<_>>>()?;

        if origins.is_empty() {
            anyhow::bail!("STARPROBE_CORS_ALLOW_ORIGIN must be '*' or a list of origins");
        }

        Ok(CorsOrigins::List(origins))
    }

    /// Parsed log level
    pub fn log_level(&self) -> Result<Level> {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Ok(Level::TRACE),
            "debug" => Ok(Level::DEBUG),
            "info" => Ok(Level::INFO),
            "warn" => Ok(Level::WARN),
            "error" => Ok(Level::ERROR),
            _ => anyhow::bail!(
                "STARPROBE_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }
    }
}

fn parse_var<F, T>(var: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match var(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{} has an invalid value '{}': {}", key, raw, e)),
        None => Ok(default),
    }
}

fn parse_bool<F>(var: &F, key: &str, default: bool) -> Result<bool>
where
    F: Fn(&str) -> Option<String>,
{
    match var(key).map(|s| s.trim().to_lowercase()) {
        None => Ok(default),
        Some(s) => match s.as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => anyhow::bail!("{} must be a boolean. Got: {}", key, s),
        },
    }
}

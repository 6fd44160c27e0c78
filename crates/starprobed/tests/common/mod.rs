//! Server test utilities.

use starprobe_core::config::{DownloadConfig, SpeedTestConfig};
use starprobe_core::error::Result;
use starprobe_core::{ClientAddress, Error, IspLookup, IspLookupResult};
use starprobed::{AppState, CorsOrigins, create_router};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Download limits small enough to read whole bodies in tests
pub const TEST_DEFAULT_BYTES: u64 = 4096;
pub const TEST_MAX_BYTES: u64 = 200_000;

/// A lookup answering with a fixed result
pub struct StubLookup {
    result: Option<IspLookupResult>,
    calls: AtomicUsize,
}

#[allow(dead_code)]
impl StubLookup {
    pub fn answering(isp: &str, org: &str, asn: &str) -> Arc<Self> {
        Arc::new(Self {
            result: Some(IspLookupResult::new(isp, org, asn)),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn starlink() -> Arc<Self> {
        Self::answering("Starlink", "SpaceX Services, Inc.", "AS14593 Space Exploration Technologies Corporation")
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            result: None,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl IspLookup for StubLookup {
    async fn lookup(&self, _address: &ClientAddress) -> Result<IspLookupResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result
            .clone()
            .ok_or_else(|| Error::http("HTTP error: 503 Service Unavailable"))
    }

    fn provider_name(&self) -> &'static str {
        "stub"
    }
}

/// A test server wrapper.
/// Note: #[allow(dead_code)] because each test file compiles common/ separately.
#[allow(dead_code)]
pub struct TestServer {
    pub router: axum::Router,
    pub state: AppState,
}

#[allow(dead_code)]
impl TestServer {
    /// Server with a Starlink-answering lookup that trusts forwarding headers
    pub fn new() -> Self {
        Self::with_lookup(StubLookup::starlink(), true)
    }

    pub fn with_lookup(lookup: Arc<dyn IspLookup>, trust_forwarded: bool) -> Self {
        let config = SpeedTestConfig {
            download: DownloadConfig {
                default_bytes: TEST_DEFAULT_BYTES,
                max_bytes: TEST_MAX_BYTES,
                ..Default::default()
            },
            ..Default::default()
        };

        let state = AppState::new(config, lookup, trust_forwarded);
        let router = create_router(state.clone(), &CorsOrigins::Any);

        Self { router, state }
    }
}

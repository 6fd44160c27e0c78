//! Test doubles for classifier and measurement contract tests
//!
//! Minimal lookups with controllable behavior; nothing here talks to the
//! network.

#![allow(dead_code)]

use starprobe_core::error::Result;
use starprobe_core::traits::{IspLookup, IspLookupResult};
use starprobe_core::{ClientAddress, Error};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// A lookup that always answers with the same result and counts calls
pub struct StaticLookup {
    result: IspLookupResult,
    calls: Arc<AtomicUsize>,
    seen: Arc<std::sync::Mutex<Vec<String>>>,
}

impl StaticLookup {
    pub fn new(isp: &str, org: &str, asn: &str) -> Self {
        Self {
            result: IspLookupResult::new(isp, org, asn),
            calls: Arc::new(AtomicUsize::new(0)),
            seen: Arc::new(std::sync::Mutex::new(Vec::new())),
        }
    }

    /// Number of lookup() calls so far
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Addresses passed to lookup(), in order
    pub fn seen_addresses(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl IspLookup for StaticLookup {
    async fn lookup(&self, address: &ClientAddress) -> Result<IspLookupResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(address.to_string());
        Ok(self.result.clone())
    }

    fn provider_name(&self) -> &'static str {
        "static"
    }
}

/// A lookup that always fails
pub struct FailingLookup;

#[async_trait::async_trait]
impl IspLookup for FailingLookup {
    async fn lookup(&self, _address: &ClientAddress) -> Result<IspLookupResult> {
        Err(Error::http("HTTP error: 503 Service Unavailable"))
    }

    fn provider_name(&self) -> &'static str {
        "failing"
    }
}

/// A lookup that takes longer than any reasonable budget
pub struct SlowLookup {
    pub delay: Duration,
}

#[async_trait::async_trait]
impl IspLookup for SlowLookup {
    async fn lookup(&self, _address: &ClientAddress) -> Result<IspLookupResult> {
        tokio::time::sleep(self.delay).await;
        Ok(IspLookupResult::new("Starlink", "SpaceX Services", "AS14593 SpaceX"))
    }

    fn provider_name(&self) -> &'static str {
        "slow"
    }
}

/// Convenience: wrap a lookup for the classifier
pub fn shared<L: IspLookup + 'static>(lookup: L) -> Arc<dyn IspLookup> {
    Arc::new(lookup)
}

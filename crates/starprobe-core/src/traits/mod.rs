//! Core traits for starprobe
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`IspLookup`]: Resolve a client address to ISP / organization / ASN data
//! - [`LookupCache`]: Optional cache of lookup results keyed by client address

pub mod isp_lookup;
pub mod lookup_cache;

pub use isp_lookup::{IspLookup, IspLookupFactory, IspLookupResult};
pub use lookup_cache::{CachedLookup, LookupCache};

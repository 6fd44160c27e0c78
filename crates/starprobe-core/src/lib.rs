// # starprobe-core
//
// Core library for the starprobe network measurement service.
//
// ## Architecture Overview
//
// Four stateless, per-request operations make up the core:
// - **Latency probe** ([`probe`]): empty acknowledgment, timed by the caller
// - **Download generator** ([`download`]): lazy stream of incompressible random bytes
// - **Upload consumer** ([`upload`]): drains an inbound byte stream and reports throughput
// - **ISP classifier** ([`classifier`]): resolves the caller's ISP and flags Starlink
//
// Supporting pieces:
// - **IspLookup**: Trait for the external address -> ISP lookup service
// - **LookupCache**: Trait for optional caching of lookup results
// - **LookupRegistry**: Plugin-based registry for lookup implementations
//
// ## Design Principles
//
// 1. **No shared mutable state**: every operation takes its inputs explicitly
// 2. **Bounded memory**: byte streams are produced and consumed chunk by chunk
// 3. **Always answer**: malformed input and lookup failures degrade, never fail
// 4. **Library-First**: no HTTP framework dependency; the daemon is thin wiring

pub mod address;
pub mod cache;
pub mod classifier;
pub mod config;
pub mod download;
pub mod error;
pub mod probe;
pub mod registry;
pub mod traits;
pub mod upload;

// Re-export core types for convenience
pub use address::{ClientAddress, resolve_client_address};
pub use cache::{CachedIspLookup, MemoryLookupCache};
pub use classifier::{IspClassifier, NetworkInfo};
pub use config::{DownloadConfig, LookupCacheConfig, LookupConfig, SpeedTestConfig, UploadConfig};
pub use download::{ByteStreamRequest, RandomByteStream};
pub use error::{Error, Result};
pub use probe::ProbeAck;
pub use registry::LookupRegistry;
pub use traits::{IspLookup, IspLookupResult, LookupCache};
pub use upload::{ChunkSource, UploadBody, UploadConsumer, UploadResult};

/// One kibibyte
pub const KIB: u64 = 1024;

/// One mebibyte
pub const MIB: u64 = 1024 * KIB;

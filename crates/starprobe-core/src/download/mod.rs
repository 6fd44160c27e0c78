//! Download generator
//!
//! Produces a lazy, finite sequence of random byte chunks whose total length
//! is exactly the effective requested size.
//!
//! ## Why random bytes
//!
//! Compressible content (zeros, repeated patterns) lets an intermediary
//! compress the transfer and inflate apparent throughput. Uniform random
//! bytes are incompressible, so the bytes counted by the caller are the bytes
//! that crossed the path.
//!
//! ## Memory
//!
//! Only the chunk being handed out is ever allocated. A 100 MiB download costs
//! one 64 KiB buffer at a time, no matter how many run concurrently.

use bytes::{Bytes, BytesMut};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use tokio_stream::Stream;

use crate::config::DownloadConfig;

/// Content type of the generated stream
pub const CONTENT_TYPE: &str = "application/octet-stream";

/// Response directives that keep every caching layer out of the measurement
pub const NO_CACHE_HEADERS: &[(&str, &str)] = &[
    ("cache-control", "no-cache, no-store, must-revalidate"),
    ("pragma", "no-cache"),
    ("expires", "0"),
];

/// A caller's download request
///
/// `requested_size` is `None` when the caller sent no size or sent something
/// that is not an integer. Neither case is an error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ByteStreamRequest {
    /// Requested size in bytes, as sent (may be zero or negative)
    pub requested_size: Option<i128>,
}

impl ByteStreamRequest {
    /// Create a request for an explicit size
    pub fn new(requested_size: i128) -> Self {
        Self {
            requested_size: Some(requested_size),
        }
    }

    /// Build a request from a raw query value
    ///
    /// Anything that does not parse as an integer is treated exactly like an
    /// absent size.
    pub fn from_query(raw: Option<&str>) -> Self {
        Self {
            requested_size: raw.and_then(|s| s.trim().parse::<i128>().ok()),
        }
    }

    /// The number of bytes that will actually be served
    ///
    /// Absent sizes map to `config.default_bytes`; present sizes are clamped
    /// to `1..=config.max_bytes`.
    pub fn effective_size(&self, config: &DownloadConfig) -> u64 {
        match self.requested_size {
            Some(requested) => {
                let max = config.max_bytes.max(1);
                requested.clamp(1, i128::from(max)) as u64
            }
            None => config.default_bytes.min(config.max_bytes),
        }
    }
}

/// Lazy generator of random byte chunks
///
/// Not restartable: once drained it stays empty.
pub struct RandomByteStream {
    /// Total number of bytes this stream will produce
    total: u64,

    /// Bytes not yet handed out
    remaining: u64,

    /// Maximum chunk length
    chunk_size: usize,

    /// Fast, non-cryptographic source of uniform bytes
    rng: StdRng,
}

impl RandomByteStream {
    /// Create a stream of exactly `total` bytes in chunks of `chunk_size`
    pub fn new(total: u64, chunk_size: usize) -> Self {
        Self {
            total,
            remaining: total,
            chunk_size: chunk_size.max(1),
            rng: StdRng::from_os_rng(),
        }
    }

    /// Create the stream answering `request` under `config`
    pub fn for_request(request: &ByteStreamRequest, config: &DownloadConfig) -> Self {
        Self::new(request.effective_size(config), config.chunk_size)
    }

    /// Total length, known up front so it can be declared to the caller
    pub fn total_len(&self) -> u64 {
        self.total
    }

    /// Bytes left to produce
    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    /// Produce the next chunk, or `None` once `total_len()` bytes were produced
    ///
    /// Every chunk is `chunk_size` long except the last, which is exactly the
    /// remainder.
    pub fn next_chunk(&mut self) -> Option<Bytes> {
        if self.remaining == 0 {
            return None;
        }

        let len = self.remaining.min(self.chunk_size as u64) as usize;
        let mut buf = BytesMut::zeroed(len);
        self.rng.fill_bytes(&mut buf[..]);
        self.remaining -= len as u64;

        Some(buf.freeze())
    }

    /// Adapt into an async stream suitable for a streaming response body
    pub fn into_stream(self) -> impl Stream<Item = std::io::Result<Bytes>> + Send + 'static {
        tokio_stream::iter(self.map(Ok))
    }
}

impl Iterator for RandomByteStream {
    type Item = Bytes;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_chunk()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let chunks = self.remaining.div_ceil(self.chunk_size as u64);
        let chunks = usize::try_from(chunks).unwrap_or(usize::MAX);
        (chunks, Some(chunks))
    }
}

impl std::fmt::Debug for RandomByteStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RandomByteStream")
            .field("total", &self.total)
            .field("remaining", &self.remaining)
            .field("chunk_size", &self.chunk_size)
            .finish()
    }
}

//! Upload consumer
//!
//! Drains an inbound byte stream of unknown length, counting bytes and
//! discarding them as they arrive, and reports server-side throughput.
//!
//! ## Timing
//!
//! The clock starts immediately before the first read and stops immediately
//! after end-of-data. Request setup and response serialization fall outside
//! the interval.
//!
//! ## Memory
//!
//! At most one chunk (64 KiB by default) is held per in-flight upload.

mod source;

pub use source::{ChunkSource, ReaderChunkSource, StreamChunkSource};

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::debug;

use crate::Result;
use crate::config::UploadConfig;

/// Lower bound on a reported duration, so instantaneous uploads never divide by zero
pub const MIN_DURATION_SECS: f64 = 0.0001;

/// Outcome of one upload measurement
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UploadResult {
    /// Total bytes received
    pub received_bytes: u64,

    /// Receive time in seconds, never below [`MIN_DURATION_SECS`]
    pub duration_seconds: f64,

    /// `received_bytes * 8 / (duration_seconds * 1e6)`
    #[serde(alias = "calculated_mbps")]
    pub throughput_mbps: f64,
}

impl UploadResult {
    /// Build a result from a byte count and a measured interval
    pub fn new(received_bytes: u64, elapsed: Duration) -> Self {
        let duration_seconds = elapsed.as_secs_f64().max(MIN_DURATION_SECS);
        let throughput_mbps = (received_bytes as f64 * 8.0) / (duration_seconds * 1_000_000.0);

        Self {
            received_bytes,
            duration_seconds,
            throughput_mbps,
        }
    }
}

/// Inbound upload body as supplied by the boundary layer
pub enum UploadBody {
    /// A live stream, read chunk by chunk
    Chunked(Box<dyn ChunkSource>),

    /// Content that was already buffered elsewhere
    ///
    /// Degraded path: its length is counted directly and no chunked read
    /// happens.
    Buffered(Bytes),
}

impl UploadBody {
    /// Wrap any chunk source
    pub fn chunked(source: impl ChunkSource + 'static) -> Self {
        Self::Chunked(Box::new(source))
    }
}

impl std::fmt::Debug for UploadBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UploadBody::Chunked(_) => f.write_str("UploadBody::Chunked(..)"),
            UploadBody::Buffered(bytes) => write!(f, "UploadBody::Buffered({} bytes)", bytes.len()),
        }
    }
}

/// Consumes upload bodies and measures them
#[derive(Debug, Clone)]
pub struct UploadConsumer {
    chunk_size: usize,
}

impl UploadConsumer {
    /// Create a consumer reading at most `chunk_size` bytes per read
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
        }
    }

    /// Create a consumer from configuration
    pub fn from_config(config: &UploadConfig) -> Self {
        Self::new(config.chunk_size)
    }

    /// Read `body` to exhaustion and report what arrived
    ///
    /// Empty bodies are valid and produce a zero-byte result.
    ///
    /// # Errors
    ///
    /// Only transport failures raised by the chunk source itself.
    pub async fn consume(&self, body: UploadBody) -> Result<UploadResult> {
        let result = match body {
            UploadBody::Chunked(mut source) => {
                let mut received: u64 = 0;

                let start = Instant::now();
                while let Some(chunk) = source.next_chunk(self.chunk_size).await? {
                    received += chunk.len() as u64;
                }
                let elapsed = start.elapsed();

                UploadResult::new(received, elapsed)
            }
            UploadBody::Buffered(bytes) => {
                let start = Instant::now();
                let received = bytes.len() as u64;
                drop(bytes);
                UploadResult::new(received, start.elapsed())
            }
        };

        debug!(
            received_bytes = result.received_bytes,
            duration_seconds = result.duration_seconds,
            throughput_mbps = result.throughput_mbps,
            "Upload consumed"
        );

        Ok(result)
    }
}

impl Default for UploadConsumer {
    fn default() -> Self {
        Self::from_config(&UploadConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_throughput_formula(result: &UploadResult) {
        let expected = result.received_bytes as f64 * 8.0 / (result.duration_seconds * 1e6);
        assert!((result.throughput_mbps - expected).abs() <= expected.abs() * 1e-12);
        assert!(result.duration_seconds >= MIN_DURATION_SECS);
    }

    fn frames(sizes: &[usize]) -> UploadBody {
        let frames: Vec<std::io::Result<Bytes>> =
            sizes.iter().map(|n| Ok(Bytes::from(vec![0xAB; *n]))).collect();
        UploadBody::chunked(StreamChunkSource::new(tokio_stream::iter(frames)))
    }

    #[test]
    fn test_result_formula() {
        let result = UploadResult::new(1_000_000, Duration::from_secs(1));
        assert_eq!(result.duration_seconds, 1.0);
        assert_eq!(result.throughput_mbps, 8.0);
    }

    #[test]
    fn test_result_clamps_zero_duration() {
        let result = UploadResult::new(0, Duration::ZERO);
        assert_eq!(result.duration_seconds, MIN_DURATION_SECS);
        assert_eq!(result.throughput_mbps, 0.0);

        let result = UploadResult::new(1250, Duration::ZERO);
        assert_eq!(result.duration_seconds, MIN_DURATION_SECS);
        assert!((result.throughput_mbps - 100.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_counts_every_byte() {
        let consumer = UploadConsumer::default();

        for sizes in [vec![], vec![1], vec![65536], vec![65537, 3, 200_000], vec![0, 10, 0]] {
            let expected: usize = sizes.iter().sum();
            let result = consumer.consume(frames(&sizes)).await.unwrap();

            assert_eq!(result.received_bytes, expected as u64, "frames {:?}", sizes);
            assert_throughput_formula(&result);
        }
    }

    #[tokio::test]
    async fn test_empty_upload_is_valid() {
        let result = UploadConsumer::default().consume(frames(&[])).await.unwrap();

        assert_eq!(result.received_bytes, 0);
        assert_eq!(result.throughput_mbps, 0.0);
        assert!(result.duration_seconds >= MIN_DURATION_SECS);
    }

    #[tokio::test]
    async fn test_buffered_fallback() {
        let consumer = UploadConsumer::default();

        let result = consumer
            .consume(UploadBody::Buffered(Bytes::from(vec![1u8; 12345])))
            .await
            .unwrap();
        assert_eq!(result.received_bytes, 12345);
        assert_throughput_formula(&result);

        let result = consumer.consume(UploadBody::Buffered(Bytes::new())).await.unwrap();
        assert_eq!(result.received_bytes, 0);
        assert_eq!(result.throughput_mbps, 0.0);
    }

    #[tokio::test]
    async fn test_duration_covers_slow_reads() {
        let reader = tokio_test::io::Builder::new()
            .read(&[1u8; 1000])
            .wait(Duration::from_millis(50))
            .read(&[2u8; 1000])
            .build();

        let result = UploadConsumer::new(512)
            .consume(UploadBody::chunked(ReaderChunkSource::new(reader)))
            .await
            .unwrap();

        assert_eq!(result.received_bytes, 2000);
        assert!(result.duration_seconds >= 0.05);
        assert_throughput_formula(&result);
    }

    #[tokio::test]
    async fn test_transport_error_propagates() {
        let reader = tokio_test::io::Builder::new()
            .read(&[1u8; 10])
            .read_error(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "peer reset"))
            .build();

        let result = UploadConsumer::default()
            .consume(UploadBody::chunked(ReaderChunkSource::new(reader)))
            .await;

        assert!(matches!(result, Err(crate::Error::Network(_))));
    }

    #[test]
    fn test_serialized_shape() {
        let json = serde_json::to_value(UploadResult::new(8, Duration::from_secs(2))).unwrap();
        assert_eq!(json["received_bytes"], 8);
        assert_eq!(json["duration_seconds"], 2.0);
        assert!(json.get("throughput_mbps").is_some());

        let legacy: UploadResult = serde_json::from_str(
            r#"{"received_bytes": 8, "duration_seconds": 2.0, "calculated_mbps": 0.000032}"#,
        )
        .unwrap();
        assert_eq!(legacy.received_bytes, 8);
    }
}

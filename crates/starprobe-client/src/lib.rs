// # starprobe-client
//
// Caller side of the measurement protocol.
//
// The server only answers; every number that describes the path is computed
// here from client-side timing:
// - Latency: sequential probes, averaged, jitter as population std deviation
// - Download: parallel streams, total bytes over wall-clock time
// - Upload: one POST of random bytes, timed end to end; the server's own
//   receive-side figure is reported alongside
// - Network info: the server's ISP classification for this client

pub mod stats;

pub use stats::{LatencySummary, Throughput, format_speed};

use bytes::{Bytes, BytesMut};
use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use reqwest::header::CACHE_CONTROL;
use serde::{Deserialize, Serialize};
use starprobe_core::config::DEFAULT_CHUNK_SIZE;
use starprobe_core::{Error, MIB, NetworkInfo, RandomByteStream, Result, UploadResult};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Default number of latency probes
pub const DEFAULT_LATENCY_SAMPLES: usize = 10;

/// Default size of each download stream (10 MiB)
pub const DEFAULT_DOWNLOAD_BYTES: u64 = 10 * MIB;

/// Default number of parallel download streams
pub const DEFAULT_DOWNLOAD_STREAMS: usize = 3;

/// Default upload size (20 MiB)
pub const DEFAULT_UPLOAD_BYTES: u64 = 20 * MIB;

/// Overall HTTP timeout per request
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// What a full run measures
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeedTestPlan {
    pub latency_samples: usize,
    pub download_bytes: u64,
    pub download_streams: usize,
    pub upload_bytes: u64,
    pub latency: bool,
    pub download: bool,
    pub upload: bool,
    pub network_info: bool,
}

impl Default for SpeedTestPlan {
    fn default() -> Self {
        Self {
            latency_samples: DEFAULT_LATENCY_SAMPLES,
            download_bytes: DEFAULT_DOWNLOAD_BYTES,
            download_streams: DEFAULT_DOWNLOAD_STREAMS,
            upload_bytes: DEFAULT_UPLOAD_BYTES,
            latency: true,
            download: true,
            upload: true,
            network_info: true,
        }
    }
}

/// Upload measured from both ends
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UploadMeasurement {
    /// Client-side wall-clock throughput
    pub client: Throughput,
    /// What the server reported receiving
    pub server: UploadResult,
}

/// Results of a full run; skipped phases are `None`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeedTestReport {
    pub server: String,
    pub timestamp: DateTime<Utc>,
    pub latency: Option<LatencySummary>,
    pub download: Option<Throughput>,
    pub upload: Option<UploadMeasurement>,
    pub network: Option<NetworkInfo>,
}

/// HTTP client for a starprobe server
#[derive(Debug, Clone)]
pub struct SpeedTestClient {
    /// Server root, without a trailing slash
    base_url: String,

    /// HTTP client for requests
    client: reqwest::Client,
}

impl SpeedTestClient {
    /// Create a client for the server at `base_url` (e.g. `http://localhost:8000`)
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::http(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self::with_client(base_url, client))
    }

    /// Create a client around an existing `reqwest::Client`
    pub fn with_client(base_url: impl Into<String>, client: reqwest::Client) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url, client }
    }

    /// Server root this client talks to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/test/{}/", self.base_url, path)
    }

    /// Time `samples` sequential probes
    pub async fn measure_latency(&self, samples: usize) -> Result<LatencySummary> {
        if samples == 0 {
            return Err(Error::invalid_input("Latency sample count must be > 0"));
        }

        let url = self.endpoint("ping");
        let mut rtts = Vec::with_capacity(samples);

        for i in 0..samples {
            let start = Instant::now();
            let response = self
                .client
                .get(&url)
                .header(CACHE_CONTROL, "no-store")
                .send()
                .await
                .map_err(|e| request_error("ping", e))?;
            check_status("ping", &response)?;
            response.bytes().await.map_err(|e| request_error("ping", e))?;

            let rtt = start.elapsed().as_secs_f64() * 1000.0;
            debug!(sample = i + 1, rtt_ms = rtt, "Ping");
            rtts.push(rtt);
        }

        LatencySummary::from_samples(rtts)
            .ok_or_else(|| Error::invalid_input("No latency samples collected"))
    }

    /// Download `size` bytes on each of `streams` parallel requests
    ///
    /// Throughput covers all streams together, from the first request until
    /// the last byte of the slowest stream.
    pub async fn measure_download(&self, size: u64, streams: usize) -> Result<Throughput> {
        if streams == 0 {
            return Err(Error::invalid_input("Download stream count must be > 0"));
        }

        let start = Instant::now();
        let per_stream = try_join_all((0..streams).map(|_| self.download_once(size))).await?;
        let elapsed = start.elapsed();

        let total: u64 = per_stream.iter().sum();
        let throughput = Throughput::new(total, elapsed);
        info!(
            bytes = total,
            streams,
            mbps = throughput.mbps,
            "Download complete"
        );
        Ok(throughput)
    }

    /// One download stream, counted chunk by chunk and never buffered whole
    async fn download_once(&self, size: u64) -> Result<u64> {
        let url = format!("{}?size={}", self.endpoint("download"), size);
        let mut response = self
            .client
            .get(&url)
            .header(CACHE_CONTROL, "no-store")
            .send()
            .await
            .map_err(|e| request_error("download", e))?;
        check_status("download", &response)?;

        let declared = response.content_length();
        let mut received: u64 = 0;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| request_error("download", e))?
        {
            received += chunk.len() as u64;
        }

        if let Some(declared) = declared
            && declared != received
        {
            warn!(declared, received, "Download length differs from Content-Length");
        }

        Ok(received)
    }

    /// Upload `size` random bytes in one request
    ///
    /// The payload is generated before the clock starts.
    pub async fn measure_upload(&self, size: u64) -> Result<UploadMeasurement> {
        let payload = random_payload(size);
        let url = self.endpoint("upload");

        let start = Instant::now();
        let response = self
            .client
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(payload)
            .send()
            .await
            .map_err(|e| request_error("upload", e))?;
        check_status("upload", &response)?;
        let server: UploadResult = response
            .json()
            .await
            .map_err(|e| Error::http(format!("Invalid upload response: {}", e)))?;
        let elapsed = start.elapsed();

        let client = Throughput::new(size, elapsed);
        info!(
            bytes = size,
            client_mbps = client.mbps,
            server_mbps = server.throughput_mbps,
            "Upload complete"
        );

        Ok(UploadMeasurement { client, server })
    }

    /// Ask the server how it classifies this client
    pub async fn network_info(&self) -> Result<NetworkInfo> {
        let response = self
            .client
            .get(self.endpoint("network-info"))
            .send()
            .await
            .map_err(|e| request_error("network-info", e))?;
        check_status("network-info", &response)?;

        response
            .json()
            .await
            .map_err(|e| Error::http(format!("Invalid network-info response: {}", e)))
    }

    /// Run the phases enabled in `plan`: latency, download, upload, network info
    pub async fn run(&self, plan: &SpeedTestPlan) -> Result<SpeedTestReport> {
        info!(server = %self.base_url, "Starting speed test");

        let latency = if plan.latency {
            Some(self.measure_latency(plan.latency_samples).await?)
        } else {
            None
        };

        let download = if plan.download {
            Some(
                self.measure_download(plan.download_bytes, plan.download_streams)
                    .await?,
            )
        } else {
            None
        };

        let upload = if plan.upload {
            Some(self.measure_upload(plan.upload_bytes).await?)
        } else {
            None
        };

        let network = if plan.network_info {
            Some(self.network_info().await?)
        } else {
            None
        };

        Ok(SpeedTestReport {
            server: self.base_url.clone(),
            timestamp: Utc::now(),
            latency,
            download,
            upload,
            network,
        })
    }
}

/// Incompressible upload body, so compression on the path cannot help
fn random_payload(size: u64) -> Bytes {
    let mut buf = BytesMut::with_capacity(usize::try_from(size).unwrap_or(0));
    for chunk in RandomByteStream::new(size, DEFAULT_CHUNK_SIZE) {
        buf.extend_from_slice(&chunk);
    }
    buf.freeze()
}

fn request_error(phase: &str, e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout(REQUEST_TIMEOUT)
    } else {
        Error::http(format!("{} request failed: {}", phase, e))
    }
}

fn check_status(phase: &str, response: &reqwest::Response) -> Result<()> {
    let status = response.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(Error::http(format!("{} failed with status: {}", phase, status)))
    }
}

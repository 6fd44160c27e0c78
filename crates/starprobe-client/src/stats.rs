//! Latency and throughput arithmetic.

use serde::{Deserialize, Serialize};
use starprobe_core::upload::MIN_DURATION_SECS;
use std::time::Duration;

/// Summary of a series of round-trip samples
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatencySummary {
    /// Raw round-trip times in milliseconds, in the order they were taken
    pub samples: Vec<f64>,
    pub min_ms: f64,
    pub max_ms: f64,
    pub avg_ms: f64,
    /// Population standard deviation of the samples
    pub jitter_ms: f64,
}

impl LatencySummary {
    /// Summarize samples; `None` when there are none
    pub fn from_samples(samples: Vec<f64>) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }

        let n = samples.len() as f64;
        let avg_ms = samples.iter().sum::<f64>() / n;
        let variance = samples.iter().map(|s| (s - avg_ms).powi(2)).sum::<f64>() / n;
        let min_ms = samples.iter().copied().fold(f64::INFINITY, f64::min);
        let max_ms = samples.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        Some(Self {
            samples,
            min_ms,
            max_ms,
            avg_ms,
            jitter_ms: variance.sqrt(),
        })
    }
}

/// Bytes moved over an interval
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Throughput {
    pub bytes: u64,
    pub seconds: f64,
    pub mbps: f64,
}

impl Throughput {
    /// `bytes * 8 / (seconds * 1e6)`, with the interval floored like the server does
    pub fn new(bytes: u64, elapsed: Duration) -> Self {
        let seconds = elapsed.as_secs_f64().max(MIN_DURATION_SECS);
        Self {
            bytes,
            seconds,
            mbps: (bytes as f64 * 8.0) / (seconds * 1_000_000.0),
        }
    }
}

/// Format a rate for display (e.g. "125 Mbps" or "1.2 Gbps")
pub fn format_speed(mbps: f64) -> String {
    if mbps >= 1000.0 {
        format!("{:.1} Gbps", mbps / 1000.0)
    } else if mbps >= 100.0 {
        format!("{:.0} Mbps", mbps)
    } else if mbps >= 10.0 {
        format!("{:.1} Mbps", mbps)
    } else {
        format!("{:.2} Mbps", mbps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_population_jitter() {
        let summary = LatencySummary::from_samples(vec![10.0, 20.0, 30.0, 40.0]).unwrap();

        assert_eq!(summary.avg_ms, 25.0);
        assert_eq!(summary.min_ms, 10.0);
        assert_eq!(summary.max_ms, 40.0);
        // population variance = (225 + 25 + 25 + 225) / 4 = 125
        assert!((summary.jitter_ms - 125f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_constant_samples_have_no_jitter() {
        let summary = LatencySummary::from_samples(vec![5.5; 10]).unwrap();
        assert_eq!(summary.jitter_ms, 0.0);
        assert_eq!(summary.avg_ms, 5.5);
    }

    #[test]
    fn test_single_and_empty() {
        let one = LatencySummary::from_samples(vec![42.0]).unwrap();
        assert_eq!(one.jitter_ms, 0.0);
        assert_eq!(one.min_ms, one.max_ms);

        assert!(LatencySummary::from_samples(Vec::new()).is_none());
    }

    #[test]
    fn test_throughput_formula() {
        let t = Throughput::new(10 * 1024 * 1024, Duration::from_secs(2));
        assert!((t.mbps - 41.943_04).abs() < 1e-9);

        let instant = Throughput::new(0, Duration::ZERO);
        assert_eq!(instant.seconds, MIN_DURATION_SECS);
        assert_eq!(instant.mbps, 0.0);
    }

    #[test]
    fn test_format_speed() {
        assert_eq!(format_speed(1200.0), "1.2 Gbps");
        assert_eq!(format_speed(500.0), "500 Mbps");
        assert_eq!(format_speed(50.5), "50.5 Mbps");
        assert_eq!(format_speed(0.5), "0.50 Mbps");
    }
}

//! Latency probe
//!
//! The probe does nothing on purpose. Round-trip time and jitter are computed
//! by the caller from repeated samples; anything the server does here would
//! show up as measured latency.

/// Acknowledgment returned by the latency probe
///
/// Zero-sized: answering a probe allocates nothing and touches no I/O.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProbeAck;

/// Answer a latency probe
#[inline]
pub fn latency_probe() -> ProbeAck {
    ProbeAck
}

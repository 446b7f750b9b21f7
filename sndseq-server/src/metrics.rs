//! # Shell Metrics
//!
//! Counters and a latency histogram for the device shell: ioctls served,
//! ioctls rejected, open sessions and per-ioctl latency.
//!
//! ## Design Principles
//! 1. **Accumulator Pattern**: Atomic counters aggregate events cheaply.
//! 2. **Fixed Buckets**: Histogram buckets live in a contiguous array.
//! 3. **Plain Snapshots**: Readers get plain structs, writers never block.
//!
//! ## Notes
//! - Bucket boundaries are microseconds. Dispatch is CPU-only, so the scale
//!   starts well below the network-facing defaults.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Default latency bucket boundaries in microseconds.
pub const DEFAULT_LATENCY_BUCKETS_US: [u64; 8] = [1, 2, 5, 10, 50, 100, 500, 1_000];

/// Snapshot of all shell metrics at a point in time.
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    /// Total number of ioctl requests observed.
    pub ioctls_total: u64,
    /// Number of ioctl requests answered with an error.
    pub ioctls_rejected: u64,
    /// Bytes consumed by the write path.
    pub bytes_written: u64,
    /// Sessions currently open.
    pub open_sessions: u64,
    pub latency: LatencySnapshot,
}

/// Snapshot of the latency histogram.
#[derive(Debug, Clone)]
pub struct LatencySnapshot {
    pub bounds_us: Vec<u64>,
    /// Bucket counts, including the overflow bucket at the end.
    pub buckets: Vec<u64>,
    pub samples: u64,
    pub sum_us: u64,
}

/// Thread-safe metrics aggregator shared by every session.
///
/// `Ordering::Relaxed` is enough: no reader needs cross-field consistency.
#[derive(Debug)]
pub struct Metrics {
    ioctls_total: AtomicU64,
    ioctls_rejected: AtomicU64,
    bytes_written: AtomicU64,
    open_sessions: AtomicU64,
    latency: LatencyHistogram,
}

impl Metrics {
    pub fn new() -> Self {
        Metrics::with_latency_buckets(DEFAULT_LATENCY_BUCKETS_US.to_vec())
    }

    /// Creates an aggregator with custom ascending bucket bounds (microseconds).
    pub fn with_latency_buckets(bounds_us: Vec<u64>) -> Self {
        Metrics {
            ioctls_total: AtomicU64::new(0),
            ioctls_rejected: AtomicU64::new(0),
            bytes_written: AtomicU64::new(0),
            open_sessions: AtomicU64::new(0),
            latency: LatencyHistogram::new(bounds_us),
        }
    }

    /// Records a completed ioctl and its latency.
    pub fn record_ioctl(&self, latency: Duration, ok: bool) {
        self.ioctls_total.fetch_add(1, Ordering::Relaxed);
        if !ok {
            self.ioctls_rejected.fetch_add(1, Ordering::Relaxed);
        }
        self.latency.record(latency);
    }

    pub fn record_write(&self, bytes: usize) {
        self.bytes_written.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub fn record_open(&self) {
        self.open_sessions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_close(&self) {
        self.open_sessions.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            ioctls_total: self.ioctls_total.load(Ordering::Relaxed),
            ioctls_rejected: self.ioctls_rejected.load(Ordering::Relaxed),
            bytes_written: self.bytes_written.load(Ordering::Relaxed),
            open_sessions: self.open_sessions.load(Ordering::Relaxed),
            latency: self.latency.snapshot(),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Metrics::new()
    }
}

/// Fixed-bucket latency histogram with a linear bucket scan.
#[derive(Debug)]
pub struct LatencyHistogram {
    bounds_us: Vec<u64>,
    buckets: Vec<AtomicU64>,
    sum_us: AtomicU64,
    samples: AtomicU64,
}

impl LatencyHistogram {
    pub fn new(bounds_us: Vec<u64>) -> Self {
        let buckets = (0..=bounds_us.len()).map(|_| AtomicU64::new(0)).collect();
        LatencyHistogram {
            bounds_us,
            buckets,
            sum_us: AtomicU64::new(0),
            samples: AtomicU64::new(0),
        }
    }

    pub fn record(&self, latency: Duration) {
        let micros = u64::try_from(latency.as_micros()).unwrap_or(u64::MAX);
        self.samples.fetch_add(1, Ordering::Relaxed);
        self.sum_us.fetch_add(micros, Ordering::Relaxed);

        let idx = self
            .bounds_us
            .iter()
            .position(|&bound| micros <= bound)
            .unwrap_or(self.bounds_us.len());
        self.buckets[idx].fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> LatencySnapshot {
        LatencySnapshot {
            bounds_us: self.bounds_us.clone(),
            buckets: self.buckets.iter().map(|b| b.load(Ordering::Relaxed)).collect(),
            samples: self.samples.load(Ordering::Relaxed),
            sum_us: self.sum_us.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_ioctls_and_rejections() {
        let metrics = Metrics::new();
        metrics.record_ioctl(Duration::from_micros(1), true);
        metrics.record_ioctl(Duration::from_micros(3), false);
        let snap = metrics.snapshot();
        assert_eq!(snap.ioctls_total, 2);
        assert_eq!(snap.ioctls_rejected, 1);
        assert_eq!(snap.latency.samples, 2);
        assert_eq!(snap.latency.sum_us, 4);
    }

    #[test]
    fn tracks_sessions_and_writes() {
        let metrics = Metrics::default();
        metrics.record_open();
        metrics.record_open();
        metrics.record_close();
        metrics.record_write(12);
        let snap = metrics.snapshot();
        assert_eq!(snap.open_sessions, 1);
        assert_eq!(snap.bytes_written, 12);
    }

    #[test]
    fn overflow_bucket_catches_slow_samples() {
        let histogram = LatencyHistogram::new(vec![1, 10]);
        histogram.record(Duration::from_micros(1));
        histogram.record(Duration::from_micros(7));
        histogram.record(Duration::from_millis(5));
        assert_eq!(histogram.snapshot().buckets, vec![1, 1, 1]);
    }
}

//! Counters and latency for bridged calls.

use hdrhistogram::Histogram;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Which adapter a call went through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Sync,
    Async,
}

/// Bridge metrics collector
#[derive(Debug)]
pub struct Metrics {
    sync_calls: AtomicU64,
    async_calls: AtomicU64,
    nested_drives: AtomicU64,
    offloads: AtomicU64,
    failed_calls: AtomicU64,

    // end-to-end call latency in nanoseconds
    latency_histogram: RwLock<Histogram<u64>>,

    start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        // 3 significant figures, max value of 1 hour in nanoseconds
        let histogram = Histogram::new_with_max(3_600_000_000_000, 3)
            .expect("Failed to create histogram");

        Self {
            sync_calls: AtomicU64::new(0),
            async_calls: AtomicU64::new(0),
            nested_drives: AtomicU64::new(0),
            offloads: AtomicU64::new(0),
            failed_calls: AtomicU64::new(0),
            latency_histogram: RwLock::new(histogram),
            start_time: Instant::now(),
        }
    }

    /// Record a completed call and how long it took.
    pub fn record_call(&self, kind: CallKind, duration: Duration) {
        match kind {
            CallKind::Sync => self.sync_calls.fetch_add(1, Ordering::Relaxed),
            CallKind::Async => self.async_calls.fetch_add(1, Ordering::Relaxed),
        };

        if let Some(mut hist) = self.latency_histogram.try_write() {
            let _ = hist.record(duration.as_nanos() as u64);
        }
    }

    pub fn record_nested_drive(&self) {
        self.nested_drives.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_offload(&self) {
        self.offloads.fetch_add(1, Ordering::Relaxed);
    }

    /// A call that ended in a bridge error or a panic.
    pub fn record_failure(&self) {
        self.failed_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let histogram = self.latency_histogram.read();

        MetricsSnapshot {
            uptime: self.start_time.elapsed(),
            sync_calls: self.sync_calls.load(Ordering::Relaxed),
            async_calls: self.async_calls.load(Ordering::Relaxed),
            nested_drives: self.nested_drives.load(Ordering::Relaxed),
            offloads: self.offloads.load(Ordering::Relaxed),
            failed_calls: self.failed_calls.load(Ordering::Relaxed),
            avg_latency_ns: if histogram.len() > 0 {
                histogram.mean() as u64
            } else {
                0
            },
            p50_latency_ns: histogram.value_at_quantile(0.50),
            p99_latency_ns: histogram.value_at_quantile(0.99),
            max_latency_ns: histogram.max(),
        }
    }

    pub fn reset(&self) {
        self.sync_calls.store(0, Ordering::Relaxed);
        self.async_calls.store(0, Ordering::Relaxed);
        self.nested_drives.store(0, Ordering::Relaxed);
        self.offloads.store(0, Ordering::Relaxed);
        self.failed_calls.store(0, Ordering::Relaxed);

        if let Some(mut hist) = self.latency_histogram.try_write() {
            hist.reset();
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub uptime: Duration,
    pub sync_calls: u64,
    pub async_calls: u64,
    pub nested_drives: u64,
    pub offloads: u64,
    pub failed_calls: u64,
    pub avg_latency_ns: u64,
    pub p50_latency_ns: u64,
    pub p99_latency_ns: u64,
    pub max_latency_ns: u64,
}

impl MetricsSnapshot {
    pub fn total_calls(&self) -> u64 {
        self.sync_calls + self.async_calls
    }
}

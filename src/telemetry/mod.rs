//! Call metrics for the bridge.
//!
//! Adapters created by the plain entry points report to [`global_metrics`];
//! each [`Bridge`](crate::bridge::Bridge) keeps its own collector.

#[cfg(feature = "telemetry")]
pub mod metrics;

#[cfg(feature = "telemetry")]
pub use metrics::{CallKind, Metrics, MetricsSnapshot};

use std::sync::{Arc, OnceLock};

static GLOBAL_METRICS: OnceLock<Arc<Metrics>> = OnceLock::new();

pub fn global_metrics() -> Arc<Metrics> {
    GLOBAL_METRICS.get_or_init(|| Arc::new(Metrics::new())).clone()
}

// Stub implementations when telemetry is disabled
#[cfg(not(feature = "telemetry"))]
pub mod metrics {
    use std::time::Duration;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum CallKind {
        Sync,
        Async,
    }

    #[derive(Debug, Clone, Default)]
    pub struct Metrics;

    impl Metrics {
        pub fn new() -> Self { Self }
        pub fn record_call(&self, _: CallKind, _: Duration) {}
        pub fn record_nested_drive(&self) {}
        pub fn record_offload(&self) {}
        pub fn record_failure(&self) {}
        pub fn snapshot(&self) -> MetricsSnapshot { MetricsSnapshot::default() }
        pub fn reset(&self) {}
    }

    #[derive(Debug, Clone, Default)]
    pub struct MetricsSnapshot {
        pub sync_calls: u64,
        pub async_calls: u64,
        pub nested_drives: u64,
        pub offloads: u64,
        pub failed_calls: u64,
    }

    impl MetricsSnapshot {
        pub fn total_calls(&self) -> u64 {
            self.sync_calls + self.async_calls
        }
    }
}

#[cfg(not(feature = "telemetry"))]
pub use metrics::{CallKind, Metrics, MetricsSnapshot};

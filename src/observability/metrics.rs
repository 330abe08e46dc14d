//! Metrics collection and exposition.
//!
//! # Metrics
//! - `volctl_diagnostic_sessions` (gauge): diagnostic sessions currently running
//! - `volctl_shutdown_total` (counter): teardown executions (at most 1 per run)
//! - `volctl_uptime_seconds` (gauge): process uptime, refreshed on scrape
//!
//! # Design Decisions
//! - The Prometheus recorder is installed lazily, on first use of [`handle`]
//! - Recording without an installed recorder is a no-op

use std::sync::OnceLock;
use std::time::Duration;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

pub const DIAGNOSTIC_SESSIONS: &str = "volctl_diagnostic_sessions";
pub const SHUTDOWN_TOTAL: &str = "volctl_shutdown_total";
pub const UPTIME_SECONDS: &str = "volctl_uptime_seconds";

/// Handle to the process-wide Prometheus recorder, installing it on first call.
pub fn handle() -> PrometheusHandle {
    static HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();
    HANDLE
        .get_or_init(|| {
            let recorder = PrometheusBuilder::new().build_recorder();
            let handle = recorder.handle();
            if metrics::set_global_recorder(recorder).is_err() {
                tracing::debug!("metrics recorder already installed");
            }
            handle
        })
        .clone()
}

pub fn record_sessions(active: usize) {
    metrics::gauge!(DIAGNOSTIC_SESSIONS).set(active as f64);
}

pub fn record_shutdown() {
    metrics::counter!(SHUTDOWN_TOTAL).increment(1);
}

pub fn record_uptime(uptime: Duration) {
    metrics::gauge!(UPTIME_SECONDS).set(uptime.as_secs_f64());
}

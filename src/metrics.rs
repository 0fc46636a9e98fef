//! Simple metrics collection for observability
//!
//! Lightweight atomic counters with a Prometheus text export, served on
//! `GET /metrics`. Zero allocations in the hot path.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Core metrics collected by the gateway
pub struct Metrics {
    /// Server start time
    start_time: Instant,

    /// Inbound requests that reached the admission gate
    pub requests_total: AtomicU64,
    /// Requests shed by the rate limiter (429)
    pub requests_rejected: AtomicU64,
    /// Requests rejected for decode or validation failures (400)
    pub requests_invalid: AtomicU64,

    /// Batches completed successfully
    pub batches_succeeded: AtomicU64,
    /// Batches that failed in fan-out
    pub batches_failed: AtomicU64,
    /// URLs fetched across all successful batches
    pub urls_fetched: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Metrics {
            start_time: Instant::now(),
            requests_total: AtomicU64::new(0),
            requests_rejected: AtomicU64::new(0),
            requests_invalid: AtomicU64::new(0),
            batches_succeeded: AtomicU64::new(0),
            batches_failed: AtomicU64::new(0),
            urls_fetched: AtomicU64::new(0),
        }
    }

    /// Get server uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Export metrics in Prometheus text format
    pub fn export_prometheus(&self) -> String {
        let mut output = String::with_capacity(1024);

        output.push_str("# HELP fangate_uptime_seconds Time since server start in seconds\n");
        output.push_str("# TYPE fangate_uptime_seconds gauge\n");
        output.push_str(&format!(
            "fangate_uptime_seconds {}\n\n",
            self.uptime_seconds()
        ));

        output.push_str("# HELP fangate_requests_total Inbound requests received\n");
        output.push_str("# TYPE fangate_requests_total counter\n");
        output.push_str(&format!(
            "fangate_requests_total {}\n\n",
            self.requests_total.load(Ordering::Relaxed)
        ));

        output.push_str("# HELP fangate_requests_rejected Requests shed by the rate limiter\n");
        output.push_str("# TYPE fangate_requests_rejected counter\n");
        output.push_str(&format!(
            "fangate_requests_rejected {}\n\n",
            self.requests_rejected.load(Ordering::Relaxed)
        ));

        output.push_str(
            "# HELP fangate_requests_invalid Requests rejected for malformed or invalid batches\n",
        );
        output.push_str("# TYPE fangate_requests_invalid counter\n");
        output.push_str(&format!(
            "fangate_requests_invalid {}\n\n",
            self.requests_invalid.load(Ordering::Relaxed)
        ));

        output.push_str("# HELP fangate_batches_succeeded Batches completed successfully\n");
        output.push_str("# TYPE fangate_batches_succeeded counter\n");
        output.push_str(&format!(
            "fangate_batches_succeeded {}\n\n",
            self.batches_succeeded.load(Ordering::Relaxed)
        ));

        output.push_str("# HELP fangate_batches_failed Batches that failed in fan-out\n");
        output.push_str("# TYPE fangate_batches_failed counter\n");
        output.push_str(&format!(
            "fangate_batches_failed {}\n\n",
            self.batches_failed.load(Ordering::Relaxed)
        ));

        output.push_str("# HELP fangate_urls_fetched URLs fetched in successful batches\n");
        output.push_str("# TYPE fangate_urls_fetched counter\n");
        output.push_str(&format!(
            "fangate_urls_fetched {}\n",
            self.urls_fetched.load(Ordering::Relaxed)
        ));

        output
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

//! Per-request tracking.
//!
//! [`MetricsHub::begin_request`] counts the request and hands back a
//! [`RequestGuard`]. The guard records the elapsed time exactly once: when
//! [`RequestGuard::finish`] is called, or when it is dropped because the
//! handler returned early, panicked, or the connection went away and the
//! request future was cancelled.

use std::time::Instant;

use tracing::trace;

use crate::hub::SharedMetricsHub;
use crate::series::HttpMethod;

/// One-shot completion handle for an in-flight request.
#[must_use = "dropping the guard immediately records a near-zero latency"]
pub struct RequestGuard {
    hub: SharedMetricsHub,
    method: Option<HttpMethod>,
    started: Instant,
    recorded: bool,
}

impl RequestGuard {
    pub(crate) fn new(hub: SharedMetricsHub, method: Option<HttpMethod>) -> Self {
        Self {
            hub,
            method,
            started: Instant::now(),
            recorded: false,
        }
    }

    /// Method counted for this request, if it was one of the tracked set.
    pub fn method(&self) -> Option<HttpMethod> {
        self.method
    }

    /// Record the request latency now.
    pub fn finish(mut self) {
        self.record();
    }

    fn record(&mut self) {
        if self.recorded {
            return;
        }
        self.recorded = true;
        let elapsed_ms = self.started.elapsed().as_secs_f64() * 1_000.0;
        trace!(method = ?self.method, elapsed_ms, "request completed");
        self.hub.latency().record_endpoint_latency(elapsed_ms);
    }
}

impl Drop for RequestGuard {
    fn drop(&mut self) {
        self.record();
    }
}

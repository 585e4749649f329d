//! The metrics hub.
//!
//! A [`MetricsHub`] owns every piece of mutable metrics state: the counter
//! registry, the latency windows and the CPU baseline. Request middleware,
//! business-logic trackers and the export scheduler all share one hub through
//! an `Arc`; tests build independent hubs.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;

use crate::interceptor::RequestGuard;
use crate::latency::{LatencyAccumulator, LatencyAverages};
use crate::registry::CounterRegistry;
use crate::sampler::{HostProbe, SystemSampler};
use crate::series::{AuthOutcome, HttpMethod};

/// Request counts by method.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RequestCounts {
    /// GET requests.
    #[serde(rename = "GET")]
    pub get: u64,
    /// POST requests.
    #[serde(rename = "POST")]
    pub post: u64,
    /// PUT requests.
    #[serde(rename = "PUT")]
    pub put: u64,
    /// DELETE requests.
    #[serde(rename = "DELETE")]
    pub delete: u64,
}

impl RequestCounts {
    /// Count for one method.
    pub fn count(&self, method: HttpMethod) -> u64 {
        match method {
            HttpMethod::Get => self.get,
            HttpMethod::Post => self.post,
            HttpMethod::Put => self.put,
            HttpMethod::Delete => self.delete,
        }
    }
}

/// Authentication attempts by outcome.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AuthAttempts {
    /// Accepted logins.
    pub success: u64,
    /// Rejected logins.
    pub failure: u64,
}

/// Last sampled host utilization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemUsage {
    /// Process CPU percentage.
    pub cpu_percentage: f64,
    /// Host memory percentage.
    pub memory_percentage: f64,
}

/// Pizza counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PizzaStats {
    /// Pizzas sold.
    pub sold: u64,
    /// Failed creations.
    pub creation_failures: u64,
    /// Accumulated revenue.
    pub revenue: f64,
}

/// Latency means of the last completed window, in milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LatencyStats {
    /// Request-handling latency.
    pub endpoint_latency: f64,
    /// Pizza-creation latency.
    pub pizza_creation_latency: f64,
}

/// Point-in-time copy of every reported value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricSnapshot {
    /// Cumulative requests by method.
    pub requests_by_method: RequestCounts,
    /// Logged-in users.
    pub active_users: u64,
    /// Cumulative auth attempts.
    pub auth_attempts: AuthAttempts,
    /// Last sampled host utilization.
    pub system: SystemUsage,
    /// Cumulative pizza counters.
    pub pizzas: PizzaStats,
    /// Latency means of the last completed window.
    pub latency: LatencyStats,
}

/// What [`MetricsHub::close_window`] wrote back.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WindowSummary {
    /// Drained latency window.
    pub latency: LatencyAverages,
    /// Freshly sampled system utilization.
    pub system: SystemUsage,
}

/// Owner of all metrics state for one process.
pub struct MetricsHub {
    registry: CounterRegistry,
    latency: LatencyAccumulator,
    sampler: SystemSampler,
    // Snapshots take the read side, window close takes the write side, so a
    // snapshot never observes system/latency gauges from two different windows.
    window: RwLock<()>,
}

impl MetricsHub {
    /// Create a hub sampling through the given sampler.
    pub fn new(sampler: SystemSampler) -> Self {
        Self {
            registry: CounterRegistry::new(),
            latency: LatencyAccumulator::new(),
            sampler,
            window: RwLock::new(()),
        }
    }

    /// Create a hub over a custom host probe.
    pub fn with_probe(probe: impl HostProbe + 'static) -> Self {
        Self::new(SystemSampler::new(probe))
    }

    /// Create a hub reading the real host.
    pub fn host() -> Self {
        Self::new(SystemSampler::host())
    }

    /// Wrap the hub for sharing.
    pub fn into_shared(self) -> SharedMetricsHub {
        Arc::new(self)
    }

    /// Counter registry.
    pub fn registry(&self) -> &CounterRegistry {
        &self.registry
    }

    /// Latency windows.
    pub fn latency(&self) -> &LatencyAccumulator {
        &self.latency
    }

    /// System sampler.
    pub fn sampler(&self) -> &SystemSampler {
        &self.sampler
    }

    /// Count an inbound request and start timing it.
    ///
    /// Methods outside GET/POST/PUT/DELETE are not counted but are still
    /// timed.
    pub fn begin_request(self: &Arc<Self>, method: &str) -> RequestGuard {
        let method = method.parse::<HttpMethod>().ok();
        match method {
            Some(method) => self.registry.record_request(method),
            None => tracing::debug!("untracked request method, not counted"),
        }
        RequestGuard::new(Arc::clone(self), method)
    }

    /// Copy every reported value.
    pub fn snapshot(&self) -> MetricSnapshot {
        let _window = self.window.read();
        let r = &self.registry;
        MetricSnapshot {
            requests_by_method: RequestCounts {
                get: r.requests(HttpMethod::Get),
                post: r.requests(HttpMethod::Post),
                put: r.requests(HttpMethod::Put),
                delete: r.requests(HttpMethod::Delete),
            },
            active_users: r.active_users(),
            auth_attempts: AuthAttempts {
                success: r.auth_attempts(AuthOutcome::Success),
                failure: r.auth_attempts(AuthOutcome::Failure),
            },
            system: SystemUsage {
                cpu_percentage: r.cpu_percentage(),
                memory_percentage: r.memory_percentage(),
            },
            pizzas: PizzaStats {
                sold: r.pizzas_sold(),
                creation_failures: r.pizza_creation_failures(),
                revenue: r.revenue(),
            },
            latency: LatencyStats {
                endpoint_latency: r.endpoint_latency(),
                pizza_creation_latency: r.pizza_creation_latency(),
            },
        }
    }

    /// Close the current window.
    ///
    /// Drains the latency windows once, samples CPU and memory, and
    /// overwrites the system and latency gauges with the results. An
    /// unreadable host produces a single warning.
    pub fn close_window(&self) -> WindowSummary {
        let _window = self.window.write();
        let latency = self.latency.drain_averages();
        let system = self.sampler.sample();
        self.registry
            .set_system(system.cpu_percentage, system.memory_percentage);
        self.registry
            .set_latency(latency.endpoint_ms, latency.pizza_creation_ms);
        WindowSummary { latency, system }
    }
}

/// Shared hub handle.
pub type SharedMetricsHub = Arc<MetricsHub>;

/// Create a shared hub reading the real host.
pub fn new_shared_hub() -> SharedMetricsHub {
    Arc::new(MetricsHub::host())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampler::tests::ScriptedProbe;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tracing::{Event, Level, Subscriber};
    use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

    fn hub() -> MetricsHub {
        let probe = ScriptedProbe::with_cpu(&[Some(Duration::ZERO), Some(Duration::ZERO)])
            .with_memory(1_000, 250);
        MetricsHub::with_probe(probe)
    }

    #[test]
    fn test_snapshot_reflects_registry() {
        let hub = hub();
        hub.registry().record_request(HttpMethod::Put);
        hub.registry().user_activated();
        hub.registry().record_auth(AuthOutcome::Failure);
        hub.registry().record_pizzas_sold(2);

        let snapshot = hub.snapshot();
        assert_eq!(snapshot.requests_by_method.count(HttpMethod::Put), 1);
        assert_eq!(snapshot.active_users, 1);
        assert_eq!(snapshot.auth_attempts.failure, 1);
        assert_eq!(snapshot.pizzas.sold, 2);
        assert_eq!(snapshot.latency, LatencyStats::default());
    }

    #[test]
    fn test_close_window_overwrites_derived_values() {
        let hub = hub();
        hub.latency().record_endpoint_latency(10.0);
        hub.latency().record_endpoint_latency(30.0);
        hub.latency().record_domain_latency(500.0);

        let summary = hub.close_window();
        assert_eq!(summary.latency.endpoint_ms, 20.0);
        assert_eq!(summary.system.memory_percentage, 75.0);

        let snapshot = hub.snapshot();
        assert_eq!(snapshot.latency.endpoint_latency, 20.0);
        assert_eq!(snapshot.latency.pizza_creation_latency, 500.0);
        assert_eq!(snapshot.system.memory_percentage, 75.0);

        // Next window is empty; cumulative counters are untouched.
        hub.registry().record_request(HttpMethod::Get);
        hub.close_window();
        let snapshot = hub.snapshot();
        assert_eq!(snapshot.latency.endpoint_latency, 0.0);
        assert_eq!(snapshot.requests_by_method.get, 1);
    }

    #[test]
    fn test_snapshot_json_shape() {
        let hub = hub();
        hub.registry().record_request(HttpMethod::Get);
        let json = serde_json::to_value(hub.snapshot()).unwrap();

        assert_eq!(json["requestsByMethod"]["GET"], 1);
        assert_eq!(json["authAttempts"]["success"], 0);
        assert!(json["system"].get("cpuPercentage").is_some());
        assert!(json["pizzas"].get("creationFailures").is_some());
        assert!(json["latency"].get("pizzaCreationLatency").is_some());
    }

    #[test]
    fn test_independent_hubs() {
        let a = hub();
        let b = hub();
        a.registry().user_activated();
        assert_eq!(a.snapshot().active_users, 1);
        assert_eq!(b.snapshot().active_users, 0);
    }

    #[derive(Clone, Default)]
    struct WarnCounter(Arc<AtomicUsize>);

    impl<S: Subscriber> Layer<S> for WarnCounter {
        fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
            if *event.metadata().level() == Level::WARN {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    #[test]
    fn test_close_window_warns_once_when_host_unreadable() {
        let hub = MetricsHub::with_probe(ScriptedProbe::default());
        let warnings = WarnCounter::default();
        let subscriber = tracing_subscriber::registry().with(warnings.clone());

        let summary = tracing::subscriber::with_default(subscriber, || hub.close_window());

        assert_eq!(summary.system, SystemUsage::default());
        assert_eq!(warnings.0.load(Ordering::SeqCst), 1);
    }
}

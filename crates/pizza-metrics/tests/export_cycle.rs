//! End-to-end export cycles against an in-memory transport.

use std::sync::Arc;
use std::time::Duration;

use pizza_metrics::{
    ExportScheduler, Exporter, HostProbe, MemoryReading, MetricsHub, MockTransport, SharedMetricsHub,
};
use serde_json::Value;

/// Probe with fixed readings: no CPU time consumed, 40% memory in use.
struct FixedProbe;

impl HostProbe for FixedProbe {
    fn process_cpu_time(&mut self) -> Option<Duration> {
        Some(Duration::ZERO)
    }

    fn memory(&mut self) -> Option<MemoryReading> {
        Some(MemoryReading {
            total_bytes: 1_000,
            available_bytes: 600,
        })
    }
}

fn setup() -> (SharedMetricsHub, Arc<MockTransport>, ExportScheduler) {
    let hub = MetricsHub::with_probe(FixedProbe).into_shared();
    let transport = Arc::new(MockTransport::new());
    let exporter = Exporter::new(transport.clone(), "jwt-pizza-service-test");
    let scheduler = ExportScheduler::new(hub.clone(), exporter, Duration::from_secs(10));
    (hub, transport, scheduler)
}

fn metric(body: &Value) -> &Value {
    &body["resourceMetrics"][0]["scopeMetrics"][0]["metrics"][0]
}

fn data_point(body: &Value) -> &Value {
    &metric(body)["sum"]["dataPoints"][0]
}

fn attributes(body: &Value) -> Vec<(String, String)> {
    data_point(body)["attributes"]
        .as_array()
        .map(|attrs| {
            attrs
                .iter()
                .map(|a| {
                    (
                        a["key"].as_str().unwrap_or_default().to_string(),
                        a["value"]["stringValue"].as_str().unwrap_or_default().to_string(),
                    )
                })
                .collect()
        })
        .unwrap_or_default()
}

fn find<'a>(bodies: &'a [Value], name: &str, dimension: Option<(&str, &str)>) -> &'a Value {
    bodies
        .iter()
        .find(|body| {
            metric(body)["name"] == name
                && dimension.map_or(true, |(k, v)| {
                    attributes(body).contains(&(k.to_string(), v.to_string()))
                })
        })
        .unwrap_or_else(|| panic!("no payload for {name} {dimension:?}"))
}

#[tokio::test]
async fn test_tick_pushes_every_series_value() {
    let (hub, transport, scheduler) = setup();

    for _ in 0..5 {
        hub.on_user_activated();
    }
    hub.begin_request("GET").finish();
    hub.begin_request("GET").finish();
    hub.begin_request("POST").finish();
    hub.on_login_success();
    hub.on_login_failure();
    hub.on_pizzas_sold(3);
    hub.on_pizza_revenue(0.05).unwrap();
    hub.on_pizza_creation_failed();

    scheduler.tick().settled().await;

    let bodies = transport.received();
    assert_eq!(bodies.len(), 14);

    let active = find(&bodies, "activeUsers", None);
    assert_eq!(data_point(active)["asInt"], 5);
    assert_eq!(
        attributes(active),
        [("source".to_string(), "jwt-pizza-service-test".to_string())]
    );
    assert_eq!(metric(active)["unit"], "1");
    assert_eq!(metric(active)["sum"]["isMonotonic"], true);
    assert_eq!(
        metric(active)["sum"]["aggregationTemporality"],
        "AGGREGATION_TEMPORALITY_CUMULATIVE"
    );

    let get = find(&bodies, "methods", Some(("method", "GET")));
    assert_eq!(data_point(get)["asInt"], 2);
    assert_eq!(attributes(get)[0].0, "source");

    let delete = find(&bodies, "methods", Some(("method", "DELETE")));
    assert_eq!(data_point(delete)["asInt"], 0);

    let failures = find(&bodies, "authAttempts", Some(("status", "failure")));
    assert_eq!(data_point(failures)["asInt"], 1);

    let sold = find(&bodies, "pizzas", Some(("pizzaMetric", "sold")));
    assert_eq!(data_point(sold)["asInt"], 3);

    let revenue = find(&bodies, "pizzas", Some(("pizzaMetric", "revenue")));
    assert_eq!(data_point(revenue)["asDouble"], 0.05);
    assert!(data_point(revenue).get("asInt").is_none());

    let cpu = find(&bodies, "cpuPercentage", None);
    assert!(data_point(cpu)["asDouble"].is_number());
}

#[tokio::test]
async fn test_derived_values_trail_by_one_tick() {
    let (hub, transport, scheduler) = setup();

    hub.latency().record_endpoint_latency(10.0);
    hub.latency().record_endpoint_latency(30.0);
    hub.on_pizza_creation_latency(250.0).unwrap();

    scheduler.tick().settled().await;
    let first = transport.received();
    assert_eq!(
        data_point(find(&first, "endpointLatency", None))["asDouble"],
        0.0
    );
    assert_eq!(
        data_point(find(&first, "memoryPercentage", None))["asDouble"],
        0.0
    );

    scheduler.tick().settled().await;
    let second: Vec<Value> = transport.received().split_off(14);
    assert_eq!(
        data_point(find(&second, "endpointLatency", None))["asDouble"],
        20.0
    );
    assert_eq!(
        data_point(find(&second, "pizzaCreationLatency", None))["asDouble"],
        250.0
    );
    assert_eq!(
        data_point(find(&second, "memoryPercentage", None))["asDouble"],
        40.0
    );
}

#[tokio::test]
async fn test_failed_push_does_not_block_others() {
    let (hub, transport, scheduler) = setup();
    transport.fail_series("cpuPercentage");
    hub.on_user_activated();

    let report = scheduler.tick();
    assert_eq!(report.dispatched, 14);
    report.settled().await;

    // Every push was attempted, including the failing one.
    assert_eq!(transport.received().len(), 14);

    hub.on_user_activated();
    scheduler.tick().settled().await;
    let bodies = transport.received().split_off(14);
    assert_eq!(data_point(find(&bodies, "activeUsers", None))["asInt"], 2);
}

#[tokio::test]
async fn test_rejected_pushes_are_swallowed() {
    let (hub, transport, scheduler) = setup();
    transport.set_reject_status(Some(401));
    hub.on_login_success();

    scheduler.tick().settled().await;
    assert_eq!(transport.received().len(), 14);

    // Counters are cumulative and unaffected by failed delivery.
    assert_eq!(hub.snapshot().auth_attempts.success, 1);
}

#[tokio::test]
async fn test_payloads_share_one_snapshot() {
    let (hub, transport, scheduler) = setup();
    hub.on_pizzas_sold(4);

    let report = scheduler.tick();
    // Events after the snapshot land in the next tick.
    hub.on_pizzas_sold(1);
    report.settled().await;

    let bodies = transport.received();
    let sold = find(&bodies, "pizzas", Some(("pizzaMetric", "sold")));
    assert_eq!(data_point(sold)["asInt"], 4);
    assert_eq!(hub.snapshot().pizzas.sold, 5);
}

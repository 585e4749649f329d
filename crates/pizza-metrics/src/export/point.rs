//! Single data points and their expansion from a snapshot.

use crate::hub::MetricSnapshot;
use crate::series::{
    self, AuthOutcome, HttpMethod, PizzaMetric, METHOD_KEY, PIZZA_METRIC_KEY, STATUS_KEY,
};

/// Numeric value of a data point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricValue {
    /// Encoded as `asInt`.
    Int(u64),
    /// Encoded as `asDouble`.
    Double(f64),
}

impl From<u64> for MetricValue {
    fn from(value: u64) -> Self {
        MetricValue::Int(value)
    }
}

impl From<f64> for MetricValue {
    fn from(value: f64) -> Self {
        MetricValue::Double(value)
    }
}

/// One value of one series, with its series-specific dimensions.
///
/// The `source` attribute is added by the exporter, not stored here.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricPoint {
    /// Series name.
    pub name: String,
    /// Value.
    pub value: MetricValue,
    /// Series dimensions as `(key, value)` pairs.
    pub dimensions: Vec<(String, String)>,
}

impl MetricPoint {
    /// Create a point without dimensions.
    pub fn new(name: impl Into<String>, value: impl Into<MetricValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            dimensions: Vec::new(),
        }
    }

    /// Add a dimension.
    pub fn with_dimension(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.dimensions.push((key.into(), value.into()));
        self
    }
}

impl MetricSnapshot {
    /// Expand the snapshot into one point per exported series value.
    pub fn series_points(&self) -> Vec<MetricPoint> {
        let mut points = Vec::with_capacity(14);

        for method in HttpMethod::ALL {
            points.push(
                MetricPoint::new(series::METHODS, self.requests_by_method.count(method))
                    .with_dimension(METHOD_KEY, method.as_str()),
            );
        }

        points.push(MetricPoint::new(series::ACTIVE_USERS, self.active_users));

        for (outcome, count) in [
            (AuthOutcome::Success, self.auth_attempts.success),
            (AuthOutcome::Failure, self.auth_attempts.failure),
        ] {
            points.push(
                MetricPoint::new(series::AUTH_ATTEMPTS, count)
                    .with_dimension(STATUS_KEY, outcome.as_str()),
            );
        }

        points.push(MetricPoint::new(
            series::CPU_PERCENTAGE,
            self.system.cpu_percentage,
        ));
        points.push(MetricPoint::new(
            series::MEMORY_PERCENTAGE,
            self.system.memory_percentage,
        ));

        for (metric, value) in [
            (PizzaMetric::Sold, MetricValue::Int(self.pizzas.sold)),
            (
                PizzaMetric::CreationFailures,
                MetricValue::Int(self.pizzas.creation_failures),
            ),
            (PizzaMetric::Revenue, MetricValue::Double(self.pizzas.revenue)),
        ] {
            points.push(
                MetricPoint::new(series::PIZZAS, value)
                    .with_dimension(PIZZA_METRIC_KEY, metric.as_str()),
            );
        }

        points.push(MetricPoint::new(
            series::ENDPOINT_LATENCY,
            self.latency.endpoint_latency,
        ));
        points.push(MetricPoint::new(
            series::PIZZA_CREATION_LATENCY,
            self.latency.pizza_creation_latency,
        ));

        points
    }
}

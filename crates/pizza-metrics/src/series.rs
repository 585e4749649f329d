//! Fixed series catalog.
//!
//! Every metric the service reports is one of a closed set of series, some of
//! which are split by a single dimension. Names here are the exact names sent
//! on the wire.

use std::fmt;
use std::str::FromStr;

use crate::error::MetricsError;

/// Per-method request counts.
pub const METHODS: &str = "methods";
/// Logged-in user gauge.
pub const ACTIVE_USERS: &str = "activeUsers";
/// Authentication attempts by outcome.
pub const AUTH_ATTEMPTS: &str = "authAttempts";
/// Pizza sales, failures and revenue.
pub const PIZZAS: &str = "pizzas";
/// Process CPU utilization.
pub const CPU_PERCENTAGE: &str = "cpuPercentage";
/// Host memory utilization.
pub const MEMORY_PERCENTAGE: &str = "memoryPercentage";
/// Mean request-handling latency over the last window.
pub const ENDPOINT_LATENCY: &str = "endpointLatency";
/// Mean pizza-creation latency over the last window.
pub const PIZZA_CREATION_LATENCY: &str = "pizzaCreationLatency";

/// Dimension key for [`METHODS`].
pub const METHOD_KEY: &str = "method";
/// Dimension key for [`AUTH_ATTEMPTS`].
pub const STATUS_KEY: &str = "status";
/// Dimension key for [`PIZZAS`].
pub const PIZZA_METRIC_KEY: &str = "pizzaMetric";
/// Attribute attached to every exported data point.
pub const SOURCE_KEY: &str = "source";

/// All series names, in export order.
pub const ALL_SERIES: [&str; 8] = [
    METHODS,
    ACTIVE_USERS,
    AUTH_ATTEMPTS,
    PIZZAS,
    CPU_PERCENTAGE,
    MEMORY_PERCENTAGE,
    ENDPOINT_LATENCY,
    PIZZA_CREATION_LATENCY,
];

/// Check that a name belongs to the catalog.
pub fn ensure_known(series: &str) -> Result<(), MetricsError> {
    if ALL_SERIES.contains(&series) {
        Ok(())
    } else {
        Err(MetricsError::UnknownSeries(series.to_string()))
    }
}

/// HTTP methods tracked by the request counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    /// GET request.
    Get,
    /// POST request.
    Post,
    /// PUT request.
    Put,
    /// DELETE request.
    Delete,
}

impl HttpMethod {
    /// All tracked methods, in export order.
    pub const ALL: [HttpMethod; 4] = [
        HttpMethod::Get,
        HttpMethod::Post,
        HttpMethod::Put,
        HttpMethod::Delete,
    ];

    /// Wire name of the method.
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

impl FromStr for HttpMethod {
    type Err = MetricsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "DELETE" => Ok(HttpMethod::Delete),
            other => Err(MetricsError::UnknownDimension {
                series: METHODS.to_string(),
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of an authentication attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthOutcome {
    /// Credentials accepted.
    Success,
    /// Credentials rejected.
    Failure,
}

impl AuthOutcome {
    /// Wire name of the outcome.
    pub fn as_str(self) -> &'static str {
        match self {
            AuthOutcome::Success => "success",
            AuthOutcome::Failure => "failure",
        }
    }
}

impl FromStr for AuthOutcome {
    type Err = MetricsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(AuthOutcome::Success),
            "failure" => Ok(AuthOutcome::Failure),
            other => Err(MetricsError::UnknownDimension {
                series: AUTH_ATTEMPTS.to_string(),
                value: other.to_string(),
            }),
        }
    }
}

/// Sub-metric of the `pizzas` series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PizzaMetric {
    /// Pizzas successfully ordered.
    Sold,
    /// Orders the factory failed to fulfil.
    CreationFailures,
    /// Accumulated revenue in currency units.
    Revenue,
}

impl PizzaMetric {
    /// Wire name of the sub-metric.
    pub fn as_str(self) -> &'static str {
        match self {
            PizzaMetric::Sold => "sold",
            PizzaMetric::CreationFailures => "creationFailures",
            PizzaMetric::Revenue => "revenue",
        }
    }
}

impl FromStr for PizzaMetric {
    type Err = MetricsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sold" => Ok(PizzaMetric::Sold),
            "creationFailures" => Ok(PizzaMetric::CreationFailures),
            "revenue" => Ok(PizzaMetric::Revenue),
            other => Err(MetricsError::UnknownDimension {
                series: PIZZAS.to_string(),
                value: other.to_string(),
            }),
        }
    }
}

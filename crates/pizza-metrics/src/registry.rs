//! Counter registry.
//!
//! Holds the cumulative counters and gauges of the service. Every field is an
//! independent atomic, so concurrent request handlers never contend on a lock
//! and never lose an increment.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{MetricsError, Result};
use crate::series::{
    self, AuthOutcome, HttpMethod, PizzaMetric, ACTIVE_USERS, AUTH_ATTEMPTS, CPU_PERCENTAGE,
    ENDPOINT_LATENCY, MEMORY_PERCENTAGE, METHODS, PIZZAS, PIZZA_CREATION_LATENCY,
};

/// `f64` stored as raw bits in an `AtomicU64`.
#[derive(Debug, Default)]
struct AtomicF64(AtomicU64);

impl AtomicF64 {
    fn load(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Relaxed))
    }

    fn store(&self, value: f64) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }

    fn fetch_add(&self, delta: f64) {
        // The closure always returns Some, so the update cannot fail.
        let _ = self
            .0
            .fetch_update(Ordering::AcqRel, Ordering::Relaxed, |bits| {
                Some((f64::from_bits(bits) + delta).to_bits())
            });
    }
}

/// Central registry for request, auth, user and pizza counters plus the
/// last-derived system and latency gauges.
#[derive(Debug, Default)]
pub struct CounterRegistry {
    // Request metrics, indexed by `HttpMethod::index`
    requests: [AtomicU64; 4],

    // User metrics
    active_users: AtomicU64,
    auth_success: AtomicU64,
    auth_failure: AtomicU64,

    // Pizza metrics
    pizzas_sold: AtomicU64,
    pizza_creation_failures: AtomicU64,
    revenue: AtomicF64,

    // Derived gauges, overwritten once per export window
    cpu_percentage: AtomicF64,
    memory_percentage: AtomicF64,
    endpoint_latency: AtomicF64,
    pizza_creation_latency: AtomicF64,
}

impl CounterRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one inbound request.
    pub fn record_request(&self, method: HttpMethod) {
        self.requests[method.index()].fetch_add(1, Ordering::Relaxed);
    }

    /// Record one authentication attempt.
    pub fn record_auth(&self, outcome: AuthOutcome) {
        match outcome {
            AuthOutcome::Success => self.auth_success.fetch_add(1, Ordering::Relaxed),
            AuthOutcome::Failure => self.auth_failure.fetch_add(1, Ordering::Relaxed),
        };
    }

    /// Increase the active user gauge by one.
    pub fn user_activated(&self) {
        self.active_users.fetch_add(1, Ordering::Relaxed);
    }

    /// Decrease the active user gauge by one, never below zero.
    pub fn user_deactivated(&self) {
        let _ = self
            .active_users
            .fetch_update(Ordering::AcqRel, Ordering::Relaxed, |n| n.checked_sub(1));
    }

    /// Record pizzas sold.
    pub fn record_pizzas_sold(&self, count: u64) {
        self.pizzas_sold.fetch_add(count, Ordering::Relaxed);
    }

    /// Record a failed pizza creation.
    pub fn record_creation_failure(&self) {
        self.pizza_creation_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Add to the revenue accumulator. Callers validate the amount.
    pub(crate) fn add_revenue(&self, amount: f64) {
        self.revenue.fetch_add(amount);
    }

    /// Overwrite the sampled system gauges.
    pub fn set_system(&self, cpu_percentage: f64, memory_percentage: f64) {
        self.cpu_percentage.store(cpu_percentage);
        self.memory_percentage.store(memory_percentage);
    }

    /// Overwrite the windowed latency means.
    pub fn set_latency(&self, endpoint_ms: f64, pizza_creation_ms: f64) {
        self.endpoint_latency.store(endpoint_ms);
        self.pizza_creation_latency.store(pizza_creation_ms);
    }

    // Name-keyed API

    /// Increment a counter by one, addressed by series name and dimension.
    ///
    /// `activeUsers` takes no dimension; `methods`, `authAttempts` and
    /// `pizzas` require one. Gauges other than `activeUsers` cannot be
    /// incremented.
    pub fn increment(&self, series: &str, dimension: Option<&str>) -> Result<()> {
        self.increment_by(series, dimension, 1.0)
    }

    /// Increase a counter by `amount`, addressed by series name and dimension.
    ///
    /// Integer counters only accept whole, non-negative amounts. The revenue
    /// accumulator (`pizzas` / `revenue`) accepts any finite non-negative
    /// amount.
    pub fn increment_by(&self, series: &str, dimension: Option<&str>, amount: f64) -> Result<()> {
        series::ensure_known(series)?;
        if !amount.is_finite() || amount < 0.0 {
            return Err(MetricsError::InvalidArgument(format!(
                "increment for {series} must be finite and non-negative, got {amount}"
            )));
        }

        match series {
            METHODS => {
                let method: HttpMethod = require_dimension(series, dimension)?.parse()?;
                let count = whole(series, amount)?;
                self.requests[method.index()].fetch_add(count, Ordering::Relaxed);
            }
            AUTH_ATTEMPTS => {
                let outcome: AuthOutcome = require_dimension(series, dimension)?.parse()?;
                let count = whole(series, amount)?;
                match outcome {
                    AuthOutcome::Success => self.auth_success.fetch_add(count, Ordering::Relaxed),
                    AuthOutcome::Failure => self.auth_failure.fetch_add(count, Ordering::Relaxed),
                };
            }
            PIZZAS => {
                let metric: PizzaMetric = require_dimension(series, dimension)?.parse()?;
                match metric {
                    PizzaMetric::Sold => self.record_pizzas_sold(whole(series, amount)?),
                    PizzaMetric::CreationFailures => {
                        let count = whole(series, amount)?;
                        self.pizza_creation_failures
                            .fetch_add(count, Ordering::Relaxed);
                    }
                    PizzaMetric::Revenue => self.add_revenue(amount),
                }
            }
            ACTIVE_USERS => {
                forbid_dimension(series, dimension)?;
                let count = whole(series, amount)?;
                self.active_users.fetch_add(count, Ordering::Relaxed);
            }
            _ => {
                return Err(MetricsError::InvalidArgument(format!(
                    "{series} is a derived gauge and cannot be incremented"
                )))
            }
        }
        Ok(())
    }

    /// Decrement a gauge by one. Only `activeUsers` supports this; it is
    /// floored at zero.
    pub fn decrement(&self, series: &str) -> Result<()> {
        series::ensure_known(series)?;
        if series != ACTIVE_USERS {
            return Err(MetricsError::InvalidArgument(format!(
                "{series} cannot be decremented"
            )));
        }
        self.user_deactivated();
        Ok(())
    }

    /// Overwrite a gauge, addressed by series name.
    ///
    /// Negative values for `activeUsers` are clamped to zero and fractional
    /// values are truncated.
    pub fn set_gauge(&self, series: &str, value: f64) -> Result<()> {
        series::ensure_known(series)?;
        if !value.is_finite() {
            return Err(MetricsError::InvalidArgument(format!(
                "gauge {series} must be finite, got {value}"
            )));
        }

        match series {
            ACTIVE_USERS => self
                .active_users
                .store(value.max(0.0) as u64, Ordering::Relaxed),
            CPU_PERCENTAGE => self.cpu_percentage.store(value),
            MEMORY_PERCENTAGE => self.memory_percentage.store(value),
            ENDPOINT_LATENCY => self.endpoint_latency.store(value),
            PIZZA_CREATION_LATENCY => self.pizza_creation_latency.store(value),
            _ => {
                return Err(MetricsError::InvalidArgument(format!(
                    "{series} is a counter, not a gauge"
                )))
            }
        }
        Ok(())
    }

    // Getters

    /// Get the request count for a method.
    pub fn requests(&self, method: HttpMethod) -> u64 {
        self.requests[method.index()].load(Ordering::Relaxed)
    }

    /// Get the active user gauge.
    pub fn active_users(&self) -> u64 {
        self.active_users.load(Ordering::Relaxed)
    }

    /// Get the auth attempt count for an outcome.
    pub fn auth_attempts(&self, outcome: AuthOutcome) -> u64 {
        match outcome {
            AuthOutcome::Success => self.auth_success.load(Ordering::Relaxed),
            AuthOutcome::Failure => self.auth_failure.load(Ordering::Relaxed),
        }
    }

    /// Get pizzas sold.
    pub fn pizzas_sold(&self) -> u64 {
        self.pizzas_sold.load(Ordering::Relaxed)
    }

    /// Get pizza creation failures.
    pub fn pizza_creation_failures(&self) -> u64 {
        self.pizza_creation_failures.load(Ordering::Relaxed)
    }

    /// Get accumulated revenue.
    pub fn revenue(&self) -> f64 {
        self.revenue.load()
    }

    /// Get the last sampled CPU percentage.
    pub fn cpu_percentage(&self) -> f64 {
        self.cpu_percentage.load()
    }

    /// Get the last sampled memory percentage.
    pub fn memory_percentage(&self) -> f64 {
        self.memory_percentage.load()
    }

    /// Get the mean endpoint latency of the last completed window.
    pub fn endpoint_latency(&self) -> f64 {
        self.endpoint_latency.load()
    }

    /// Get the mean pizza creation latency of the last completed window.
    pub fn pizza_creation_latency(&self) -> f64 {
        self.pizza_creation_latency.load()
    }
}

fn require_dimension<'a>(series: &str, dimension: Option<&'a str>) -> Result<&'a str> {
    dimension.ok_or_else(|| {
        MetricsError::InvalidArgument(format!("series {series} requires a dimension"))
    })
}

fn forbid_dimension(series: &str, dimension: Option<&str>) -> Result<()> {
    match dimension {
        None => Ok(()),
        Some(value) => Err(MetricsError::UnknownDimension {
            series: series.to_string(),
            value: value.to_string(),
        }),
    }
}

fn whole(series: &str, amount: f64) -> Result<u64> {
    if amount.fract() != 0.0 {
        return Err(MetricsError::InvalidArgument(format!(
            "counter {series} only accepts whole increments, got {amount}"
        )));
    }
    Ok(amount as u64)
}

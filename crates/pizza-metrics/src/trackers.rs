//! Business event trackers.
//!
//! One method per domain event, called by the auth and order handlers. Each
//! is a direct, non-blocking update of the hub.

use tracing::warn;

use crate::error::{MetricsError, Result};
use crate::hub::MetricsHub;
use crate::series::AuthOutcome;

impl MetricsHub {
    /// A login succeeded.
    pub fn on_login_success(&self) {
        self.registry().record_auth(AuthOutcome::Success);
    }

    /// A login was rejected.
    pub fn on_login_failure(&self) {
        self.registry().record_auth(AuthOutcome::Failure);
    }

    /// A user session started.
    pub fn on_user_activated(&self) {
        self.registry().user_activated();
    }

    /// A user session ended. Never drives the gauge below zero.
    pub fn on_user_deactivated(&self) {
        self.registry().user_deactivated();
    }

    /// One pizza was sold.
    pub fn on_pizza_sold(&self) {
        self.registry().record_pizzas_sold(1);
    }

    /// An order containing `count` pizzas was fulfilled.
    pub fn on_pizzas_sold(&self, count: u64) {
        self.registry().record_pizzas_sold(count);
    }

    /// The pizza factory failed to create an order.
    pub fn on_pizza_creation_failed(&self) {
        self.registry().record_creation_failure();
    }

    /// Revenue from a fulfilled order.
    ///
    /// Negative or non-finite amounts are rejected and nothing is recorded.
    pub fn on_pizza_revenue(&self, amount: f64) -> Result<()> {
        if !amount.is_finite() || amount < 0.0 {
            warn!(amount, "rejected pizza revenue");
            return Err(MetricsError::InvalidArgument(format!(
                "revenue must be finite and non-negative, got {amount}"
            )));
        }
        self.registry().add_revenue(amount);
        Ok(())
    }

    /// Elapsed time of one call to the pizza factory.
    ///
    /// Negative or non-finite samples are rejected and nothing is recorded.
    pub fn on_pizza_creation_latency(&self, ms: f64) -> Result<()> {
        if !ms.is_finite() || ms < 0.0 {
            warn!(ms, "rejected pizza creation latency");
            return Err(MetricsError::InvalidArgument(format!(
                "latency must be finite and non-negative, got {ms}"
            )));
        }
        self.latency().record_domain_latency(ms);
        Ok(())
    }
}

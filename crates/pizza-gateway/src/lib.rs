//! JWT Pizza service shell.
//!
//! Embeds a [`MetricsHub`](pizza_metrics::MetricsHub), counts and times every
//! inbound request through [`track_requests`], and exposes a health route.

pub mod config;
pub mod json;
pub mod middleware;
pub mod routes;

pub use config::{Args, GatewayConfig};
pub use middleware::track_requests;

use axum::Router;
use pizza_metrics::SharedMetricsHub;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across all routes.
#[derive(Clone)]
pub struct AppState {
    /// Metrics hub shared with the export scheduler.
    pub hub: SharedMetricsHub,
    /// Gateway configuration.
    pub config: GatewayConfig,
    /// Whether the export scheduler is running.
    pub export_enabled: bool,
}

impl AppState {
    /// Create new application state.
    pub fn new(hub: SharedMetricsHub, config: GatewayConfig, export_enabled: bool) -> Self {
        Self {
            hub,
            config,
            export_enabled,
        }
    }
}

/// Create the router with all routes.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(routes::health::routes())
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            track_requests,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

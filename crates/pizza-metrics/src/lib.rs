//! Pizza Metrics - In-process metrics aggregation and push export.
//!
//! This crate collects request, authentication, user, pizza and host
//! metrics for the JWT Pizza service and periodically pushes them to an
//! OTLP-compatible HTTP backend.

pub mod config;
pub mod error;
pub mod export;
pub mod hub;
pub mod interceptor;
pub mod latency;
pub mod registry;
pub mod sampler;
pub mod scheduler;
pub mod series;
mod trackers;

pub use config::{ExportConfig, ExportTarget};
pub use error::{ExportError, MetricsError, Result};
pub use hub::{
    new_shared_hub, AuthAttempts, LatencyStats, MetricSnapshot, MetricsHub, PizzaStats,
    RequestCounts, SharedMetricsHub, SystemUsage, WindowSummary,
};
pub use interceptor::RequestGuard;
pub use latency::{LatencyAccumulator, LatencyAverages};
pub use registry::CounterRegistry;
pub use sampler::{HostProbe, MemoryReading, SysinfoProbe, SystemSampler};
pub use series::{AuthOutcome, HttpMethod, PizzaMetric};

// Export exports
pub use export::{Exporter, HttpTransport, MetricPoint, MetricValue, MockTransport, Transport};
pub use scheduler::{ExportScheduler, ExportTask, SchedulerState, TickReport};

//! Push export to the time-series backend.

mod exporter;
mod payload;
mod point;
mod transport;

pub use exporter::Exporter;
pub use payload::{
    now_unix_nanos, Attribute, AttributeValue, DataPoint, DataValue, ExportPayload, Metric,
    ResourceMetrics, ScopeMetrics, Sum, AGGREGATION_TEMPORALITY, UNIT,
};
pub use point::{MetricPoint, MetricValue};
pub use transport::{HttpTransport, MockTransport, Transport};

//! Fire-and-forget exporter.

use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::payload::{now_unix_nanos, ExportPayload};
use super::point::{MetricPoint, MetricValue};
use super::transport::{HttpTransport, Transport};
use crate::config::ExportTarget;
use crate::error::ExportError;

/// Encodes data points and pushes them to the backend.
///
/// [`Exporter::export`] never blocks and never fails: the push runs on a
/// spawned task and any error is logged there and dropped.
#[derive(Clone)]
pub struct Exporter {
    transport: Arc<dyn Transport>,
    source: Arc<str>,
}

impl Exporter {
    /// Create an exporter over any transport.
    pub fn new(transport: Arc<dyn Transport>, source: impl Into<String>) -> Self {
        Self {
            transport,
            source: Arc::from(source.into()),
        }
    }

    /// Create an HTTP exporter for a validated target.
    pub fn http(target: &ExportTarget) -> Result<Self, ExportError> {
        let transport = HttpTransport::new(target)?;
        Ok(Self::new(Arc::new(transport), target.source.clone()))
    }

    /// Value of the `source` attribute.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Encode a point into the wire format, stamped with the current time.
    pub fn encode(&self, point: &MetricPoint) -> Result<Vec<u8>, ExportError> {
        ExportPayload::from_point(point, &self.source, now_unix_nanos()).to_json()
    }

    /// Encode and deliver one point, returning the outcome.
    pub async fn push(&self, point: &MetricPoint) -> Result<(), ExportError> {
        let body = self.encode(point)?;
        self.transport.send(body).await?;
        debug!(series = %point.name, "pushed metric");
        Ok(())
    }

    /// Push one point in the background.
    ///
    /// Failures are logged and swallowed. Without a tokio runtime the point is
    /// dropped. The returned handle may be ignored.
    pub fn export(
        &self,
        series: &str,
        value: impl Into<MetricValue>,
        dimensions: &[(&str, &str)],
    ) -> Option<JoinHandle<()>> {
        let mut point = MetricPoint::new(series, value);
        for (key, value) in dimensions {
            point = point.with_dimension(*key, *value);
        }
        self.dispatch(point)
    }

    /// Push an already built point in the background.
    pub fn dispatch(&self, point: MetricPoint) -> Option<JoinHandle<()>> {
        let Ok(handle) = Handle::try_current() else {
            warn!(series = %point.name, "no async runtime, metric dropped");
            return None;
        };

        let exporter = self.clone();
        Some(handle.spawn(async move {
            if let Err(e) = exporter.push(&point).await {
                match e {
                    ExportError::Status { status } => {
                        warn!(series = %point.name, status, "failed to push metric");
                    }
                    e => warn!(series = %point.name, error = %e, "error pushing metric"),
                }
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::transport::MockTransport;

    fn exporter(transport: &Arc<MockTransport>) -> Exporter {
        Exporter::new(transport.clone(), "jwt-pizza-service-test")
    }

    #[tokio::test]
    async fn test_push_success() {
        let transport = Arc::new(MockTransport::new());
        let exporter = exporter(&transport);

        exporter
            .push(&MetricPoint::new("activeUsers", 5u64))
            .await
            .unwrap();

        let received = transport.received();
        assert_eq!(received.len(), 1);
        let metric = &received[0]["resourceMetrics"][0]["scopeMetrics"][0]["metrics"][0];
        let data_point = &metric["sum"]["dataPoints"][0];
        assert_eq!(data_point["asInt"], 5);
        assert_eq!(
            data_point["attributes"][0]["value"]["stringValue"],
            "jwt-pizza-service-test"
        );
        assert!(data_point["timeUnixNano"].as_u64().unwrap() > 0);
    }

    #[tokio::test]
    async fn test_push_reports_rejection() {
        let transport = Arc::new(MockTransport::new());
        transport.set_reject_status(Some(401));
        let exporter = exporter(&transport);

        let result = exporter.push(&MetricPoint::new("activeUsers", 1u64)).await;
        assert!(matches!(result, Err(ExportError::Status { status: 401 })));
    }

    #[tokio::test]
    async fn test_export_swallows_failures() {
        let transport = Arc::new(MockTransport::new());
        transport.fail_series("methods");
        let exporter = exporter(&transport);

        let failed = exporter
            .export("methods", 1u64, &[("method", "GET")])
            .unwrap();
        let ok = exporter.export("activeUsers", 2u64, &[]).unwrap();

        // Neither task panics; the failure stays inside the exporter.
        failed.await.unwrap();
        ok.await.unwrap();

        let mut series = transport.received_series();
        series.sort();
        assert_eq!(series, ["activeUsers", "methods"]);
    }

    #[tokio::test]
    async fn test_export_non_finite_is_dropped() {
        let transport = Arc::new(MockTransport::new());
        let exporter = exporter(&transport);

        exporter
            .export("cpuPercentage", f64::NAN, &[])
            .unwrap()
            .await
            .unwrap();
        assert!(transport.received().is_empty());
    }

    #[test]
    fn test_export_without_runtime() {
        let transport = Arc::new(MockTransport::new());
        let exporter = exporter(&transport);
        assert!(exporter.export("activeUsers", 1u64, &[]).is_none());
    }
}

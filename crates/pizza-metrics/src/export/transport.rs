//! Delivery of encoded payloads.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;

use crate::config::ExportTarget;
use crate::error::ExportError;

/// Sends one encoded payload to the metrics backend (object-safe).
#[async_trait]
pub trait Transport: Send + Sync {
    /// Deliver a JSON body. `Ok` means the backend accepted it.
    async fn send(&self, body: Vec<u8>) -> Result<(), ExportError>;
}

/// HTTP POST with bearer authentication.
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl HttpTransport {
    /// Build a transport for the given target.
    pub fn new(target: &ExportTarget) -> Result<Self, ExportError> {
        Self::with_timeout(target, target.request_timeout)
    }

    /// Build a transport with an explicit per-request timeout.
    pub fn with_timeout(target: &ExportTarget, timeout: Duration) -> Result<Self, ExportError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: target.endpoint.clone(),
            api_key: target.api_key.clone(),
        })
    }

    /// Destination URL.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, body: Vec<u8>) -> Result<(), ExportError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(ExportError::Status {
                status: status.as_u16(),
            })
        }
    }
}

/// In-memory transport for tests.
///
/// Records every body it receives. Can be told to reject everything with a
/// status code, or to fail with a transport error for chosen series names.
#[derive(Default)]
pub struct MockTransport {
    received: Mutex<Vec<Value>>,
    reject_status: Mutex<Option<u16>>,
    unreachable_series: Mutex<HashSet<String>>,
}

impl MockTransport {
    /// Create a transport that accepts everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every send with this status (`None` to accept again).
    pub fn set_reject_status(&self, status: Option<u16>) {
        *self.reject_status.lock() = status;
    }

    /// Fail sends for this series with a transport error.
    pub fn fail_series(&self, series: &str) {
        self.unreachable_series.lock().insert(series.to_string());
    }

    /// Every body received so far, parsed as JSON.
    pub fn received(&self) -> Vec<Value> {
        self.received.lock().clone()
    }

    /// Series names of every body received so far.
    pub fn received_series(&self) -> Vec<String> {
        self.received
            .lock()
            .iter()
            .filter_map(|body| series_name(body).map(str::to_string))
            .collect()
    }
}

fn series_name(body: &Value) -> Option<&str> {
    body["resourceMetrics"][0]["scopeMetrics"][0]["metrics"][0]["name"].as_str()
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, body: Vec<u8>) -> Result<(), ExportError> {
        let body: Value = serde_json::from_slice(&body)?;
        let name = series_name(&body).unwrap_or_default().to_string();
        self.received.lock().push(body);

        if self.unreachable_series.lock().contains(&name) {
            return Err(ExportError::Transport(format!(
                "connection refused for {name}"
            )));
        }
        if let Some(status) = *self.reject_status.lock() {
            return Err(ExportError::Status { status });
        }
        Ok(())
    }
}

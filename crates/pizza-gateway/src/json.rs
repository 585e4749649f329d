//! JSON response types for the HTTP gateway.

use serde::Serialize;

/// Health check response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Health status.
    pub status: String,
    /// Gateway version.
    pub version: String,
    /// Whether metrics are being pushed to a backend.
    pub export_enabled: bool,
}

//! Metrics error types.

use thiserror::Error;

/// Errors raised by the in-process side of the metrics core.
#[derive(Debug, Error)]
pub enum MetricsError {
    /// Series name outside the fixed catalog.
    #[error("unknown series: {0}")]
    UnknownSeries(String),

    /// Dimension value not allowed for the series.
    #[error("unknown dimension value {value:?} for series {series}")]
    UnknownDimension {
        /// Series the dimension was supplied for.
        series: String,
        /// Rejected dimension value.
        value: String,
    },

    /// Argument out of range (negative revenue, non-finite latency, ...).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Export configuration is incomplete or inconsistent.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors raised while pushing a data point to the export backend.
///
/// These never escape the exporter's fire-and-forget path; they are only
/// visible to callers of [`Exporter::push`](crate::export::Exporter::push).
#[derive(Debug, Error)]
pub enum ExportError {
    /// Payload could not be encoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Value cannot be represented in JSON.
    #[error("series {series} has a non-finite value")]
    NonFinite {
        /// Offending series.
        series: String,
    },

    /// Network or client failure before a response was received.
    #[error("transport error: {0}")]
    Transport(String),

    /// Backend answered with a non-success status.
    #[error("backend rejected metric with status {status}")]
    Status {
        /// HTTP status code.
        status: u16,
    },
}

impl From<reqwest::Error> for ExportError {
    fn from(err: reqwest::Error) -> Self {
        ExportError::Transport(err.to_string())
    }
}

/// Result alias for metrics operations.
pub type Result<T> = std::result::Result<T, MetricsError>;

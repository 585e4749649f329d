//! Export configuration.

use std::time::Duration;

use tracing::warn;

use crate::error::{MetricsError, Result};

/// Default `source` attribute.
pub const DEFAULT_SOURCE: &str = "jwt-pizza-service";

/// Default export period.
pub const DEFAULT_PERIOD: Duration = Duration::from_secs(10);

/// Default timeout for a single push.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Export configuration as loaded at startup.
#[derive(Debug, Clone)]
pub struct ExportConfig {
    /// Backend URL.
    pub endpoint: Option<String>,
    /// Bearer credential.
    pub api_key: Option<String>,
    /// Value of the `source` attribute.
    pub source: String,
    /// Time between export ticks.
    pub period: Duration,
    /// Timeout for a single push.
    pub request_timeout: Duration,
    /// Refuse to start without a complete export target.
    pub required: bool,
}

impl ExportConfig {
    /// Create a configuration with defaults and no target.
    pub fn new() -> Self {
        Self {
            endpoint: None,
            api_key: None,
            source: DEFAULT_SOURCE.to_string(),
            period: DEFAULT_PERIOD,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            required: false,
        }
    }

    /// Set the backend URL.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Set the bearer credential.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Set the `source` attribute.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    /// Set the export period.
    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    /// Set the per-push timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Make a complete target mandatory.
    pub fn with_required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Resolve the export target.
    ///
    /// Returns `Ok(None)` when export is optional and the endpoint or
    /// credential is missing; export is then disabled.
    pub fn validate(&self) -> Result<Option<ExportTarget>> {
        if self.period.is_zero() {
            return Err(MetricsError::Config(
                "export period must be greater than zero".to_string(),
            ));
        }
        if self.source.trim().is_empty() {
            return Err(MetricsError::Config("source must not be empty".to_string()));
        }

        let endpoint = non_empty(self.endpoint.as_deref());
        let api_key = non_empty(self.api_key.as_deref());

        match (endpoint, api_key) {
            (Some(endpoint), Some(api_key)) => Ok(Some(ExportTarget {
                endpoint: endpoint.to_string(),
                api_key: api_key.to_string(),
                source: self.source.clone(),
                period: self.period,
                request_timeout: self.request_timeout,
            })),
            (endpoint, _) => {
                let missing = if endpoint.is_none() {
                    "endpoint URL"
                } else {
                    "API key"
                };
                if self.required {
                    Err(MetricsError::Config(format!("metrics {missing} is not set")))
                } else {
                    warn!(missing, "metrics export disabled");
                    Ok(None)
                }
            }
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Validated, complete export destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportTarget {
    /// Backend URL.
    pub endpoint: String,
    /// Bearer credential.
    pub api_key: String,
    /// Value of the `source` attribute.
    pub source: String,
    /// Time between export ticks.
    pub period: Duration,
    /// Timeout for a single push.
    pub request_timeout: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ExportConfig::default();
        assert_eq!(config.source, DEFAULT_SOURCE);
        assert_eq!(config.period, Duration::from_secs(10));
        assert!(!config.required);
        assert!(config.validate().unwrap().is_none());
    }

    #[test]
    fn test_complete_config() {
        let target = ExportConfig::new()
            .with_endpoint("https://otlp.example.net/otlp/v1/metrics")
            .with_api_key("123:abc")
            .with_source("jwt-pizza-service-prod")
            .with_period(Duration::from_secs(5))
            .validate()
            .unwrap()
            .unwrap();

        assert_eq!(target.endpoint, "https://otlp.example.net/otlp/v1/metrics");
        assert_eq!(target.api_key, "123:abc");
        assert_eq!(target.source, "jwt-pizza-service-prod");
        assert_eq!(target.period, Duration::from_secs(5));
    }

    #[test]
    fn test_missing_key_optional() {
        let config = ExportConfig::new().with_endpoint("http://localhost:4318");
        assert!(config.validate().unwrap().is_none());

        let config = ExportConfig::new()
            .with_endpoint("http://localhost:4318")
            .with_api_key("   ");
        assert!(config.validate().unwrap().is_none());
    }

    #[test]
    fn test_missing_target_required() {
        let config = ExportConfig::new().with_api_key("k").with_required(true);
        let err = config.validate().unwrap_err();
        assert!(matches!(err, MetricsError::Config(ref msg) if msg.contains("endpoint")));
    }

    #[test]
    fn test_zero_period_rejected() {
        let config = ExportConfig::new()
            .with_endpoint("http://localhost:4318")
            .with_api_key("k")
            .with_period(Duration::ZERO);
        assert!(matches!(config.validate(), Err(MetricsError::Config(_))));
    }
}

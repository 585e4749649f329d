//! Gateway configuration.

use std::time::Duration;

use clap::Parser;
use pizza_metrics::config::DEFAULT_SOURCE;
use pizza_metrics::ExportConfig;

/// JWT Pizza gateway command line arguments.
#[derive(Debug, Parser)]
#[command(name = "pizza-gateway")]
#[command(about = "JWT Pizza service shell with metrics export")]
pub struct Args {
    /// Address to listen on for HTTP requests.
    #[arg(short, long, env = "LISTEN_ADDR", default_value = "0.0.0.0:3000")]
    pub listen: String,

    /// Metrics backend URL.
    #[arg(long, env = "METRICS_URL")]
    pub metrics_url: Option<String>,

    /// Bearer credential for the metrics backend.
    #[arg(long, env = "METRICS_API_KEY", hide_env_values = true)]
    pub metrics_api_key: Option<String>,

    /// Value of the `source` attribute on every data point.
    #[arg(long, env = "METRICS_SOURCE", default_value = DEFAULT_SOURCE)]
    pub metrics_source: String,

    /// Export period (ms).
    #[arg(long, env = "METRICS_EXPORT_PERIOD_MS", default_value_t = 10_000)]
    pub export_period_ms: u64,

    /// Timeout (ms) for a single push.
    #[arg(long, env = "METRICS_EXPORT_TIMEOUT_MS", default_value_t = 5_000)]
    pub export_timeout_ms: u64,

    /// Refuse to start when the metrics URL or API key is missing.
    #[arg(long, env = "METRICS_REQUIRED")]
    pub require_metrics: bool,
}

/// Gateway configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Address to listen on for HTTP requests.
    pub listen_addr: String,
    /// Metrics export settings.
    pub export: ExportConfig,
}

impl From<&Args> for GatewayConfig {
    fn from(args: &Args) -> Self {
        let mut export = ExportConfig::new()
            .with_source(args.metrics_source.clone())
            .with_period(Duration::from_millis(args.export_period_ms))
            .with_request_timeout(Duration::from_millis(args.export_timeout_ms))
            .with_required(args.require_metrics);
        if let Some(url) = &args.metrics_url {
            export = export.with_endpoint(url.clone());
        }
        if let Some(key) = &args.metrics_api_key {
            export = export.with_api_key(key.clone());
        }

        Self {
            listen_addr: args.listen.clone(),
            export,
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:3000".to_string(),
            export: ExportConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_into_config() {
        let args = Args::parse_from([
            "pizza-gateway",
            "--listen",
            "127.0.0.1:4000",
            "--metrics-url",
            "https://otlp.example.net/otlp/v1/metrics",
            "--metrics-api-key",
            "123:abc",
            "--metrics-source",
            "jwt-pizza-service-dev",
            "--export-period-ms",
            "2500",
        ]);
        let config = GatewayConfig::from(&args);

        assert_eq!(config.listen_addr, "127.0.0.1:4000");
        let target = config.export.validate().unwrap().unwrap();
        assert_eq!(target.source, "jwt-pizza-service-dev");
        assert_eq!(target.period, Duration::from_millis(2500));
        assert_eq!(target.request_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_required_without_target_fails() {
        let args = Args::parse_from([
            "pizza-gateway",
            "--metrics-url",
            "http://localhost:4318",
            "--require-metrics",
        ]);
        let config = GatewayConfig::from(&args);
        assert!(config.export.validate().is_err());
    }
}

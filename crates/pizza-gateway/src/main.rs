//! JWT Pizza gateway binary.

use clap::Parser;
use pizza_metrics::{new_shared_hub, ExportScheduler, Exporter};
use pizza_gateway::{create_router, AppState, Args, GatewayConfig};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("pizza_gateway=info,pizza_metrics=info")),
        )
        .init();

    // Parse command line args
    let args = Args::parse();
    let config = GatewayConfig::from(&args);

    info!(
        listen = %config.listen_addr,
        source = %config.export.source,
        "Starting JWT Pizza gateway"
    );

    let target = config.export.validate()?;
    let hub = new_shared_hub();

    // Start the export scheduler when a backend is configured
    let export_task = match &target {
        Some(target) => {
            let exporter = Exporter::http(target)?;
            info!(endpoint = %target.endpoint, "Metrics export enabled");
            Some(ExportScheduler::new(hub.clone(), exporter, target.period).start())
        }
        None => None,
    };

    let state = AppState::new(hub, config.clone(), export_task.is_some());
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    info!("Gateway listening on {}", config.listen_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(task) = export_task {
        task.join().await;
    }
    info!("Gateway stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

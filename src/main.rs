// Main entry point - Dependency injection, polling loop and server setup
mod application;
mod domain;
mod infrastructure;
mod presentation;

use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use crate::application::controller::{AggregationController, PollingSettings};
use crate::infrastructure::config::load_dashboard_config;
use crate::infrastructure::endpoint_registry::EndpointRegistry;
use crate::infrastructure::http_gateway::HttpFetchGateway;
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::router;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing, RUST_LOG overrides the default level
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = load_dashboard_config()?;

    // Create registry and gateway (infrastructure layer)
    let registry = Arc::new(EndpointRegistry::from_config(&config.sources)?);
    let gateway = Arc::new(HttpFetchGateway::new(config.polling.request_timeout())?);

    // Create controller (application layer) and start polling
    let controller = AggregationController::new(
        gateway,
        registry,
        PollingSettings {
            interval: config.polling.interval(),
            error_ttl: Duration::from_millis(config.error_log.ttl_ms),
            chart_capacity: config.chart.capacity,
            discard_stale_outcomes: config.polling.discard_stale_outcomes,
        },
    );
    tokio::spawn(controller.clone().run());

    // Build router (presentation layer)
    let state = Arc::new(AppState { controller });
    let app = router(state);

    // Start server
    let addr: SocketAddr = config
        .server
        .listen_addr
        .parse()
        .with_context(|| format!("invalid server.listen_addr `{}`", config.server.listen_addr))?;
    tracing::info!("Starting drone-dashboard on {}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, app).await?;

    Ok(())
}

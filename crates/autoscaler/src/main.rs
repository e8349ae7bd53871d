//! Swarm Autoscaler daemon
//!
//! Runs on a Swarm manager. Each cycle it queries Prometheus for
//! per-service CPU utilization, classifies every observed service, and
//! issues `docker service scale` commands to keep replica counts within
//! their declared bounds.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use autoscaler_lib::{
    health::{components, HealthRegistry},
    observability::{AutoscalerMetrics, StructuredLogger},
    Controller, DecisionEngine, EngineConfig, PrometheusSource, SwarmCli,
};

mod api;
mod config;

const AUTOSCALER_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting swarm-autoscaler");

    // Load configuration
    let config = config::AutoscalerConfig::load()?;
    info!(
        prometheus_url = %config.prometheus_url,
        interval_secs = config.interval_secs,
        loop_enabled = config.loop_enabled,
        "Autoscaler configured"
    );

    // Initialize health registry
    let health_registry = HealthRegistry::new();
    health_registry.register(components::METRICS_SOURCE).await;
    health_registry.register(components::ORCHESTRATOR).await;
    health_registry.register(components::CONTROLLER).await;

    // Initialize metrics and structured logger
    let metrics = AutoscalerMetrics::new();
    let logger = StructuredLogger::new();
    logger.log_startup(AUTOSCALER_VERSION, &config.prometheus_url, config.loop_enabled);

    // Wire the controller: Prometheus in, docker CLI out
    let swarm = Arc::new(SwarmCli::new(config.docker_bin.clone()));
    let controller = Controller::builder()
        .metrics_source(Arc::new(PrometheusSource::new(&config.prometheus_url)?))
        .directory(swarm.clone())
        .actuator(swarm)
        .engine(DecisionEngine::new(EngineConfig::default()))
        .health(health_registry.clone())
        .metrics(metrics.clone())
        .build()?;

    // Create shared application state
    let app_state = Arc::new(api::AppState::new(
        health_registry.clone(),
        metrics.clone(),
        controller.status_handle(),
    ));

    // Mark as ready after initialization
    health_registry.set_ready(true).await;

    // Start health and metrics server
    let _api_handle = tokio::spawn(api::serve(config.api_port, app_state));

    if !config.loop_enabled {
        // Single-shot mode: one cycle, then exit.
        controller.run_once().await;
        logger.log_shutdown("single-shot cycle complete");
        return Ok(());
    }

    let (shutdown_tx, shutdown_rx) = tokio::sync::broadcast::channel(1);
    let interval = Duration::from_secs(config.interval_secs);
    let controller_handle = tokio::spawn(controller.run(interval, shutdown_rx));

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    logger.log_shutdown("SIGINT received");

    // Let the in-flight cycle finish before exiting.
    let _ = shutdown_tx.send(());
    controller_handle.await?;

    info!("Shutting down");
    Ok(())
}

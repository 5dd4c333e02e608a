//! Chaos usage server
//!
//! Serves aligned resource-usage reports for stress-chaos experiments and
//! accepts raw usage samples from the in-cluster collector.

use anyhow::Result;
use chaos_lib::{
    health::{components, HealthRegistry},
    ChaosUsageService, MemoryStore, StructuredLogger,
};
use chaos_usage_server::{api, config};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // JSON logs, filtered by RUST_LOG
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting chaos-usage-server");

    let config = config::ServerConfig::load()?;
    let alignment = config.alignment()?;
    info!(instance = %config.instance_name, port = config.api_port, "Server configured");

    let health_registry = HealthRegistry::new();
    health_registry.register(components::STORE).await;
    health_registry.register(components::INGESTION).await;
    health_registry.register(components::REPORTS).await;

    let logger = StructuredLogger::new(&config.instance_name);
    logger.log_startup(SERVICE_VERSION, alignment.expected_count, alignment.cadence_secs);

    let service = ChaosUsageService::new(
        Arc::new(MemoryStore::new()),
        alignment,
        health_registry.clone(),
        logger.clone(),
    );
    let app_state = Arc::new(api::AppState::new(service, health_registry.clone()));

    health_registry.set_ready(true).await;

    let api_handle = tokio::spawn(api::serve(config.api_port, app_state));

    tokio::select! {
        result = api_handle => {
            result??;
        }
        signal = tokio::signal::ctrl_c() => {
            signal?;
            logger.log_shutdown("SIGINT received");
        }
    }

    info!("Shutting down");
    Ok(())
}

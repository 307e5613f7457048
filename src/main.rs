/*
 * Pipeswap - multi-hop swap routing over a shared execution context
 * Main entry point for the application
 */

use anyhow::Context;
use pipeswap::{api, config::Config, service::SwapService};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[rocket::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    info!("Starting Pipeswap quoting service");

    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!("Configuration loaded successfully");

    let swap_service = SwapService::new(config.clone())
        .await
        .context("failed to initialize swap service")?;

    let api_state = api::ApiState {
        config: config.clone(),
        swap_service: Arc::new(swap_service),
    };

    info!("Starting API server on {}:{}", config.server.host, config.server.port);

    let rocket = api::create_rocket(api_state);
    rocket.launch().await?;

    Ok(())
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "pipeswap=info".into());
    let registry = tracing_subscriber::registry().with(filter);

    if std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json")) {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

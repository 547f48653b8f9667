//! # Tainha API Gateway
//!
//! A single HTTP front door built with Axum, featuring:
//! - Declarative routes mapped onto upstream services, with path parameters
//! - Bearer token (HMAC JWT) authorization with claim forwarding
//! - Stream-through proxying for event-stream routes
//! - JSON response enrichment through fan-out lookups keyed by record fields

pub mod config;
pub mod cli;
pub mod errors;
pub mod app;
pub mod state;
pub mod routes;
pub mod dispatch;
pub mod proxy;
pub mod middleware;
pub mod features;
pub mod utils;
pub mod constants;


use std::{net::SocketAddr, sync::Arc};

use anyhow::Result;
use dotenvy::dotenv;
use reqwest::Client;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::{cli::Cli, config::GatewayConfig, constants::defaults, routes::RouteTable, state::AppState};

/// Starts the gateway with the given command-line options.
///
/// Configuration and route compilation errors abort before the listener is
/// bound.
pub async fn run(cli: Cli) -> Result<()> {

    dotenv().ok();

    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .try_init();

    info!(path = %cli.config.display(), "Loading configuration");
    let config = GatewayConfig::load(&cli.config)?;

    let http_client = Client::new();
    let table = RouteTable::build(&config, http_client.clone())?;
    let state = Arc::new(AppState::from_config(&config, http_client)?);
    let app = app::create_app(&table, state)?;

    let addr = cli
        .addr
        .unwrap_or_else(|| format!("{}:{}", defaults::LISTEN_HOST, config.base.port));

    let listener = TcpListener::bind(&addr).await?;
    info!("API Gateway listening on {} ({} routes)", &addr, table.len());
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

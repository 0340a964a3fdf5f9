use std::sync::Arc;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod config;
mod domain;
mod http;
mod metrics;
mod store;
mod utils;

use config::{Config, StoreBackend};
use domain::customer::CustomerCommandHandler;
use store::{DynCustomerStore, InMemoryCustomerStore, ScyllaCustomerStore};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Default to INFO, overridable with RUST_LOG
    // Example: RUST_LOG=debug customer_service
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,customer_service=debug"))
        )
        .init();

    let config = Config::parse();
    tracing::info!(store = ?config.store, "Starting customer service");

    // === 1. Record store ===
    let store: DynCustomerStore = match config.store {
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store; records are lost on restart and the outbox is not relayed");
            Arc::new(InMemoryCustomerStore::new())
        }
        StoreBackend::Scylla => Arc::new(
            ScyllaCustomerStore::connect(&config.scylla_node, &config.scylla_keyspace).await?,
        ),
    };

    // === 2. Prometheus metrics ===
    let metrics = Arc::new(metrics::Metrics::new()?);
    tracing::info!("Metrics registry created with {} metrics", metrics.registry().gather().len());

    // === 3. Command handler and HTTP server ===
    let handler = CustomerCommandHandler::new(store, metrics.clone(), config.command_handler_config());
    let state = http::AppState::new(handler, metrics, config.collapse_errors);

    http::run(&config, state).await?;

    tracing::info!("Customer service stopped");
    Ok(())
}

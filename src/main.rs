// src/main.rs
mod api;
mod auth;
mod config;
mod db;
mod error;
mod memory;
mod models;
mod quotes;
mod service;
#[cfg(test)]
mod testing;
mod valuation;

use crate::config::{Config, StorageBackend};
use crate::db::{HoldingStore, ScyllaHoldingStore};
use crate::memory::MemoryHoldingStore;
use crate::quotes::AlphaVantageGateway;
use crate::service::PortfolioService;
use env_logger::Builder;
use log::{error, info, LevelFilter};
use std::sync::Arc;

#[tokio::main]
async fn main() {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            Builder::new().filter_level(LevelFilter::Error).init();
            error!("Invalid configuration: {}", e);
            return;
        }
    };

    Builder::new()
        .filter_level(config.log_level)
        .format_timestamp_secs()
        .init();

    info!("Starting the stock portfolio application...");

    let store: Arc<dyn HoldingStore> = match config.storage {
        StorageBackend::Scylla => match ScyllaHoldingStore::init(&config.scylla_node).await {
            Ok(store) => Arc::new(store),
            Err(e) => {
                error!("Failed to initialize database: {}", e);
                return;
            }
        },
        StorageBackend::Memory => {
            info!("Using in-memory holding store; data is lost on exit.");
            Arc::new(MemoryHoldingStore::new())
        }
    };
    info!("Connected to database...");

    let quotes = Arc::new(AlphaVantageGateway::new(
        config.alpha_vantage_base_url.clone(),
        config.alpha_vantage_api_key.clone(),
        config.quote_timeout,
    ));
    if config.live_valuation {
        info!("Live valuation enabled for overview and breakdown.");
    }

    let service = Arc::new(PortfolioService::new(store, quotes, config.live_valuation));
    let api = api::routes(service, Arc::new(config.jwt_secret.clone()));

    info!("Server running on http://{}", config.listen_addr);
    warp::serve(api).run(config.listen_addr).await;
}

/// Order Service Application
///
/// This is the main entry point for the food-delivery order service.
/// The application exposes a REST API for placing orders, pricing them from
/// the restaurant menu catalog, and moving them out for delivery.
///
/// # Architecture
///
/// The application follows a modular architecture with:
/// - Model layer with the self-validating order aggregate
/// - Catalog client for authoritative menu prices
/// - Repository layer for data access
/// - Service layer for business logic
/// - API layer for HTTP endpoints and metrics
///
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{error, info};

use app_config::AppConfig;
use catalog::HttpMenuCatalog;
use repository::PgOrderStore;
use server::Server;
use service::OrderServiceImpl;

/// Initialize the tracing subscriber for logging
fn init_logger() {
    tracing_subscriber::fmt::init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logger();

    info!("Order service starting...");

    let config = AppConfig::load().context("Failed to load configuration")?;

    let db_pool = match db::init_db_pool(&config).await {
        Ok(pool) => {
            info!("Database initialized successfully");
            pool
        }
        Err(e) => {
            error!("Failed to initialize database: {:#}", e);
            return Err(e.context("Database connection is required for the order service"));
        }
    };

    let menu_catalog =
        HttpMenuCatalog::from_config(&config).context("Failed to create catalog client")?;
    info!("Using menu catalog at {}", config.catalog_base_url);

    let order_service = Arc::new(OrderServiceImpl::new(
        PgOrderStore::new(db_pool),
        menu_catalog,
    ));

    let http_server = Server::new(config.http_port, order_service, config.shutdown_timeout);
    if let Err(err) = http_server.start().await {
        error!("HTTP server error: {:#}", err);
        return Err(err);
    }

    info!("Application stopped");
    Ok(())
}

//! Saldo API Server
//!
//! Main entry point for the ledger consistency service.

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use saldo_api::{AppState, create_router};
use saldo_core::ledger::{EngineSettings, LedgerEngine};
use saldo_db::{connect_with, repositories::LedgerRepository};
use saldo_shared::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "saldo=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = AppConfig::load().context("Failed to load configuration")?;

    // Connect to database
    let db = connect_with(&config.database).await?;
    info!(
        max_connections = config.database.max_connections,
        "Connected to database"
    );

    // Create the ledger engine
    let settings = EngineSettings::from(&config.ledger);
    info!(
        fleet_concurrency = settings.fleet_concurrency,
        account_timeout_secs = settings.account_timeout.as_secs(),
        consistency_retries = settings.consistency_retries,
        repair_on_backdated_insert = settings.repair_on_backdated_insert,
        "Ledger engine configured"
    );
    let engine = LedgerEngine::with_settings(LedgerRepository::new(db), settings);

    // Create router
    let app = create_router(AppState::new(engine));

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

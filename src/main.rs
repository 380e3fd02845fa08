//! Bank Ledger Engine - Main Application Entry Point
//!
//! This is a REST API server that moves money between bank accounts: ATM
//! withdrawals and deposits, and IBAN transfers, authorized by card and PIN.
//!
//! # Architecture
//!
//! - **Web Framework**: Axum (async HTTP server)
//! - **Records**: PostgreSQL with sqlx, or an in-memory store
//! - **Authentication**: card + PIN, salted HMAC-SHA256 hashes
//! - **Format**: JSON requests/responses
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment variables
//! 2. Open the record store (PostgreSQL when `DATABASE_URL` is set)
//! 3. Build the ledger engine
//! 4. Build HTTP router with routes and middleware
//! 5. Start server on configured port

mod config;
mod db;
mod error;
mod handlers;
mod models;
mod services;
mod store;

use std::{path::Path, sync::Arc};

use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::services::{card_service::HmacPinHasher, engine::LedgerEngine};
use crate::store::{Stores, memory::MemoryStore, postgres::PgStore, retry::RetryPolicy};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Reads RUST_LOG (defaults to "info")
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = config::Config::from_env()?;
    tracing::info!("Configuration loaded");

    let hasher = Arc::new(HmacPinHasher);

    let stores = match &config.database_url {
        Some(database_url) => {
            let pool = db::create_pool(database_url, config.db_max_connections).await?;
            tracing::info!("Database pool created");
            Stores::from_backend(Arc::new(PgStore::new(pool)))
        }
        None => {
            let store = MemoryStore::new();
            if let Some(seed_file) = &config.seed_file {
                store.load_seed_file(Path::new(seed_file), hasher.as_ref())?;
            }
            tracing::warn!("DATABASE_URL not set, records are kept in memory");
            Stores::from_backend(Arc::new(store))
        }
    };

    let engine = Arc::new(LedgerEngine::new(
        stores,
        hasher,
        RetryPolicy::from_config(&config),
    ));
    engine.ping().await?;

    let app = handlers::routes()
        // Add distributed tracing middleware for observability
        .layer(TraceLayer::new_for_http())
        .with_state(engine);

    let addr = format!("0.0.0.0:{}", config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

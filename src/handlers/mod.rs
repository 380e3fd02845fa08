//! HTTP request handlers (route handlers).
//!
//! Each handler is an async function that:
//! 1. Extracts the path parameters and JSON body
//! 2. Calls one `LedgerEngine` operation
//! 3. Returns the result as JSON, or a `LedgerError` response

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;

use crate::services::engine::LedgerEngine;

/// Account lookup and ledger history endpoints
pub mod accounts;
/// ATM withdrawal and deposit endpoints
pub mod atms;
/// Card activation, PIN change and lookup endpoints
pub mod cards;
/// Service health endpoint
pub mod health;
/// Transfer endpoint
pub mod transactions;

/// Shared state of every handler.
pub type AppState = Arc<LedgerEngine>;

/// Every route of the service.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/api/v1/atms/withdraw", post(atms::withdraw))
        .route("/api/v1/atms/deposit", post(atms::deposit))
        .route(
            "/api/v1/transactions/transfer",
            post(transactions::create_transfer),
        )
        .route("/api/v1/cards/{id}", get(cards::get_card))
        .route("/api/v1/cards/{id}/activate", post(cards::activate_card))
        .route("/api/v1/cards/{id}/pin", post(cards::change_pin))
        .route("/api/v1/accounts/{id}", get(accounts::get_account))
        .route(
            "/api/v1/accounts/{id}/transactions",
            get(accounts::list_account_transactions),
        )
}

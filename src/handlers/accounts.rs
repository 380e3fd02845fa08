//! Account HTTP handlers.
//!
//! This module implements the read-only account endpoints:
//! - GET /api/v1/accounts/:id - Get account by ID
//! - GET /api/v1/accounts/:id/transactions - Ledger entries, oldest first
//!
//! Accounts are created and maintained by the CRUD side; the engine only
//! changes their balances.

use axum::{
    Json,
    extract::{Path, State},
};
use uuid::Uuid;

use crate::{
    error::LedgerError,
    handlers::AppState,
    models::{account::Account, transaction::Transaction},
};

/// Get a specific account by ID.
///
/// # Response
///
/// - **Success (200 OK)**: Returns account details
/// - **Error (404)**: Account not found
///
/// ```json
/// {
///   "id": "550e8400-e29b-41d4-a716-446655440000",
///   "iban": "ES9121000418450200051332",
///   "balance_cents": 40000,
///   "currency": "USD",
///   "bank_id": "7a0e8400-e29b-41d4-a716-446655440000"
/// }
/// ```
pub async fn get_account(
    State(engine): State<AppState>,
    Path(account_id): Path<Uuid>,
) -> Result<Json<Account>, LedgerError> {
    Ok(Json(engine.get_account(account_id).await?))
}

/// List the ledger entries of an account.
///
/// Amounts are positive magnitudes; `transaction_type` gives the direction.
pub async fn list_account_transactions(
    State(engine): State<AppState>,
    Path(account_id): Path<Uuid>,
) -> Result<Json<Vec<Transaction>>, LedgerError> {
    Ok(Json(engine.account_transactions(account_id).await?))
}

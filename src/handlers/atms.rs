//! ATM HTTP handlers.
//!
//! This module implements the cash endpoints:
//! - POST /api/v1/atms/withdraw - Take cash out of the card's account
//! - POST /api/v1/atms/deposit - Put cash into the card's account

use axum::{Json, extract::State};

use crate::{
    error::LedgerError,
    handlers::AppState,
    models::transaction::{DepositReceipt, DepositRequest, WithdrawRequest, WithdrawalReceipt},
};

/// Withdraw cash at an ATM.
///
/// # Request Body
///
/// ```json
/// {
///   "card_id": "123e4567-...",
///   "atm_id": "123e4567-...",
///   "pin": "1234",
///   "amount_cents": 10000
/// }
/// ```
///
/// # Response (200)
///
/// ```json
/// {
///   "withdrawn_cents": 10000,
///   "commission_cents": 100,
///   "new_balance_cents": 39900,
///   "currency": "USD"
/// }
/// ```
pub async fn withdraw(
    State(engine): State<AppState>,
    Json(request): Json<WithdrawRequest>,
) -> Result<Json<WithdrawalReceipt>, LedgerError> {
    let receipt = engine
        .withdraw(
            request.card_id,
            request.atm_id,
            request.pin.expose(),
            request.amount_cents,
        )
        .await?;

    Ok(Json(receipt))
}

/// Deposit cash at an ATM of the account's own bank.
///
/// Same request body as a withdrawal.
pub async fn deposit(
    State(engine): State<AppState>,
    Json(request): Json<DepositRequest>,
) -> Result<Json<DepositReceipt>, LedgerError> {
    let receipt = engine
        .deposit(
            request.card_id,
            request.atm_id,
            request.pin.expose(),
            request.amount_cents,
        )
        .await?;

    Ok(Json(receipt))
}

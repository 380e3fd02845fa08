//! Transfer HTTP handler.
//!
//! - POST /api/v1/transactions/transfer - Move money to another account by IBAN

use axum::{Json, extract::State};

use crate::{
    error::LedgerError,
    handlers::AppState,
    models::transaction::{TransferReceipt, TransferRequest},
};

/// Transfer money between accounts.
///
/// # Request Body
///
/// ```json
/// {
///   "card_id": "123e4567-...",
///   "pin": "1234",
///   "from_account_id": "550e8400-...",
///   "to_iban": "ES91 2100 0418 4502 0005 1332",
///   "amount_cents": 10000,
///   "description": "Rent"
/// }
/// ```
///
/// # Response (200)
///
/// ```json
/// {
///   "transferred_cents": 10000,
///   "commission_cents": 1000,
///   "from_new_balance_cents": 89000,
///   "to_new_balance_cents": 60000,
///   "currency": "USD"
/// }
/// ```
///
/// # Validation
///
/// - The card must belong to `from_account_id` (403 otherwise)
/// - `to_iban` must be a well-formed IBAN (400 otherwise)
/// - The source balance must cover the amount (422 otherwise)
pub async fn create_transfer(
    State(engine): State<AppState>,
    Json(request): Json<TransferRequest>,
) -> Result<Json<TransferReceipt>, LedgerError> {
    let receipt = engine
        .transfer(
            request.card_id,
            request.pin.expose(),
            request.from_account_id,
            &request.to_iban,
            request.amount_cents,
            request.description,
        )
        .await?;

    Ok(Json(receipt))
}

//! Error types and HTTP error response handling.
//!
//! Two layers of errors exist:
//! - `StoreError`: a collaborator (record store) failed to answer
//! - `LedgerError`: an engine operation was rejected or could not complete
//!
//! `LedgerError` is also what route handlers return, so it knows how to turn
//! itself into an HTTP response with a JSON body.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use uuid::Uuid;

/// Failure reported by one of the record stores.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database operation failed (connection error, query error, decode error).
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A single store call exceeded its time budget.
    #[error("Store call `{0}` timed out")]
    Timeout(&'static str),

    /// A write targeted a record that does not exist.
    #[error("Record {0} not found")]
    MissingRecord(Uuid),
}

impl StoreError {
    /// Whether repeating the same call may succeed.
    ///
    /// Only connectivity-style failures qualify. A missing record or a query
    /// that the database rejected will fail the same way every time.
    pub fn is_transient(&self) -> bool {
        match self {
            StoreError::Timeout(_) => true,
            StoreError::Database(e) => matches!(
                e,
                sqlx::Error::Io(_)
                    | sqlx::Error::PoolTimedOut
                    | sqlx::Error::PoolClosed
                    | sqlx::Error::WorkerCrashed
            ),
            StoreError::MissingRecord(_) => false,
        }
    }
}

/// Engine-wide error type.
///
/// # Error Categories
///
/// - **Lookup Errors**: card, account, ATM or destination missing
/// - **Credential Errors**: card not activated, PIN mismatch
/// - **Business Rule Errors**: funds, credit, limits, bank boundaries
/// - **Validation Errors**: malformed IBAN or request data
/// - **Infrastructure Errors**: store failures and failed rollbacks
///
/// No variant ever carries a PIN or a PIN hash.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Card {card_id} not found")]
    CardNotFound { card_id: Uuid },

    #[error("Card {card_id} is not activated")]
    NotActivated { card_id: Uuid },

    /// Returns HTTP 409 Conflict. PIN rotation goes through the PIN change.
    #[error("Card {card_id} is already activated")]
    AlreadyActivated { card_id: Uuid },

    /// Returns HTTP 401 Unauthorized.
    #[error("Invalid PIN for card {card_id}")]
    InvalidCredential { card_id: Uuid },

    #[error("Account {account_id} not found")]
    AccountNotFound { account_id: Uuid },

    #[error("ATM {atm_id} not found")]
    AtmNotFound { atm_id: Uuid },

    #[error("Insufficient funds on account {account_id}")]
    InsufficientFunds { account_id: Uuid },

    /// Credit card asked for more than its remaining credit.
    #[error("Credit limit exceeded for card {card_id}: {available_cents} available")]
    CreditLimitExceeded { card_id: Uuid, available_cents: i64 },

    #[error("Card {card_id} has unsupported type {card_type}")]
    UnsupportedCardType { card_id: Uuid, card_type: String },

    /// Amount above the per-card ceiling, regardless of current usage.
    #[error("Withdrawal amount exceeds limit of {limit_cents} for card {card_id}")]
    LimitExceeded { card_id: Uuid, limit_cents: i64 },

    #[error("Deposits into account {account_id} are not allowed at ATM {atm_id} of another bank")]
    CrossBankDepositNotAllowed { atm_id: Uuid, account_id: Uuid },

    #[error("Card {card_id} does not belong to account {account_id}")]
    CardAccountMismatch { card_id: Uuid, account_id: Uuid },

    #[error("Source account {account_id} not found")]
    SourceAccountNotFound { account_id: Uuid },

    #[error("Invalid destination IBAN format: {0}")]
    InvalidIban(String),

    #[error("No account found for IBAN {iban}")]
    DestinationAccountNotFound { iban: String },

    /// Request body or parameters are invalid.
    ///
    /// The String contains details about what was invalid.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// A store call failed before any write of the operation was made, or the
    /// operation's own writes were rolled back successfully.
    #[error("Store failure: {0}")]
    Store(#[from] StoreError),

    /// Compensation of a partially applied operation failed. Ledger and
    /// cached balances may disagree and an operator has to reconcile them.
    #[error("Consistency fault during {operation}: {cause}; rollback failed: {rollback}")]
    ConsistencyFault {
        operation: &'static str,
        cause: String,
        rollback: String,
    },
}

impl LedgerError {
    /// Stable machine-readable code for clients.
    pub fn code(&self) -> &'static str {
        match self {
            LedgerError::CardNotFound { .. } => "card_not_found",
            LedgerError::NotActivated { .. } => "card_not_activated",
            LedgerError::AlreadyActivated { .. } => "card_already_activated",
            LedgerError::InvalidCredential { .. } => "invalid_credential",
            LedgerError::AccountNotFound { .. } => "account_not_found",
            LedgerError::AtmNotFound { .. } => "atm_not_found",
            LedgerError::InsufficientFunds { .. } => "insufficient_funds",
            LedgerError::CreditLimitExceeded { .. } => "credit_limit_exceeded",
            LedgerError::UnsupportedCardType { .. } => "unsupported_card_type",
            LedgerError::LimitExceeded { .. } => "limit_exceeded",
            LedgerError::CrossBankDepositNotAllowed { .. } => "cross_bank_deposit_not_allowed",
            LedgerError::CardAccountMismatch { .. } => "card_account_mismatch",
            LedgerError::SourceAccountNotFound { .. } => "source_account_not_found",
            LedgerError::InvalidIban(_) => "invalid_iban",
            LedgerError::DestinationAccountNotFound { .. } => "destination_account_not_found",
            LedgerError::InvalidRequest(_) => "invalid_request",
            LedgerError::Store(_) => "store_unavailable",
            LedgerError::ConsistencyFault { .. } => "consistency_fault",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            LedgerError::CardNotFound { .. }
            | LedgerError::AccountNotFound { .. }
            | LedgerError::AtmNotFound { .. }
            | LedgerError::SourceAccountNotFound { .. }
            | LedgerError::DestinationAccountNotFound { .. } => StatusCode::NOT_FOUND,
            LedgerError::InvalidCredential { .. } => StatusCode::UNAUTHORIZED,
            LedgerError::AlreadyActivated { .. } => StatusCode::CONFLICT,
            LedgerError::NotActivated { .. }
            | LedgerError::CardAccountMismatch { .. }
            | LedgerError::CrossBankDepositNotAllowed { .. } => StatusCode::FORBIDDEN,
            LedgerError::InsufficientFunds { .. }
            | LedgerError::CreditLimitExceeded { .. }
            | LedgerError::UnsupportedCardType { .. }
            | LedgerError::LimitExceeded { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            LedgerError::InvalidIban(_) | LedgerError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            LedgerError::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
            LedgerError::ConsistencyFault { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Convert LedgerError into an HTTP response.
///
/// # Response Format
///
/// ```json
/// {
///   "error": {
///     "code": "insufficient_funds",
///     "message": "Insufficient funds on account 550e8400-..."
///   }
/// }
/// ```
///
/// Store failures and consistency faults hide their details from the client;
/// they are logged in full instead.
impl IntoResponse for LedgerError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();

        let message = match &self {
            LedgerError::Store(e) => {
                tracing::error!(error = %e, "store failure");
                "The account store is temporarily unavailable".to_string()
            }
            LedgerError::ConsistencyFault { .. } => {
                tracing::error!(error = %self, "consistency fault surfaced to client");
                "An internal error occurred".to_string()
            }
            _ => self.to_string(),
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

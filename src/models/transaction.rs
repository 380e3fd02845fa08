//! Ledger entry models and operation request/receipt types.
//!
//! This module defines:
//! - `Transaction`: an immutable ledger entry
//! - `NewTransaction`: an entry about to be appended
//! - Request bodies for withdraw, deposit and transfer
//! - Receipts returned by those operations

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::models::{account::Account, card::Pin};

/// Purpose of a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    Withdrawal,
    Deposit,
    Fee,
    TransferSent,
    TransferReceived,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Withdrawal => "WITHDRAWAL",
            TransactionType::Deposit => "DEPOSIT",
            TransactionType::Fee => "FEE",
            TransactionType::TransferSent => "TRANSFER_SENT",
            TransactionType::TransferReceived => "TRANSFER_RECEIVED",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Unknown transaction type: {0}")]
pub struct UnknownTransactionType(String);

impl TryFrom<String> for TransactionType {
    type Error = UnknownTransactionType;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "WITHDRAWAL" => Ok(TransactionType::Withdrawal),
            "DEPOSIT" => Ok(TransactionType::Deposit),
            "FEE" => Ok(TransactionType::Fee),
            "TRANSFER_SENT" => Ok(TransactionType::TransferSent),
            "TRANSFER_RECEIVED" => Ok(TransactionType::TransferReceived),
            _ => Err(UnknownTransactionType(value)),
        }
    }
}

/// Represents a ledger entry.
///
/// Entries are immutable once created. The sequence of entries of an account
/// is its audit trail.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,

    /// Always a positive magnitude; the direction comes from `transaction_type`
    pub amount_cents: i64,

    pub currency: String,

    #[sqlx(try_from = "String")]
    pub transaction_type: TransactionType,

    pub description: Option<String>,

    /// Card used to authorize the movement, when there was one
    pub card_id: Option<Uuid>,

    pub account_id: Uuid,

    pub created_at: DateTime<Utc>,
}

/// A ledger entry ready to be appended.
///
/// The id is chosen before the write so that appending the same entry twice
/// (a retried call) stores it once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTransaction {
    pub id: Uuid,
    pub amount_cents: i64,
    pub currency: String,
    pub transaction_type: TransactionType,
    pub description: Option<String>,
    pub card_id: Option<Uuid>,
    pub account_id: Uuid,
}

impl NewTransaction {
    /// Entry on `account` in the account's own currency.
    pub fn new(
        transaction_type: TransactionType,
        account: &Account,
        amount_cents: i64,
        card_id: Option<Uuid>,
        description: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            amount_cents,
            currency: account.currency.clone(),
            transaction_type,
            description,
            card_id,
            account_id: account.id,
        }
    }

    pub fn into_transaction(self, created_at: DateTime<Utc>) -> Transaction {
        Transaction {
            id: self.id,
            amount_cents: self.amount_cents,
            currency: self.currency,
            transaction_type: self.transaction_type,
            description: self.description,
            card_id: self.card_id,
            account_id: self.account_id,
            created_at,
        }
    }
}

/// Request to withdraw cash at an ATM.
///
/// # JSON Example
///
/// ```json
/// {
///   "card_id": "123e4567-e89b-12d3-a456-426614174000",
///   "atm_id": "123e4567-e89b-12d3-a456-426614174001",
///   "pin": "1234",
///   "amount_cents": 10000
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct WithdrawRequest {
    pub card_id: Uuid,
    pub atm_id: Uuid,
    pub pin: Pin,
    pub amount_cents: i64,
}

/// Request to deposit cash at an ATM. Same shape as a withdrawal.
#[derive(Debug, Deserialize)]
pub struct DepositRequest {
    pub card_id: Uuid,
    pub atm_id: Uuid,
    pub pin: Pin,
    pub amount_cents: i64,
}

/// Request to transfer money to another account, addressed by IBAN.
///
/// # JSON Example
///
/// ```json
/// {
///   "card_id": "123e4567-e89b-12d3-a456-426614174000",
///   "pin": "1234",
///   "from_account_id": "550e8400-e29b-41d4-a716-446655440000",
///   "to_iban": "ES91 2100 0418 4502 0005 1332",
///   "amount_cents": 25000,
///   "description": "Rent"
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct TransferRequest {
    pub card_id: Uuid,
    pub pin: Pin,
    pub from_account_id: Uuid,
    pub to_iban: String,
    pub amount_cents: i64,
    pub description: Option<String>,
}

/// Result of a completed withdrawal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalReceipt {
    pub withdrawn_cents: i64,
    pub commission_cents: i64,
    pub new_balance_cents: i64,
    pub currency: String,
}

/// Result of a completed deposit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositReceipt {
    pub deposited_cents: i64,
    pub new_balance_cents: i64,
    pub currency: String,
}

/// Result of a completed transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferReceipt {
    pub transferred_cents: i64,
    pub commission_cents: i64,
    pub from_new_balance_cents: i64,
    pub to_new_balance_cents: i64,
    pub currency: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transaction_type_text_matches_serde_names() {
        for kind in [
            TransactionType::Withdrawal,
            TransactionType::Deposit,
            TransactionType::Fee,
            TransactionType::TransferSent,
            TransactionType::TransferReceived,
        ] {
            let json = serde_json::to_value(kind).unwrap();
            assert_eq!(json, kind.as_str());
            assert_eq!(TransactionType::try_from(kind.as_str().to_string()).unwrap(), kind);
        }
        assert!(TransactionType::try_from("REFUND".to_string()).is_err());
    }
}

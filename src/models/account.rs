//! Account data model and IBAN handling.
//!
//! This module defines:
//! - `Account`: a bank account whose balance the engine maintains
//! - `normalize_iban` / `is_valid_iban`: the IBAN shape rules used by transfers

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Represents an account record.
///
/// # Balance Storage
///
/// Balances are stored as `i64` minor units (cents for USD) to avoid
/// floating-point drift. A negative balance is credit drawn on a
/// credit-linked card.
///
/// For example:
/// - $10.50 is stored as 1050
/// - -$200.00 (200 of credit used) is stored as -20000
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow, Serialize, Deserialize)]
pub struct Account {
    /// Unique identifier for this account
    pub id: Uuid,

    /// International Bank Account Number, unique across accounts
    ///
    /// Stored as entered by the CRUD side; compare with `normalize_iban`.
    pub iban: String,

    /// Current balance in minor units
    ///
    /// This is a cache of the ledger: only the engine writes it.
    pub balance_cents: i64,

    /// Currency code (ISO 4217, 3 letters). Recorded, never converted.
    pub currency: String,

    /// Bank that holds this account
    pub bank_id: Uuid,
}

impl Account {
    /// Magnitude of a negative balance; zero when the balance is positive.
    pub fn credit_used_cents(&self) -> i64 {
        self.balance_cents.saturating_neg().max(0)
    }
}

/// Strip every whitespace character from an IBAN.
///
/// "ES91 2100 0418 4502 0005 1332" and "ES9121000418450200051332" are the
/// same account.
pub fn normalize_iban(iban: &str) -> String {
    iban.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Check the IBAN shape on an already-normalized value.
///
/// Two uppercase ASCII letters (country), two digits (check digits), then
/// 1 to 30 ASCII letters or digits. Check digits are not verified.
pub fn is_valid_iban(normalized: &str) -> bool {
    let bytes = normalized.as_bytes();
    if bytes.len() < 5 || bytes.len() > 34 {
        return false;
    }

    bytes[..2].iter().all(u8::is_ascii_uppercase)
        && bytes[2..4].iter().all(u8::is_ascii_digit)
        && bytes[4..].iter().all(u8::is_ascii_alphanumeric)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_removes_inner_whitespace() {
        assert_eq!(
            normalize_iban(" ES91 2100\t0418 4502 0005 1332 "),
            "ES9121000418450200051332"
        );
    }

    #[test]
    fn accepts_well_formed_iban() {
        assert!(is_valid_iban("ES9121000418450200051332"));
        assert!(is_valid_iban("GB29NWBK60161331926819"));
        assert!(is_valid_iban("DE001"));
    }

    #[test]
    fn rejects_malformed_iban() {
        assert!(!is_valid_iban(""));
        assert!(!is_valid_iban("ES91"));
        assert!(!is_valid_iban("es9121000418450200051332"));
        assert!(!is_valid_iban("E19121000418450200051332"));
        assert!(!is_valid_iban("ESX121000418450200051332"));
        assert!(!is_valid_iban("ES91-2100-0418"));
        assert!(!is_valid_iban(&format!("ES91{}", "1".repeat(31))));
        assert!(!is_valid_iban("ES91 2100 0418"));
    }

    #[test]
    fn credit_used_only_counts_negative_balance() {
        let mut account = Account {
            id: Uuid::new_v4(),
            iban: "ES9121000418450200051332".into(),
            balance_cents: -20_000,
            currency: "USD".into(),
            bank_id: Uuid::new_v4(),
        };
        assert_eq!(account.credit_used_cents(), 20_000);

        account.balance_cents = 5_000;
        assert_eq!(account.credit_used_cents(), 0);

        account.balance_cents = i64::MIN;
        assert_eq!(account.credit_used_cents(), i64::MAX);
    }
}

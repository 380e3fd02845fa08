//! Bank and ATM records.
//!
//! Both are read-only for the engine. A bank contributes its commission rate,
//! an ATM only its owning bank.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Commission rate applied when a bank has none configured, or cannot be found.
pub const DEFAULT_COMMISSION_RATE: Decimal = dec!(0.05);

/// Represents a bank record.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow, Serialize, Deserialize)]
pub struct Bank {
    pub id: Uuid,

    pub name: String,

    /// Commission rate as a fraction (0.05 = 5%)
    ///
    /// NULL means the default rate applies.
    #[serde(default)]
    pub commission: Option<Decimal>,
}

impl Bank {
    /// Effective commission rate for this bank.
    pub fn commission_rate(&self) -> Decimal {
        self.commission.unwrap_or(DEFAULT_COMMISSION_RATE)
    }
}

/// Represents an ATM record.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow, Serialize, Deserialize)]
pub struct Atm {
    pub id: Uuid,

    /// Bank operating this ATM; decides same-bank vs. cross-bank
    pub bank_id: Uuid,

    #[serde(default)]
    pub name: Option<String>,
}

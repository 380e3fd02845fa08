//! Inter-bank commission.
//!
//! Commission is `max(1 unit, round(rate * amount))`, where the rate comes
//! from the bank of the paying account. A missing bank record falls back to
//! the default rate instead of blocking the operation.

use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::LedgerError;
use crate::models::{
    bank::DEFAULT_COMMISSION_RATE,
    money::{apply_rate, minor_units_per_major},
};
use crate::store::{BankStore, retry::RetryPolicy};

#[derive(Clone)]
pub struct CommissionCalculator {
    banks: Arc<dyn BankStore>,
    retry: RetryPolicy,
}

impl CommissionCalculator {
    pub fn new(banks: Arc<dyn BankStore>, retry: RetryPolicy) -> Self {
        Self { banks, retry }
    }

    /// Fee charged by `bank_id` for moving `amount_cents` across banks.
    pub async fn commission(
        &self,
        bank_id: Uuid,
        amount_cents: i64,
        currency: &str,
    ) -> Result<i64, LedgerError> {
        let banks = &self.banks;
        let bank = self
            .retry
            .call("banks.get", move || banks.get(bank_id))
            .await?;

        let rate = match bank {
            Some(bank) => bank.commission_rate(),
            None => {
                tracing::warn!(%bank_id, "bank not found, using default commission rate");
                DEFAULT_COMMISSION_RATE
            }
        };

        Ok(compute_commission(rate, amount_cents, currency))
    }
}

/// `max(one major unit, round(rate * amount))`, in minor units.
pub fn compute_commission(rate: Decimal, amount_cents: i64, currency: &str) -> i64 {
    apply_rate(rate, amount_cents).max(minor_units_per_major(currency))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::Fixture;
    use rust_decimal_macros::dec;

    #[test]
    fn proportional_fee_above_the_floor() {
        // 5% of 100.00 USD
        assert_eq!(compute_commission(dec!(0.05), 10_000, "USD"), 500);
        // 10% of 100.00 USD
        assert_eq!(compute_commission(dec!(0.1), 10_000, "USD"), 1_000);
    }

    #[test]
    fn floor_of_one_currency_unit_applies() {
        // 0.1% of 1.00 USD is a tenth of a cent; the fee is one dollar
        assert_eq!(compute_commission(dec!(0.001), 100, "USD"), 100);
        // 1% of 100.00 USD is exactly the floor
        assert_eq!(compute_commission(dec!(0.01), 10_000, "USD"), 100);
        // Zero-decimal currency: the floor is 1 yen
        assert_eq!(compute_commission(dec!(0.001), 1, "JPY"), 1);
    }

    #[test]
    fn rounds_to_the_smallest_unit() {
        // 3.5% of 123.45 EUR = 4.32075 EUR
        assert_eq!(compute_commission(dec!(0.035), 12_345, "EUR"), 432);
        // 2.5% of 1001.00 EUR = 25.025 EUR, half a cent rounds up
        assert_eq!(compute_commission(dec!(0.025), 100_100, "EUR"), 2_503);
    }

    #[tokio::test]
    async fn uses_configured_bank_rate() {
        let fx = Fixture::new();
        let bank = fx.bank(Some(dec!(0.1)));

        let fee = fx
            .engine
            .commission_calculator()
            .commission(bank, 10_000, "USD")
            .await
            .unwrap();
        assert_eq!(fee, 1_000);
    }

    #[tokio::test]
    async fn bank_without_rate_uses_default() {
        let fx = Fixture::new();
        let bank = fx.bank(None);

        let fee = fx
            .engine
            .commission_calculator()
            .commission(bank, 10_000, "USD")
            .await
            .unwrap();
        assert_eq!(fee, 500);
    }

    #[tokio::test]
    async fn missing_bank_falls_back_to_default_rate() {
        let fx = Fixture::new();

        let fee = fx
            .engine
            .commission_calculator()
            .commission(Uuid::new_v4(), 100_000, "USD")
            .await
            .unwrap();
        assert_eq!(fee, 5_000);
    }
}

//! Minor-unit money helpers.
//!
//! All amounts in this crate are `i64` counts of a currency's smallest unit.
//! Rates are `Decimal` so that `rate * amount` is exact before rounding.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

/// Number of minor units in one major unit of `currency`.
///
/// Unknown codes are assumed to have two decimals.
pub fn minor_units_per_major(currency: &str) -> i64 {
    match currency.to_ascii_uppercase().as_str() {
        "JPY" | "KRW" | "VND" | "CLP" | "ISK" | "PYG" | "UGX" | "XAF" | "XOF" => 1,
        "BHD" | "IQD" | "JOD" | "KWD" | "LYD" | "OMR" | "TND" => 1000,
        _ => 100,
    }
}

/// `rate * amount` rounded half away from zero to a whole minor unit.
///
/// Saturates at `i64::MAX` for results that do not fit.
pub fn apply_rate(rate: Decimal, amount_cents: i64) -> i64 {
    rate.checked_mul(Decimal::from(amount_cents))
        .and_then(|product| {
            product
                .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
                .to_i64()
        })
        .unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn currency_exponents() {
        assert_eq!(minor_units_per_major("USD"), 100);
        assert_eq!(minor_units_per_major("eur"), 100);
        assert_eq!(minor_units_per_major("JPY"), 1);
        assert_eq!(minor_units_per_major("KWD"), 1000);
    }

    #[test]
    fn rate_rounds_half_away_from_zero() {
        assert_eq!(apply_rate(dec!(0.05), 10_000), 500);
        assert_eq!(apply_rate(dec!(0.05), 10), 1);
        assert_eq!(apply_rate(dec!(0.05), 9), 0);
        assert_eq!(apply_rate(dec!(0.001), 100), 0);
        assert_eq!(apply_rate(dec!(0.015), 100), 2);
    }

    #[test]
    fn absurd_rate_saturates() {
        assert_eq!(apply_rate(Decimal::MAX, i64::MAX), i64::MAX);
        assert_eq!(apply_rate(dec!(1000), i64::MAX), i64::MAX);
    }
}

//! Money arithmetic helpers.
//!
//! Prices are plain [`Decimal`] values in the store currency. Intermediate
//! results (for example a discounted price) keep full precision; values that
//! get persisted or shown to customers are rounded with [`round_money`].

use rust_decimal::{Decimal, RoundingStrategy};

use super::Quantity;

/// Number of decimal places stored for monetary amounts (`NUMERIC(10, 2)`).
pub const MONEY_SCALE: u32 = 2;

/// Round an amount to cents, half away from zero.
#[must_use]
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Subtotal of a line: unit price times quantity.
#[must_use]
pub fn line_subtotal(unit_price: Decimal, quantity: Quantity) -> Decimal {
    unit_price * Decimal::from(quantity.get())
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap_or_default()
    }

    #[test]
    fn test_round_money_half_away_from_zero() {
        assert_eq!(round_money(dec("10.005")), dec("10.01"));
        assert_eq!(round_money(dec("10.004")), dec("10.00"));
    }

    #[test]
    fn test_line_subtotal() {
        let qty = Quantity::new(3).unwrap_or(Quantity::ONE);
        assert_eq!(line_subtotal(dec("19.99"), qty), dec("59.97"));
    }
}

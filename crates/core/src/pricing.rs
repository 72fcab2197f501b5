//! Discounts and effective price computation.
//!
//! A product may be linked to any number of discounts. A discount applies only
//! while `now` lies inside its validity window (both ends inclusive). When
//! several discounts are active at once the largest percentage wins; discounts
//! never stack.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{DiscountId, round_money};

/// A percentage discount with a validity window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discount {
    pub id: DiscountId,
    /// Percentage taken off the price, `0..=100`.
    pub discount: Decimal,
    pub created_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
}

impl Discount {
    /// Whether the discount applies at `now`.
    #[must_use]
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.created_at <= now && now <= self.end_at
    }
}

/// Pick the discount that applies at `now`: the largest active percentage.
pub fn best_active_discount<'a, I>(discounts: I, now: DateTime<Utc>) -> Option<&'a Discount>
where
    I: IntoIterator<Item = &'a Discount>,
{
    discounts
        .into_iter()
        .filter(|d| d.is_active_at(now))
        .max_by(|a, b| a.discount.cmp(&b.discount))
}

/// Apply a percentage discount to a price without rounding.
#[must_use]
pub fn apply_discount(price: Decimal, percent: Decimal) -> Decimal {
    price * (Decimal::ONE - percent / Decimal::ONE_HUNDRED)
}

/// Price of a product at a given instant.
///
/// # Examples
///
/// ```
/// use chrono::{Duration, Utc};
/// use rust_decimal::Decimal;
/// use furnish_core::{Discount, DiscountId, PriceBreakdown};
///
/// let now = Utc::now();
/// let sale = Discount {
///     id: DiscountId::new(1),
///     discount: Decimal::from(50),
///     created_at: now - Duration::days(1),
///     end_at: now + Duration::days(1),
/// };
///
/// let price = PriceBreakdown::at(Decimal::from(250), &[sale], now);
/// assert_eq!(price.total_price, Decimal::from(125));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceBreakdown {
    /// List price.
    pub price: Decimal,
    /// Percentage of the discount that applied, if any.
    pub discount: Option<Decimal>,
    /// Price after the discount (equal to `price` when none applies).
    pub total_price: Decimal,
}

impl PriceBreakdown {
    /// Compute the breakdown for `price` given the product's discounts.
    #[must_use]
    pub fn at(price: Decimal, discounts: &[Discount], now: DateTime<Utc>) -> Self {
        match best_active_discount(discounts, now) {
            Some(d) => Self {
                price,
                discount: Some(d.discount),
                total_price: apply_discount(price, d.discount),
            },
            None => Self {
                price,
                discount: None,
                total_price: price,
            },
        }
    }

    /// Whether either the list price or the discounted price lies within the
    /// optional bounds (inclusive).
    ///
    /// The discounted price is compared after rounding to cents, as it is
    /// shown and charged.
    #[must_use]
    pub fn matches_range(&self, min: Option<Decimal>, max: Option<Decimal>) -> bool {
        let within = |value: Decimal| {
            min.is_none_or(|lo| value >= lo) && max.is_none_or(|hi| value <= hi)
        };
        within(self.price) || within(round_money(self.total_price))
    }
}

//! Cart and order line quantities.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when constructing a [`Quantity`].
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityError {
    /// Zero or negative quantities are not allowed.
    #[error("quantity must be a positive integer (got {0})")]
    NotPositive(i64),
    /// The value does not fit the storage column.
    #[error("quantity must be at most {max}")]
    TooLarge {
        /// Maximum allowed quantity.
        max: u32,
    },
}

/// A positive line quantity (`>= 1`).
///
/// Deserialization goes through [`Quantity::new`], so a request body carrying
/// `0` or a negative number is rejected before it reaches a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u32")]
pub struct Quantity(u32);

impl Quantity {
    /// A single unit, the default for "add to cart".
    pub const ONE: Self = Self(1);

    /// Largest quantity that fits an `INTEGER` column.
    pub const MAX: u32 = i32::MAX as u32;

    /// Create a quantity from an untrusted integer.
    ///
    /// # Errors
    ///
    /// Returns [`QuantityError::NotPositive`] for values below one and
    /// [`QuantityError::TooLarge`] for values above [`Quantity::MAX`].
    pub fn new(value: i64) -> Result<Self, QuantityError> {
        if value < 1 {
            return Err(QuantityError::NotPositive(value));
        }
        u32::try_from(value)
            .ok()
            .filter(|v| *v <= Self::MAX)
            .map(Self)
            .ok_or(QuantityError::TooLarge { max: Self::MAX })
    }

    /// The quantity as an unsigned integer.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }

    /// The quantity as the signed type used by the database.
    #[must_use]
    #[allow(clippy::cast_possible_wrap)] // bounded by Quantity::MAX
    pub const fn as_i32(self) -> i32 {
        self.0 as i32
    }
}

impl Default for Quantity {
    fn default() -> Self {
        Self::ONE
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<i64> for Quantity {
    type Error = QuantityError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Quantity> for u32 {
    fn from(quantity: Quantity) -> Self {
        quantity.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_zero_and_negative() {
        assert_eq!(Quantity::new(0), Err(QuantityError::NotPositive(0)));
        assert_eq!(Quantity::new(-3), Err(QuantityError::NotPositive(-3)));
    }

    #[test]
    fn test_accepts_one() {
        assert_eq!(Quantity::new(1).map(Quantity::get), Ok(1));
    }

    #[test]
    fn test_rejects_overflowing_column() {
        let too_big = i64::from(i32::MAX) + 1;
        assert!(matches!(
            Quantity::new(too_big),
            Err(QuantityError::TooLarge { .. })
        ));
    }

    #[test]
    fn test_deserialize_rejects_zero() {
        let parsed: Result<Quantity, _> = serde_json::from_str("0");
        assert!(parsed.is_err());
        let parsed: Result<Quantity, _> = serde_json::from_str("5");
        assert_eq!(parsed.ok(), Quantity::new(5).ok());
    }
}

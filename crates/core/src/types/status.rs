//! Status enums for various entities.

use serde::{Deserialize, Serialize};

/// Error returned for a transition the order state machine does not allow.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("order cannot move from {from} to {to}")]
pub struct StatusTransitionError {
    /// Current status.
    pub from: OrderStatus,
    /// Requested status.
    pub to: OrderStatus,
}

/// Payment status of an order.
///
/// Orders are created unpaid and can only move forward to paid; there is no
/// cancellation or refund state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Created,
    Paid,
}

impl OrderStatus {
    /// Map the persisted `paid` flag to a status.
    #[must_use]
    pub const fn from_paid(paid: bool) -> Self {
        if paid { Self::Paid } else { Self::Created }
    }

    /// Whether payment has been recorded.
    #[must_use]
    pub const fn is_paid(self) -> bool {
        matches!(self, Self::Paid)
    }

    /// Record payment.
    ///
    /// # Errors
    ///
    /// Returns [`StatusTransitionError`] if the order is already paid.
    pub const fn pay(self) -> Result<Self, StatusTransitionError> {
        match self {
            Self::Created => Ok(Self::Paid),
            Self::Paid => Err(StatusTransitionError {
                from: self,
                to: Self::Paid,
            }),
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Paid => write!(f, "paid"),
        }
    }
}

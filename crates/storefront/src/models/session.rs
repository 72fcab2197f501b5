//! Session-related types.
//!
//! Anonymous visitors keep their cart and favorites in the session; logged-in
//! users are identified by the `current_user` entry written by the login flow.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use furnish_core::{ProductId, Quantity, UserId};

use super::CartLine;

/// Session-stored user identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    /// User's database ID.
    pub id: UserId,
}

/// Who is making a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Identity {
    #[default]
    Anonymous,
    User(UserId),
}

impl Identity {
    #[must_use]
    pub const fn user_id(self) -> Option<UserId> {
        match self {
            Self::Anonymous => None,
            Self::User(id) => Some(id),
        }
    }

    #[must_use]
    pub const fn is_authenticated(self) -> bool {
        matches!(self, Self::User(_))
    }
}

impl From<Option<CurrentUser>> for Identity {
    fn from(user: Option<CurrentUser>) -> Self {
        user.map_or(Self::Anonymous, |u| Self::User(u.id))
    }
}

/// Session keys.
pub mod keys {
    /// Key for storing the current logged-in user.
    pub const CURRENT_USER: &str = "current_user";

    /// Key for the anonymous cart (`product id -> {quantity}`).
    pub const CART: &str = "cart";

    /// Key for the anonymous favorites (list of product ids).
    pub const FAVORITES: &str = "favorites";
}

/// Value stored per product under [`keys::CART`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionLine {
    pub quantity: Quantity,
}

/// Cart and favorites of an anonymous visitor, as stored in the session.
///
/// The value is loaded once per request, mutated in memory and written back
/// by the caller. Keys are product ids, so re-adding a product overwrites its
/// line rather than creating a second one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCart {
    pub cart: BTreeMap<ProductId, SessionLine>,
    pub favorites: BTreeSet<ProductId>,
}

impl SessionCart {
    /// Cart lines ordered by product id.
    #[must_use]
    pub fn lines(&self) -> Vec<CartLine> {
        self.cart
            .iter()
            .map(|(product_id, line)| CartLine {
                product_id: *product_id,
                quantity: line.quantity,
            })
            .collect()
    }

    pub fn put(&mut self, product_id: ProductId, quantity: Quantity) {
        self.cart.insert(product_id, SessionLine { quantity });
    }

    /// Overwrite the quantity of an existing line. Returns `false` if the
    /// product is not in the cart.
    pub fn update(&mut self, product_id: ProductId, quantity: Quantity) -> bool {
        self.cart
            .get_mut(&product_id)
            .map(|line| line.quantity = quantity)
            .is_some()
    }

    pub fn remove(&mut self, product_id: ProductId) {
        self.cart.remove(&product_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn qty(n: i64) -> Quantity {
        Quantity::new(n).unwrap_or(Quantity::ONE)
    }

    #[test]
    fn test_put_overwrites_quantity() {
        let mut state = SessionCart::default();
        state.put(ProductId::new(7), qty(2));
        state.put(ProductId::new(7), qty(5));

        let lines = state.lines();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines.first().map(|l| l.quantity), Some(qty(5)));
    }

    #[test]
    fn test_update_missing_line() {
        let mut state = SessionCart::default();
        assert!(!state.update(ProductId::new(1), qty(3)));
        state.put(ProductId::new(1), qty(1));
        assert!(state.update(ProductId::new(1), qty(3)));
        assert_eq!(state.lines().first().map(|l| l.quantity), Some(qty(3)));
    }

    #[test]
    fn test_lines_sorted_by_product_id() {
        let mut state = SessionCart::default();
        state.put(ProductId::new(9), qty(1));
        state.put(ProductId::new(2), qty(1));
        let ids: Vec<_> = state.lines().iter().map(|l| l.product_id).collect();
        assert_eq!(ids, vec![ProductId::new(2), ProductId::new(9)]);
    }

    #[test]
    fn test_session_shape() {
        let mut state = SessionCart::default();
        state.put(ProductId::new(7), qty(2));
        let cart = serde_json::to_value(&state.cart).unwrap_or_default();
        assert_eq!(cart, serde_json::json!({"7": {"quantity": 2}}));
    }

    #[test]
    fn test_identity_from_current_user() {
        assert_eq!(Identity::from(None), Identity::Anonymous);
        let user = CurrentUser { id: UserId::new(4) };
        assert_eq!(Identity::from(Some(user)).user_id(), Some(UserId::new(4)));
    }
}

//! Cart line model shared by the session and database cart backends.

use serde::{Deserialize, Serialize};

use furnish_core::{ProductId, Quantity};

/// One product in a cart. A cart holds at most one line per product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub quantity: Quantity,
}

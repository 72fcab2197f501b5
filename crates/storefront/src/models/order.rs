//! Orders and delivery scheduling.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use furnish_core::{
    DeliveryId, DeliveryTypeId, OrderId, OrderProductId, OrderStatus, Phone, ProductId, Quantity,
    UserId, line_subtotal,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryType {
    pub id: DeliveryTypeId,
    pub name: String,
}

/// A delivery slot. Several orders may point at the same slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delivery {
    pub id: DeliveryId,
    pub address: String,
    pub type_delivery: DeliveryTypeId,
    pub datetime_from: DateTime<Utc>,
    pub datetime_to: DateTime<Utc>,
    pub elevator: bool,
}

/// Input for creating a delivery.
#[derive(Debug, Clone, Deserialize)]
pub struct NewDelivery {
    pub address: String,
    pub type_delivery: DeliveryTypeId,
    pub datetime_from: DateTime<Utc>,
    pub datetime_to: DateTime<Utc>,
    #[serde(default)]
    pub elevator: bool,
}

impl NewDelivery {
    /// Whether the window is non-empty (`from < to`).
    #[must_use]
    pub fn has_valid_window(&self) -> bool {
        self.datetime_from < self.datetime_to
    }
}

/// A line item with the price frozen at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub id: OrderProductId,
    pub product_id: ProductId,
    pub quantity: Quantity,
    pub price: Decimal,
}

impl OrderLine {
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        line_subtotal(self.price, self.quantity)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub delivery_id: DeliveryId,
    pub phone: Phone,
    pub comment: Option<String>,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub lines: Vec<OrderLine>,
}

impl Order {
    /// Sum of line subtotals.
    #[must_use]
    pub fn total_cost(&self) -> Decimal {
        self.lines.iter().map(OrderLine::subtotal).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrderLine {
    pub product_id: ProductId,
    pub quantity: Quantity,
    pub price: Decimal,
}

/// A validated order ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub user_id: UserId,
    pub delivery_id: DeliveryId,
    pub phone: Phone,
    pub comment: Option<String>,
    pub lines: Vec<NewOrderLine>,
}

//! Order administration commands.
//!
//! Orders are immutable after checkout except for payment and delivery
//! changes, which go through the same service the API uses.

use furnish_core::{DeliveryId, OrderId};
use furnish_storefront::db::PgStore;
use furnish_storefront::services::OrderService;

use super::{CliError, connect};

/// Record payment for order `id`.
///
/// # Errors
///
/// Returns an error if the order does not exist or is already paid.
pub async fn mark_paid(id: i32) -> Result<(), CliError> {
    let store = PgStore::new(connect().await?);
    let order = OrderService::new(&store)
        .mark_paid(OrderId::new(id))
        .await?;

    tracing::info!(
        order_id = %order.id,
        total_cost = %order.total_cost,
        "Order marked paid"
    );
    Ok(())
}

/// Point order `id` at delivery `delivery`.
///
/// # Errors
///
/// Returns an error if the order or the delivery does not exist.
pub async fn set_delivery(id: i32, delivery: i32) -> Result<(), CliError> {
    let store = PgStore::new(connect().await?);
    let order = OrderService::new(&store)
        .change_delivery(OrderId::new(id), DeliveryId::new(delivery))
        .await?;

    tracing::info!(
        order_id = %order.id,
        delivery_id = %order.delivery,
        "Order delivery changed"
    );
    Ok(())
}

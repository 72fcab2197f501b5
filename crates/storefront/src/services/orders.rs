//! Checkout, deliveries and order administration.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use furnish_core::{
    DeliveryId, OrderId, OrderStatus, Phone, ProductId, Quantity, UserId, round_money,
};

use super::OrderError;
use crate::db::{RepositoryError, Store};
use crate::models::{Delivery, DeliveryType, Identity, NewDelivery, NewOrder, NewOrderLine, Order};

/// Checkout request body.
#[derive(Debug, Clone, Deserialize)]
pub struct PlaceOrder {
    pub delivery: DeliveryId,
    pub phone: String,
    #[serde(default)]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderLineView {
    pub product: ProductId,
    pub quantity: Quantity,
    pub price: Decimal,
}

/// An order as returned to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderView {
    pub id: OrderId,
    pub user: UserId,
    pub delivery: DeliveryId,
    pub phone: Phone,
    pub comment: Option<String>,
    pub status: OrderStatus,
    pub paid: bool,
    pub total_cost: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub products: Vec<OrderLineView>,
}

impl From<Order> for OrderView {
    fn from(order: Order) -> Self {
        let total_cost = order.total_cost();
        Self {
            id: order.id,
            user: order.user_id,
            delivery: order.delivery_id,
            phone: order.phone,
            comment: order.comment,
            status: order.status,
            paid: order.status.is_paid(),
            total_cost,
            created_at: order.created_at,
            updated_at: order.updated_at,
            products: order
                .lines
                .into_iter()
                .map(|l| OrderLineView {
                    product: l.product_id,
                    quantity: l.quantity,
                    price: l.price,
                })
                .collect(),
        }
    }
}

/// Order operations.
pub struct OrderService<'a> {
    store: &'a dyn Store,
}

impl<'a> OrderService<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    /// Turn the caller's cart into an order.
    ///
    /// Line prices are the effective prices at `now`, rounded to cents, and
    /// never change afterwards. The cart is emptied in the same transaction.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Unauthorized` for anonymous callers,
    /// `OrderError::InvalidPhone` for a malformed phone,
    /// `OrderError::DeliveryNotFound` for an unknown delivery and
    /// `OrderError::EmptyCart` when there is nothing to order.
    #[instrument(skip(self, request), fields(delivery = %request.delivery))]
    pub async fn place_order(
        &self,
        identity: Identity,
        request: PlaceOrder,
        now: DateTime<Utc>,
    ) -> Result<OrderView, OrderError> {
        let user = identity.user_id().ok_or(OrderError::Unauthorized)?;
        let phone = Phone::parse(&request.phone)?;

        if self.store.get_delivery(request.delivery).await?.is_none() {
            return Err(OrderError::DeliveryNotFound(request.delivery));
        }

        let cart = self.store.cart_lines(user).await?;
        let ids: Vec<ProductId> = cart.iter().map(|l| l.product_id).collect();
        let products = self.store.products_by_ids(&ids).await?;

        let lines: Vec<NewOrderLine> = cart
            .iter()
            .filter_map(|line| {
                products
                    .iter()
                    .find(|p| p.id == line.product_id)
                    .map(|p| NewOrderLine {
                        product_id: p.id,
                        quantity: line.quantity,
                        price: round_money(p.effective_price(now)),
                    })
            })
            .collect();

        if lines.is_empty() {
            return Err(OrderError::EmptyCart);
        }

        let comment = request
            .comment
            .map(|c| c.trim().to_owned())
            .filter(|c| !c.is_empty());

        let order = self
            .store
            .create_order(&NewOrder {
                user_id: user,
                delivery_id: request.delivery,
                phone,
                comment,
                lines,
            })
            .await?;

        tracing::info!(
            order_id = %order.id,
            user_id = %user,
            total_cost = %order.total_cost(),
            "order placed"
        );
        Ok(order.into())
    }

    /// The caller's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Unauthorized` for anonymous callers.
    #[instrument(skip(self))]
    pub async fn my_orders(&self, identity: Identity) -> Result<Vec<OrderView>, OrderError> {
        let user = identity.user_id().ok_or(OrderError::Unauthorized)?;
        let orders = self.store.orders_for_user(user).await?;
        Ok(orders.into_iter().map(OrderView::from).collect())
    }

    /// One of the caller's orders.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotOwner` when the order belongs to someone else.
    #[instrument(skip(self))]
    pub async fn get_order(
        &self,
        identity: Identity,
        id: OrderId,
    ) -> Result<OrderView, OrderError> {
        let user = identity.user_id().ok_or(OrderError::Unauthorized)?;
        let order = self.order(id).await?;
        if order.user_id != user {
            return Err(OrderError::NotOwner);
        }
        Ok(order.into())
    }

    /// Record payment. Only an unpaid order can be paid.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::OrderNotFound` or `OrderError::AlreadyPaid`.
    #[instrument(skip(self))]
    pub async fn mark_paid(&self, id: OrderId) -> Result<OrderView, OrderError> {
        let order = self.order(id).await?;
        order
            .status
            .pay()
            .map_err(|_| OrderError::AlreadyPaid(id))?;

        if !self.store.mark_paid(id).await? {
            return Err(OrderError::AlreadyPaid(id));
        }

        tracing::info!(order_id = %id, "order marked paid");
        Ok(self.order(id).await?.into())
    }

    /// Point an order at another delivery slot.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::OrderNotFound` or `OrderError::DeliveryNotFound`.
    #[instrument(skip(self))]
    pub async fn change_delivery(
        &self,
        id: OrderId,
        delivery: DeliveryId,
    ) -> Result<OrderView, OrderError> {
        if self.store.get_delivery(delivery).await?.is_none() {
            return Err(OrderError::DeliveryNotFound(delivery));
        }
        match self.store.set_delivery(id, delivery).await {
            Ok(()) => {}
            Err(RepositoryError::NotFound) => return Err(OrderError::OrderNotFound(id)),
            Err(e) => return Err(e.into()),
        }
        Ok(self.order(id).await?.into())
    }

    /// # Errors
    ///
    /// Returns `OrderError::Repository` if the store fails.
    pub async fn delivery_types(&self) -> Result<Vec<DeliveryType>, OrderError> {
        Ok(self.store.list_delivery_types().await?)
    }

    /// Create a delivery slot.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::InvalidDeliveryWindow` unless `from < to` and
    /// `OrderError::DeliveryTypeNotFound` for an unknown type.
    #[instrument(skip(self, delivery), fields(type_delivery = %delivery.type_delivery))]
    pub async fn create_delivery(&self, delivery: &NewDelivery) -> Result<Delivery, OrderError> {
        if !delivery.has_valid_window() {
            return Err(OrderError::InvalidDeliveryWindow);
        }
        if !self.store.delivery_type_exists(delivery.type_delivery).await? {
            return Err(OrderError::DeliveryTypeNotFound(delivery.type_delivery));
        }
        Ok(self.store.create_delivery(delivery).await?)
    }

    /// # Errors
    ///
    /// Returns `OrderError::DeliveryNotFound` for an unknown id.
    pub async fn get_delivery(&self, id: DeliveryId) -> Result<Delivery, OrderError> {
        self.store
            .get_delivery(id)
            .await?
            .ok_or(OrderError::DeliveryNotFound(id))
    }

    async fn order(&self, id: OrderId) -> Result<Order, OrderError> {
        self.store
            .get_order(id)
            .await?
            .ok_or(OrderError::OrderNotFound(id))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Duration;
    use furnish_core::DeliveryTypeId;

    use super::*;
    use crate::db::{CartRepository, CatalogSeed, MemoryStore, OrderRepository};

    const SEED: &str = r#"
users: [buyer@example.com, other@example.com]
categories:
  - { name: Tables, slug: tables }
delivery_types: [Courier, Pickup]
products:
  - { article: A, name: Desk, category: tables, price: "100", stock: 5 }
  - { article: B, name: Stool, category: tables, price: "50", stock: 5 }
  - { article: C, name: Bench, category: tables, price: "99.99", stock: 5 }
discounts:
  - discount: "12.5"
    created_at: "2020-01-01T00:00:00Z"
    end_at: "2099-01-01T00:00:00Z"
    products: [C]
"#;

    struct Fixture {
        store: MemoryStore,
        buyer: UserId,
        delivery: DeliveryId,
    }

    async fn fixture() -> Fixture {
        let store = MemoryStore::from_seed(&CatalogSeed::from_yaml(SEED).unwrap()).unwrap();
        let buyer = store.user_id("buyer@example.com").await.unwrap();
        let now = Utc::now();
        let delivery = store
            .create_delivery(&NewDelivery {
                address: "Main st. 1".to_owned(),
                type_delivery: DeliveryTypeId::new(1),
                datetime_from: now,
                datetime_to: now + Duration::hours(2),
                elevator: true,
            })
            .await
            .unwrap()
            .id;
        Fixture {
            store,
            buyer,
            delivery,
        }
    }

    fn request(delivery: DeliveryId) -> PlaceOrder {
        PlaceOrder {
            delivery,
            phone: "+7 (912) 3456789".to_owned(),
            comment: Some("  ring twice ".to_owned()),
        }
    }

    async fn put(store: &MemoryStore, user: UserId, product: i32, qty: i64) {
        store
            .put_cart_line(user, ProductId::new(product), Quantity::new(qty).unwrap())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_place_order_snapshots_prices_and_clears_cart() {
        let f = fixture().await;
        put(&f.store, f.buyer, 1, 2).await;
        put(&f.store, f.buyer, 2, 1).await;

        let service = OrderService::new(&f.store);
        let order = service
            .place_order(Identity::User(f.buyer), request(f.delivery), Utc::now())
            .await
            .unwrap();

        assert_eq!(order.total_cost, Decimal::from(250));
        assert_eq!(order.phone.as_str(), "9123456789");
        assert_eq!(order.comment.as_deref(), Some("ring twice"));
        assert!(!order.paid);
        assert!(f.store.cart_lines(f.buyer).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_line_price_is_discounted_and_rounded() {
        let f = fixture().await;
        put(&f.store, f.buyer, 3, 1).await;

        let order = OrderService::new(&f.store)
            .place_order(Identity::User(f.buyer), request(f.delivery), Utc::now())
            .await
            .unwrap();
        assert_eq!(order.products[0].price, Decimal::new(8749, 2));
    }

    #[tokio::test]
    async fn test_line_price_is_taken_at_checkout_and_frozen() {
        let f = fixture().await;
        let service = OrderService::new(&f.store);
        let during_sale: DateTime<Utc> = "2050-06-01T00:00:00Z".parse().unwrap();
        let after_sale: DateTime<Utc> = "2100-06-01T00:00:00Z".parse().unwrap();

        put(&f.store, f.buyer, 3, 2).await;
        let on_sale = service
            .place_order(Identity::User(f.buyer), request(f.delivery), during_sale)
            .await
            .unwrap();
        assert_eq!(on_sale.products[0].price, Decimal::new(8749, 2));
        assert_eq!(on_sale.total_cost, Decimal::new(17498, 2));

        // Same product once the discount has ended.
        put(&f.store, f.buyer, 3, 2).await;
        let full_price = service
            .place_order(Identity::User(f.buyer), request(f.delivery), after_sale)
            .await
            .unwrap();
        assert_eq!(full_price.products[0].price, Decimal::new(9999, 2));

        let stored = service
            .get_order(Identity::User(f.buyer), on_sale.id)
            .await
            .unwrap();
        assert_eq!(stored.products[0].price, Decimal::new(8749, 2));
        assert_eq!(stored.total_cost, Decimal::new(17498, 2));
    }

    #[tokio::test]
    async fn test_place_order_rejections() {
        let f = fixture().await;
        let service = OrderService::new(&f.store);
        let now = Utc::now();

        let err = service
            .place_order(Identity::Anonymous, request(f.delivery), now)
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::Unauthorized));

        let err = service
            .place_order(Identity::User(f.buyer), request(f.delivery), now)
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::EmptyCart));

        put(&f.store, f.buyer, 1, 1).await;
        let mut bad_phone = request(f.delivery);
        bad_phone.phone = "12-34".to_owned();
        let err = service
            .place_order(Identity::User(f.buyer), bad_phone, now)
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::InvalidPhone(_)));

        let err = service
            .place_order(Identity::User(f.buyer), request(DeliveryId::new(99)), now)
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::DeliveryNotFound(_)));
    }

    #[tokio::test]
    async fn test_mark_paid_is_one_way() {
        let f = fixture().await;
        put(&f.store, f.buyer, 1, 1).await;
        let service = OrderService::new(&f.store);
        let order = service
            .place_order(Identity::User(f.buyer), request(f.delivery), Utc::now())
            .await
            .unwrap();

        let paid = service.mark_paid(order.id).await.unwrap();
        assert!(paid.paid);
        assert_eq!(paid.status, OrderStatus::Paid);

        let err = service.mark_paid(order.id).await.unwrap_err();
        assert!(matches!(err, OrderError::AlreadyPaid(_)));

        let err = service.mark_paid(OrderId::new(404)).await.unwrap_err();
        assert!(matches!(err, OrderError::OrderNotFound(_)));
    }

    #[tokio::test]
    async fn test_orders_are_private() {
        let f = fixture().await;
        put(&f.store, f.buyer, 1, 1).await;
        let service = OrderService::new(&f.store);
        let order = service
            .place_order(Identity::User(f.buyer), request(f.delivery), Utc::now())
            .await
            .unwrap();

        let other = f.store.user_id("other@example.com").await.unwrap();
        let err = service
            .get_order(Identity::User(other), order.id)
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::NotOwner));
        assert!(service.my_orders(Identity::User(other)).await.unwrap().is_empty());
        assert_eq!(service.my_orders(Identity::User(f.buyer)).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_change_delivery_requires_existing_slot() {
        let f = fixture().await;
        put(&f.store, f.buyer, 1, 1).await;
        let service = OrderService::new(&f.store);
        let order = service
            .place_order(Identity::User(f.buyer), request(f.delivery), Utc::now())
            .await
            .unwrap();

        let err = service
            .change_delivery(order.id, DeliveryId::new(99))
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::DeliveryNotFound(_)));

        let err = service
            .change_delivery(OrderId::new(404), f.delivery)
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::OrderNotFound(_)));
    }

    #[tokio::test]
    async fn test_create_delivery_validation() {
        let f = fixture().await;
        let service = OrderService::new(&f.store);
        let now = Utc::now();
        let mut delivery = NewDelivery {
            address: "Main st. 2".to_owned(),
            type_delivery: DeliveryTypeId::new(1),
            datetime_from: now,
            datetime_to: now - Duration::hours(1),
            elevator: false,
        };

        let err = service.create_delivery(&delivery).await.unwrap_err();
        assert!(matches!(err, OrderError::InvalidDeliveryWindow));

        delivery.datetime_to = now + Duration::hours(1);
        delivery.type_delivery = DeliveryTypeId::new(42);
        let err = service.create_delivery(&delivery).await.unwrap_err();
        assert!(matches!(err, OrderError::DeliveryTypeNotFound(_)));

        delivery.type_delivery = DeliveryTypeId::new(2);
        let created = service.create_delivery(&delivery).await.unwrap();
        assert_eq!(service.get_delivery(created.id).await.unwrap(), created);
    }
}

//! Deliveries and orders for [`PgStore`].

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use furnish_core::{
    DeliveryId, DeliveryTypeId, OrderId, OrderProductId, OrderStatus, Phone, ProductId, UserId,
};

use super::{OrderRepository, PgStore, RepositoryError, stored_quantity};
use crate::models::{Delivery, DeliveryType, NewDelivery, NewOrder, Order, OrderLine};

const ORDER_COLUMNS: &str =
    "id, user_id, delivery_id, phone, comment, paid, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct DeliveryRow {
    id: DeliveryId,
    address: String,
    type_delivery_id: DeliveryTypeId,
    datetime_from: DateTime<Utc>,
    datetime_to: DateTime<Utc>,
    elevator: bool,
}

impl From<DeliveryRow> for Delivery {
    fn from(row: DeliveryRow) -> Self {
        Self {
            id: row.id,
            address: row.address,
            type_delivery: row.type_delivery_id,
            datetime_from: row.datetime_from,
            datetime_to: row.datetime_to,
            elevator: row.elevator,
        }
    }
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    user_id: UserId,
    delivery_id: DeliveryId,
    phone: String,
    comment: Option<String>,
    paid: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct OrderLineRow {
    id: OrderProductId,
    order_id: OrderId,
    product_id: ProductId,
    quantity: i32,
    price: Decimal,
}

impl OrderLineRow {
    fn into_line(self) -> Result<OrderLine, RepositoryError> {
        Ok(OrderLine {
            id: self.id,
            product_id: self.product_id,
            quantity: stored_quantity(self.quantity)?,
            price: self.price,
        })
    }
}

impl OrderRow {
    fn into_order(self, lines: Vec<OrderLine>) -> Result<Order, RepositoryError> {
        let phone = Phone::from_normalized(&self.phone).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid phone in database: {e}"))
        })?;

        Ok(Order {
            id: self.id,
            user_id: self.user_id,
            delivery_id: self.delivery_id,
            phone,
            comment: self.comment,
            status: OrderStatus::from_paid(self.paid),
            created_at: self.created_at,
            updated_at: self.updated_at,
            lines,
        })
    }
}

impl PgStore {
    /// Attach line items to order headers, preserving header order.
    async fn with_lines(&self, rows: Vec<OrderRow>) -> Result<Vec<Order>, RepositoryError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i32> = rows.iter().map(|r| r.id.as_i32()).collect();
        let line_rows: Vec<OrderLineRow> = sqlx::query_as(
            r"
            SELECT id, order_id, product_id, quantity, price
            FROM storefront.order_product
            WHERE order_id = ANY($1)
            ORDER BY id
            ",
        )
        .bind(ids.as_slice())
        .fetch_all(&self.pool)
        .await?;

        let mut by_order: HashMap<OrderId, Vec<OrderLine>> = HashMap::new();
        for row in line_rows {
            let order_id = row.order_id;
            by_order.entry(order_id).or_default().push(row.into_line()?);
        }

        rows.into_iter()
            .map(|row| {
                let lines = by_order.remove(&row.id).unwrap_or_default();
                row.into_order(lines)
            })
            .collect()
    }
}

#[async_trait]
impl OrderRepository for PgStore {
    async fn list_delivery_types(&self) -> Result<Vec<DeliveryType>, RepositoryError> {
        let rows = sqlx::query_as::<_, (DeliveryTypeId, String)>(
            "SELECT id, name FROM storefront.delivery_type ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, name)| DeliveryType { id, name })
            .collect())
    }

    async fn delivery_type_exists(&self, id: DeliveryTypeId) -> Result<bool, RepositoryError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM storefront.delivery_type WHERE id = $1)",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn get_delivery(&self, id: DeliveryId) -> Result<Option<Delivery>, RepositoryError> {
        let row: Option<DeliveryRow> = sqlx::query_as(
            r"
            SELECT id, address, type_delivery_id, datetime_from, datetime_to, elevator
            FROM storefront.delivery
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Delivery::from))
    }

    async fn create_delivery(&self, delivery: &NewDelivery) -> Result<Delivery, RepositoryError> {
        let row: DeliveryRow = sqlx::query_as(
            r"
            INSERT INTO storefront.delivery
                (address, type_delivery_id, datetime_from, datetime_to, elevator)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, address, type_delivery_id, datetime_from, datetime_to, elevator
            ",
        )
        .bind(&delivery.address)
        .bind(delivery.type_delivery)
        .bind(delivery.datetime_from)
        .bind(delivery.datetime_to)
        .bind(delivery.elevator)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn create_order(&self, order: &NewOrder) -> Result<Order, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let header: OrderRow = sqlx::query_as(&format!(
            r"
            INSERT INTO storefront.order (user_id, delivery_id, phone, comment)
            VALUES ($1, $2, $3, $4)
            RETURNING {ORDER_COLUMNS}
            "
        ))
        .bind(order.user_id)
        .bind(order.delivery_id)
        .bind(order.phone.as_str())
        .bind(order.comment.as_deref())
        .fetch_one(&mut *tx)
        .await?;

        let mut lines = Vec::with_capacity(order.lines.len());
        for line in &order.lines {
            let id = sqlx::query_scalar::<_, OrderProductId>(
                r"
                INSERT INTO storefront.order_product (order_id, product_id, quantity, price)
                VALUES ($1, $2, $3, $4)
                RETURNING id
                ",
            )
            .bind(header.id)
            .bind(line.product_id)
            .bind(line.quantity.as_i32())
            .bind(line.price)
            .fetch_one(&mut *tx)
            .await?;

            lines.push(OrderLine {
                id,
                product_id: line.product_id,
                quantity: line.quantity,
                price: line.price,
            });
        }

        sqlx::query("DELETE FROM storefront.cart WHERE user_id = $1")
            .bind(order.user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        header.into_order(lines)
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let row: Option<OrderRow> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM storefront.order WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(self.with_lines(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn orders_for_user(&self, user: UserId) -> Result<Vec<Order>, RepositoryError> {
        let rows: Vec<OrderRow> = sqlx::query_as(&format!(
            r"
            SELECT {ORDER_COLUMNS}
            FROM storefront.order
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            "
        ))
        .bind(user)
        .fetch_all(&self.pool)
        .await?;

        self.with_lines(rows).await
    }

    async fn mark_paid(&self, id: OrderId) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE storefront.order
            SET paid = TRUE, updated_at = now()
            WHERE id = $1 AND NOT paid
            ",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn set_delivery(&self, id: OrderId, delivery: DeliveryId) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE storefront.order
            SET delivery_id = $2, updated_at = now()
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(delivery)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

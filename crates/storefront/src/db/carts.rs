//! Persistent carts and favorites for [`PgStore`].
//!
//! Uniqueness of (cart, product) and (user, product) is enforced by the
//! schema; writes are upserts so concurrent requests never create duplicates.

use async_trait::async_trait;

use furnish_core::{ProductId, Quantity, UserId};

use super::{CartRepository, FavoriteRepository, PgStore, RepositoryError, stored_quantity};
use crate::models::CartLine;

#[async_trait]
impl CartRepository for PgStore {
    async fn cart_lines(&self, user: UserId) -> Result<Vec<CartLine>, RepositoryError> {
        let rows = sqlx::query_as::<_, (ProductId, i32)>(
            r"
            SELECT ci.product_id, ci.quantity
            FROM storefront.cart_item ci
            JOIN storefront.cart c ON c.id = ci.cart_id
            WHERE c.user_id = $1
            ORDER BY ci.product_id
            ",
        )
        .bind(user)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(product_id, quantity)| {
                Ok(CartLine {
                    product_id,
                    quantity: stored_quantity(quantity)?,
                })
            })
            .collect()
    }

    async fn put_cart_line(
        &self,
        user: UserId,
        product: ProductId,
        quantity: Quantity,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            WITH cart AS (
                INSERT INTO storefront.cart (user_id)
                VALUES ($1)
                ON CONFLICT (user_id) DO UPDATE SET user_id = EXCLUDED.user_id
                RETURNING id
            )
            INSERT INTO storefront.cart_item (cart_id, product_id, quantity)
            SELECT id, $2, $3 FROM cart
            ON CONFLICT (cart_id, product_id) DO UPDATE SET quantity = EXCLUDED.quantity
            ",
        )
        .bind(user)
        .bind(product)
        .bind(quantity.as_i32())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update_cart_line(
        &self,
        user: UserId,
        product: ProductId,
        quantity: Quantity,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE storefront.cart_item ci
            SET quantity = $3
            FROM storefront.cart c
            WHERE ci.cart_id = c.id AND c.user_id = $1 AND ci.product_id = $2
            ",
        )
        .bind(user)
        .bind(product)
        .bind(quantity.as_i32())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn remove_cart_line(
        &self,
        user: UserId,
        product: ProductId,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            DELETE FROM storefront.cart_item ci
            USING storefront.cart c
            WHERE ci.cart_id = c.id AND c.user_id = $1 AND ci.product_id = $2
            ",
        )
        .bind(user)
        .bind(product)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn clear_cart(&self, user: UserId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM storefront.cart WHERE user_id = $1")
            .bind(user)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

#[async_trait]
impl FavoriteRepository for PgStore {
    async fn favorite_ids(&self, user: UserId) -> Result<Vec<ProductId>, RepositoryError> {
        let ids = sqlx::query_scalar::<_, ProductId>(
            "SELECT product_id FROM storefront.favorite WHERE user_id = $1 ORDER BY product_id",
        )
        .bind(user)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    async fn add_favorite(&self, user: UserId, product: ProductId) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO storefront.favorite (user_id, product_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id, product_id) DO NOTHING
            ",
        )
        .bind(user)
        .bind(product)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn remove_favorite(
        &self,
        user: UserId,
        product: ProductId,
    ) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM storefront.favorite WHERE user_id = $1 AND product_id = $2")
            .bind(user)
            .bind(product)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

//! Product reviews for [`PgStore`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use furnish_core::{ProductId, Rating, ReviewId, UserId};

use super::{PgStore, RepositoryError, ReviewRepository, conflict_on_unique};
use crate::models::{NewReview, Review, ReviewPatch};

const REVIEW_COLUMNS: &str = "id, user_id, product_id, rating, text, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct ReviewRow {
    id: ReviewId,
    user_id: UserId,
    product_id: ProductId,
    rating: i16,
    text: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ReviewRow> for Review {
    type Error = RepositoryError;

    fn try_from(row: ReviewRow) -> Result<Self, Self::Error> {
        let rating = Rating::new(i64::from(row.rating)).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid rating in database: {e}"))
        })?;

        Ok(Self {
            id: row.id,
            user_id: row.user_id,
            product_id: row.product_id,
            rating,
            text: row.text,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[async_trait]
impl ReviewRepository for PgStore {
    async fn list_reviews(
        &self,
        product: Option<ProductId>,
    ) -> Result<Vec<Review>, RepositoryError> {
        let rows: Vec<ReviewRow> = sqlx::query_as(&format!(
            r"
            SELECT {REVIEW_COLUMNS}
            FROM storefront.review
            WHERE $1::INTEGER IS NULL OR product_id = $1
            ORDER BY id
            "
        ))
        .bind(product)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Review::try_from).collect()
    }

    async fn get_review(&self, id: ReviewId) -> Result<Option<Review>, RepositoryError> {
        let row: Option<ReviewRow> = sqlx::query_as(&format!(
            "SELECT {REVIEW_COLUMNS} FROM storefront.review WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Review::try_from).transpose()
    }

    async fn create_review(&self, review: &NewReview) -> Result<Review, RepositoryError> {
        let row: ReviewRow = sqlx::query_as(&format!(
            r"
            INSERT INTO storefront.review (user_id, product_id, rating, text)
            VALUES ($1, $2, $3, $4)
            RETURNING {REVIEW_COLUMNS}
            "
        ))
        .bind(review.user_id)
        .bind(review.product_id)
        .bind(review.rating.as_i16())
        .bind(&review.text)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "product already reviewed by this user"))?;

        row.try_into()
    }

    async fn update_review(
        &self,
        id: ReviewId,
        patch: &ReviewPatch,
    ) -> Result<Review, RepositoryError> {
        let row: Option<ReviewRow> = sqlx::query_as(&format!(
            r"
            UPDATE storefront.review
            SET rating = COALESCE($2, rating),
                text = COALESCE($3, text),
                updated_at = now()
            WHERE id = $1
            RETURNING {REVIEW_COLUMNS}
            "
        ))
        .bind(id)
        .bind(patch.rating.map(Rating::as_i16))
        .bind(patch.text.as_deref())
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or(RepositoryError::NotFound)?.try_into()
    }

    async fn delete_review(&self, id: ReviewId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM storefront.review WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

//! Product reviews.

use serde::Deserialize;
use tracing::instrument;

use furnish_core::{ProductId, Rating, ReviewId, UserId};

use super::ReviewError;
use crate::db::{RepositoryError, Store};
use crate::models::{Identity, NewReview, Review, ReviewPatch};

/// Body of `POST /api/reviews`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateReview {
    pub product: ProductId,
    pub rating: i64,
    #[serde(default)]
    pub text: String,
}

/// Body of `PATCH /api/reviews/{id}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateReview {
    #[serde(default)]
    pub rating: Option<i64>,
    #[serde(default)]
    pub text: Option<String>,
}

pub struct ReviewService<'a> {
    store: &'a dyn Store,
}

impl<'a> ReviewService<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    /// All reviews, or those of one product.
    ///
    /// # Errors
    ///
    /// Returns `ReviewError::Repository` if the store fails.
    pub async fn list(&self, product: Option<ProductId>) -> Result<Vec<Review>, ReviewError> {
        Ok(self.store.list_reviews(product).await?)
    }

    /// # Errors
    ///
    /// Returns `ReviewError::ReviewNotFound` for an unknown id.
    pub async fn get(&self, id: ReviewId) -> Result<Review, ReviewError> {
        self.store
            .get_review(id)
            .await?
            .ok_or(ReviewError::ReviewNotFound(id))
    }

    /// Review a product. One review per user and product.
    ///
    /// # Errors
    ///
    /// Returns `ReviewError::Unauthorized` for anonymous callers,
    /// `ReviewError::InvalidRating` outside `1..=5`,
    /// `ReviewError::ProductNotFound` and `ReviewError::AlreadyReviewed`.
    #[instrument(skip(self, request), fields(product = %request.product))]
    pub async fn create(
        &self,
        identity: Identity,
        request: CreateReview,
    ) -> Result<Review, ReviewError> {
        let user = identity.user_id().ok_or(ReviewError::Unauthorized)?;
        let rating = Rating::new(request.rating)?;

        if self.store.get_product(request.product).await?.is_none() {
            return Err(ReviewError::ProductNotFound(request.product));
        }

        let review = NewReview {
            user_id: user,
            product_id: request.product,
            rating,
            text: request.text.trim().to_owned(),
        };
        match self.store.create_review(&review).await {
            Ok(review) => {
                tracing::info!(review_id = %review.id, user_id = %user, "review created");
                Ok(review)
            }
            Err(RepositoryError::Conflict(_)) => Err(ReviewError::AlreadyReviewed),
            Err(e) => Err(e.into()),
        }
    }

    /// Change the rating or text of the caller's own review.
    ///
    /// # Errors
    ///
    /// Returns `ReviewError::NotOwner` when the review belongs to someone else.
    #[instrument(skip(self, request))]
    pub async fn update(
        &self,
        identity: Identity,
        id: ReviewId,
        request: UpdateReview,
    ) -> Result<Review, ReviewError> {
        let user = identity.user_id().ok_or(ReviewError::Unauthorized)?;
        let patch = ReviewPatch {
            rating: request.rating.map(Rating::new).transpose()?,
            text: request.text.map(|t| t.trim().to_owned()),
        };
        self.owned(user, id).await?;
        Ok(self.store.update_review(id, &patch).await?)
    }

    /// Delete the caller's own review.
    ///
    /// # Errors
    ///
    /// Returns `ReviewError::NotOwner` when the review belongs to someone else.
    #[instrument(skip(self))]
    pub async fn delete(&self, identity: Identity, id: ReviewId) -> Result<(), ReviewError> {
        let user = identity.user_id().ok_or(ReviewError::Unauthorized)?;
        self.owned(user, id).await?;
        match self.store.delete_review(id).await {
            Ok(()) => Ok(()),
            Err(RepositoryError::NotFound) => Err(ReviewError::ReviewNotFound(id)),
            Err(e) => Err(e.into()),
        }
    }

    async fn owned(&self, user: UserId, id: ReviewId) -> Result<Review, ReviewError> {
        let review = self.get(id).await?;
        if review.user_id != user {
            return Err(ReviewError::NotOwner);
        }
        Ok(review)
    }
}

//! Service error types.

use thiserror::Error;

use furnish_core::{
    DeliveryId, DeliveryTypeId, OrderId, PhoneError, ProductId, QuantityError, RatingError,
    ReviewId,
};

use crate::db::RepositoryError;
use crate::models::FilterError;

/// Errors from cart and favorites operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// Quantity is not a positive integer.
    #[error(transparent)]
    InvalidQuantity(#[from] QuantityError),

    /// Requested more than the storehouse holds.
    #[error("only {available} left in stock")]
    InsufficientStock { available: i32 },

    /// Product does not exist in the catalog.
    #[error("product {0} not found")]
    ProductNotFound(ProductId),

    /// Product exists but is not in the cart.
    #[error("product {0} is not in the cart")]
    NotInCart(ProductId),

    /// Repository error.
    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Errors from catalog reads.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// A filter parameter could not be parsed.
    #[error(transparent)]
    InvalidFilter(#[from] FilterError),

    #[error("product {0} not found")]
    ProductNotFound(ProductId),

    #[error("category '{0}' not found")]
    CategoryNotFound(String),

    #[error("collection '{0}' not found")]
    CollectionNotFound(String),

    /// Repository error.
    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Errors from checkout and order administration.
#[derive(Debug, Error)]
pub enum OrderError {
    /// Only logged-in users can place or view orders.
    #[error("authentication required")]
    Unauthorized,

    #[error("cart is empty")]
    EmptyCart,

    #[error(transparent)]
    InvalidPhone(#[from] PhoneError),

    /// Delivery window is empty or inverted.
    #[error("delivery window must start before it ends")]
    InvalidDeliveryWindow,

    #[error("delivery type {0} not found")]
    DeliveryTypeNotFound(DeliveryTypeId),

    #[error("delivery {0} not found")]
    DeliveryNotFound(DeliveryId),

    #[error("order {0} not found")]
    OrderNotFound(OrderId),

    /// The order belongs to another user.
    #[error("order belongs to another user")]
    NotOwner,

    #[error("order {0} is already paid")]
    AlreadyPaid(OrderId),

    /// Repository error.
    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Errors from review operations.
#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("authentication required")]
    Unauthorized,

    #[error(transparent)]
    InvalidRating(#[from] RatingError),

    #[error("product {0} not found")]
    ProductNotFound(ProductId),

    #[error("review {0} not found")]
    ReviewNotFound(ReviewId),

    /// One review per user and product.
    #[error("you have already reviewed this product")]
    AlreadyReviewed,

    /// Only the author may change a review.
    #[error("review belongs to another user")]
    NotOwner,

    /// Repository error.
    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),
}

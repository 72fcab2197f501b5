//! Persistence for the storefront.
//!
//! # Database: `furnish`
//!
//! ## Tables (schema `storefront`)
//!
//! - `category`, `collection`, `color`, `material`, `product_type` - reference data
//! - `product`, `storehouse` - products and stock
//! - `discount`, `discount_product` - percentage discounts and the products they apply to
//! - `user` - accounts (created by the login flow, outside this service)
//! - `cart`, `cart_item`, `favorite` - persistent carts and favorites
//! - `delivery_type`, `delivery`, `order`, `order_product` - checkout
//! - `review` - product reviews
//! - `tower_sessions.session` - session storage
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p furnish-cli -- migrate
//! ```
//!
//! # Stores
//!
//! Repositories are traits so handlers can run against [`PgStore`] in
//! production and [`MemoryStore`] in tests and local demos. Both enforce the
//! same uniqueness rules: one cart line per (cart, product), one favorite per
//! (user, product), one review per (user, product).

mod carts;
mod catalog;
mod memory;
mod orders;
mod reviews;
pub mod seed;

use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use furnish_core::{
    DeliveryId, DeliveryTypeId, Discount, OrderId, ProductId, Quantity, ReviewId, UserId,
};

use crate::models::{
    CartLine, CatalogFilter, Category, Collection, Color, Delivery, DeliveryType, Material,
    NewDelivery, NewOrder, NewReview, Order, Product, Review, ReviewPatch,
};

pub use memory::MemoryStore;
pub use seed::CatalogSeed;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database query failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is invalid or corrupted.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Record not found.
    #[error("record not found")]
    NotFound,

    /// Unique constraint violation.
    #[error("conflict: {0}")]
    Conflict(String),
}

/// Map a unique violation to [`RepositoryError::Conflict`].
fn conflict_on_unique(e: sqlx::Error, what: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(what.to_owned());
    }
    RepositoryError::Database(e)
}

/// Convert a stored quantity, rejecting values the schema should never allow.
fn stored_quantity(value: i32) -> Result<Quantity, RepositoryError> {
    Quantity::new(i64::from(value))
        .map_err(|e| RepositoryError::DataCorruption(format!("invalid quantity in database: {e}")))
}

/// Products, reference data and catalog statistics.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// Check that the backing store is reachable.
    async fn ping(&self) -> Result<(), RepositoryError>;

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError>;

    /// Products with the given ids, ordered by id. Unknown ids are skipped.
    async fn products_by_ids(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError>;

    /// Products ordered by id. The result may be a superset of what `filter`
    /// matches; callers apply [`CatalogFilter::matches`].
    async fn list_products(&self, filter: &CatalogFilter) -> Result<Vec<Product>, RepositoryError>;

    /// Product ids ranked by total ordered quantity, best sellers first.
    async fn best_sellers(&self, limit: i64) -> Result<Vec<ProductId>, RepositoryError>;

    async fn list_categories(&self) -> Result<Vec<Category>, RepositoryError>;

    async fn get_category(&self, slug: &str) -> Result<Option<Category>, RepositoryError>;

    async fn list_collections(&self) -> Result<Vec<Collection>, RepositoryError>;

    async fn get_collection(&self, slug: &str) -> Result<Option<Collection>, RepositoryError>;

    async fn list_colors(&self) -> Result<Vec<Color>, RepositoryError>;

    async fn list_materials(&self) -> Result<Vec<Material>, RepositoryError>;

    async fn list_discounts(&self) -> Result<Vec<Discount>, RepositoryError>;

    /// Distinct non-empty brands, sorted.
    async fn list_brands(&self) -> Result<Vec<String>, RepositoryError>;
}

/// Persistent carts of authenticated users.
#[async_trait]
pub trait CartRepository: Send + Sync {
    /// Lines of the user's cart ordered by product id; empty if there is no cart.
    async fn cart_lines(&self, user: UserId) -> Result<Vec<CartLine>, RepositoryError>;

    /// Create the cart and line as needed, overwriting an existing quantity.
    async fn put_cart_line(
        &self,
        user: UserId,
        product: ProductId,
        quantity: Quantity,
    ) -> Result<(), RepositoryError>;

    /// Overwrite the quantity of an existing line. Returns `false` when the
    /// product is not in the cart.
    async fn update_cart_line(
        &self,
        user: UserId,
        product: ProductId,
        quantity: Quantity,
    ) -> Result<bool, RepositoryError>;

    /// Delete a line if present.
    async fn remove_cart_line(&self, user: UserId, product: ProductId)
    -> Result<(), RepositoryError>;

    /// Delete the cart and all its lines if present.
    async fn clear_cart(&self, user: UserId) -> Result<(), RepositoryError>;
}

/// Favorites of authenticated users.
#[async_trait]
pub trait FavoriteRepository: Send + Sync {
    /// Favorite product ids ordered by id.
    async fn favorite_ids(&self, user: UserId) -> Result<Vec<ProductId>, RepositoryError>;

    /// Add a favorite; adding twice is a no-op.
    async fn add_favorite(&self, user: UserId, product: ProductId) -> Result<(), RepositoryError>;

    async fn remove_favorite(&self, user: UserId, product: ProductId)
    -> Result<(), RepositoryError>;
}

/// Deliveries and orders.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn list_delivery_types(&self) -> Result<Vec<DeliveryType>, RepositoryError>;

    async fn delivery_type_exists(&self, id: DeliveryTypeId) -> Result<bool, RepositoryError>;

    async fn get_delivery(&self, id: DeliveryId) -> Result<Option<Delivery>, RepositoryError>;

    async fn create_delivery(&self, delivery: &NewDelivery) -> Result<Delivery, RepositoryError>;

    /// Write the order and its lines and empty the user's cart, atomically.
    async fn create_order(&self, order: &NewOrder) -> Result<Order, RepositoryError>;

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>, RepositoryError>;

    /// Orders of a user, newest first.
    async fn orders_for_user(&self, user: UserId) -> Result<Vec<Order>, RepositoryError>;

    /// Set the paid flag. Returns `false` if the order was already paid or
    /// does not exist.
    async fn mark_paid(&self, id: OrderId) -> Result<bool, RepositoryError>;

    /// Point the order at another delivery.
    ///
    /// Returns [`RepositoryError::NotFound`] if the order does not exist.
    async fn set_delivery(&self, id: OrderId, delivery: DeliveryId) -> Result<(), RepositoryError>;
}

/// Product reviews.
#[async_trait]
pub trait ReviewRepository: Send + Sync {
    /// Reviews ordered by id, optionally for one product.
    async fn list_reviews(&self, product: Option<ProductId>) -> Result<Vec<Review>, RepositoryError>;

    async fn get_review(&self, id: ReviewId) -> Result<Option<Review>, RepositoryError>;

    /// Returns [`RepositoryError::Conflict`] if the user already reviewed the product.
    async fn create_review(&self, review: &NewReview) -> Result<Review, RepositoryError>;

    async fn update_review(&self, id: ReviewId, patch: &ReviewPatch)
    -> Result<Review, RepositoryError>;

    async fn delete_review(&self, id: ReviewId) -> Result<(), RepositoryError>;
}

/// Everything the storefront needs from persistence.
pub trait Store:
    CatalogRepository + CartRepository + FavoriteRepository + OrderRepository + ReviewRepository
{
}

impl<T> Store for T where
    T: CatalogRepository + CartRepository + FavoriteRepository + OrderRepository + ReviewRepository
{
}

/// `PostgreSQL` implementation of the repository traits.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

//! Business logic between the HTTP handlers and the repositories.
//!
//! - [`cart`] - unified cart and favorites for anonymous and logged-in visitors
//! - [`catalog`] - pricing, filtering and product views
//! - [`orders`] - checkout, deliveries and order administration
//! - [`reviews`] - product reviews

pub mod cart;
pub mod catalog;
mod error;
pub mod orders;
pub mod reviews;

pub use cart::{CartBackend, CartService, CartView, FavoritesView};
pub use catalog::{CatalogService, ProductDetailView, ProductView};
pub use error::{CartError, CatalogError, OrderError, ReviewError};
pub use orders::{OrderService, OrderView, PlaceOrder};
pub use reviews::{CreateReview, ReviewService, UpdateReview};

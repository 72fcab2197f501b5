//! Domain models for the storefront.
//!
//! These are the shapes repositories return and services consume. HTTP
//! response shapes (`ProductView`, `CartView`, ...) live next to the services
//! that build them.

pub mod cart;
pub mod filter;
pub mod order;
pub mod product;
pub mod review;
pub mod session;

pub use cart::CartLine;
pub use filter::{BrandMatch, CatalogFilter, FilterError};
pub use order::{Delivery, DeliveryType, NewDelivery, NewOrder, NewOrderLine, Order, OrderLine};
pub use product::{
    Category, Collection, Color, FurnitureDetails, Material, Product, ProductImages,
};
pub use review::{NewReview, Review, ReviewPatch};
pub use session::{CurrentUser, Identity, SessionCart, SessionLine, keys as session_keys};

//! Furnish Storefront library.
//!
//! JSON API for the furniture storefront: catalog browsing with faceted
//! filters, carts and favorites shared by anonymous and logged-in visitors,
//! checkout with delivery scheduling, and product reviews.
//!
//! The crate is a library so that the binary, the CLI and the integration
//! tests build the same router over either store:
//!
//! - [`db::PgStore`] - `PostgreSQL` via sqlx
//! - [`db::MemoryStore`] - in-process, same semantics

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

pub use routes::app;
pub use state::AppState;

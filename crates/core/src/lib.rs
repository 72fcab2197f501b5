//! Furnish Core - Shared domain types.
//!
//! This crate provides the types shared by all Furnish components:
//! - `storefront` - JSON API for the catalog, carts, favorites, orders and reviews
//! - `cli` - Command-line tools for migrations, seeding and order administration
//!
//! # Architecture
//!
//! The core crate contains only types and pure computations - no I/O, no
//! database access, no HTTP. Pricing lives here so that every consumer derives
//! discounted prices the same way.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, quantities, phone numbers and statuses
//! - [`pricing`] - Discount windows and effective price computation

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod pricing;
pub mod types;

pub use pricing::{Discount, PriceBreakdown};
pub use types::*;

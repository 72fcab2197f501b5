//! Core types for Furnish.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod id;
pub mod phone;
pub mod price;
pub mod quantity;
pub mod rating;
pub mod status;

pub use id::*;
pub use phone::{Phone, PhoneError};
pub use price::{MONEY_SCALE, line_subtotal, round_money};
pub use quantity::{Quantity, QuantityError};
pub use rating::{Rating, RatingError};
pub use status::*;

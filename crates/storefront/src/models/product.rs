//! Catalog models.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use furnish_core::{
    CategoryId, CollectionId, ColorId, Discount, MaterialId, PriceBreakdown, ProductId,
};

/// A product category, addressed by slug in URLs and filters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub slug: String,
}

/// A named collection of products.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection {
    pub id: CollectionId,
    pub name: String,
    pub slug: String,
    pub image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub id: ColorId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Material {
    pub id: MaterialId,
    pub name: String,
}

/// Furniture-specific attributes, each filterable by exact value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FurnitureDetails {
    pub purpose: Option<String>,
    pub furniture_type: Option<String>,
    pub construction: Option<String>,
    pub swing_mechanism: Option<String>,
    pub armrest_adjustment: Option<String>,
}

/// Image references; storage of the files themselves is external.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductImages {
    pub main_image: Option<String>,
    pub first_image: Option<String>,
    pub second_image: Option<String>,
    pub third_image: Option<String>,
}

/// A product with everything needed to price, filter and display it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub article: String,
    pub name: String,
    pub product_type: Option<String>,
    pub category: Category,
    pub collection: Option<Collection>,
    pub color: Option<Color>,
    pub material: Option<Material>,
    pub legs_material: Option<Material>,
    pub brand: Option<String>,
    pub country: Option<String>,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub length: Option<i32>,
    pub weight: Option<Decimal>,
    pub warranty: Option<i32>,
    pub fast_delivery: bool,
    pub description: String,
    pub price: Decimal,
    pub details: FurnitureDetails,
    pub images: ProductImages,
    /// Storehouse quantity; zero when the product has no storehouse row.
    pub available_quantity: i32,
    /// Mean review rating, `None` when the product has no reviews.
    pub rating: Option<Decimal>,
    pub discounts: Vec<Discount>,
}

impl Product {
    /// Price, applicable discount and discounted price at `now`.
    #[must_use]
    pub fn price_at(&self, now: DateTime<Utc>) -> PriceBreakdown {
        PriceBreakdown::at(self.price, &self.discounts, now)
    }

    /// Effective (possibly discounted) price at `now`, unrounded.
    #[must_use]
    pub fn effective_price(&self, now: DateTime<Utc>) -> Decimal {
        self.price_at(now).total_price
    }

    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.available_quantity > 0
    }
}

//! Catalog seed files.
//!
//! A seed is a YAML document describing reference data, products, stock and
//! discounts. Products point at categories and collections by slug and at
//! colors and materials by name; discounts point at products by article.
//!
//! ```yaml
//! users: [buyer@example.com]
//! categories:
//!   - { name: Sofas, slug: sofas }
//! colors: [Grey]
//! delivery_types: [Courier]
//! products:
//!   - article: SF-001
//!     name: Oslo sofa
//!     category: sofas
//!     color: Grey
//!     price: "499.00"
//!     stock: 3
//! discounts:
//!   - discount: "10"
//!     created_at: 2026-01-01T00:00:00Z
//!     end_at: 2026-12-31T23:59:59Z
//!     products: [SF-001]
//! ```

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;

use furnish_core::{CategoryId, CollectionId, ColorId, DiscountId, MaterialId, ProductId};

use super::{PgStore, RepositoryError};
use crate::models::{FurnitureDetails, ProductImages};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CatalogSeed {
    /// Account emails.
    pub users: Vec<String>,
    pub categories: Vec<CategorySeed>,
    pub collections: Vec<CollectionSeed>,
    pub colors: Vec<String>,
    pub materials: Vec<String>,
    pub delivery_types: Vec<String>,
    pub products: Vec<ProductSeed>,
    pub discounts: Vec<DiscountSeed>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CategorySeed {
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CollectionSeed {
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProductSeed {
    pub article: String,
    pub name: String,
    #[serde(default)]
    pub product_type: Option<String>,
    /// Category slug.
    pub category: String,
    /// Collection slug.
    #[serde(default)]
    pub collection: Option<String>,
    /// Color name.
    #[serde(default)]
    pub color: Option<String>,
    /// Material name.
    #[serde(default)]
    pub material: Option<String>,
    /// Material name.
    #[serde(default)]
    pub legs_material: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub width: Option<i32>,
    #[serde(default)]
    pub height: Option<i32>,
    #[serde(default)]
    pub length: Option<i32>,
    #[serde(default)]
    pub weight: Option<Decimal>,
    #[serde(default)]
    pub warranty: Option<i32>,
    #[serde(default)]
    pub fast_delivery: bool,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    /// Storehouse quantity.
    #[serde(default)]
    pub stock: i32,
    #[serde(flatten)]
    pub details: FurnitureDetails,
    #[serde(default)]
    pub images: ProductImages,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiscountSeed {
    pub discount: Decimal,
    pub created_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    /// Product articles the discount applies to.
    #[serde(default)]
    pub products: Vec<String>,
}

/// Counts reported after seeding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub users: usize,
    pub categories: usize,
    pub products: usize,
    pub discounts: usize,
}

impl CatalogSeed {
    /// Parse a YAML seed document.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::DataCorruption`] if the document is not
    /// valid YAML for a seed or if [`CatalogSeed::validate`] fails.
    pub fn from_yaml(source: &str) -> Result<Self, RepositoryError> {
        let seed: Self = serde_yaml::from_str(source)
            .map_err(|e| RepositoryError::DataCorruption(format!("invalid seed file: {e}")))?;
        seed.validate()?;
        Ok(seed)
    }

    /// Check references and value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::DataCorruption`] describing the first
    /// problem found.
    pub fn validate(&self) -> Result<(), RepositoryError> {
        let categories: HashSet<&str> = self.categories.iter().map(|c| c.slug.as_str()).collect();
        let collections: HashSet<&str> =
            self.collections.iter().map(|c| c.slug.as_str()).collect();
        let colors: HashSet<&str> = self.colors.iter().map(String::as_str).collect();
        let materials: HashSet<&str> = self.materials.iter().map(String::as_str).collect();
        let mut articles = HashSet::new();

        for product in &self.products {
            let fail = |what: &str, value: &str| {
                Err(RepositoryError::DataCorruption(format!(
                    "product {}: unknown {what} '{value}'",
                    product.article
                )))
            };

            if !articles.insert(product.article.as_str()) {
                return Err(RepositoryError::DataCorruption(format!(
                    "duplicate article '{}'",
                    product.article
                )));
            }
            if !categories.contains(product.category.as_str()) {
                return fail("category", &product.category);
            }
            if let Some(slug) = product.collection.as_deref()
                && !collections.contains(slug)
            {
                return fail("collection", slug);
            }
            if let Some(name) = product.color.as_deref()
                && !colors.contains(name)
            {
                return fail("color", name);
            }
            for name in [&product.material, &product.legs_material]
                .into_iter()
                .flatten()
            {
                if !materials.contains(name.as_str()) {
                    return fail("material", name);
                }
            }
            if product.price < Decimal::ZERO || product.stock < 0 {
                return Err(RepositoryError::DataCorruption(format!(
                    "product {}: price and stock must not be negative",
                    product.article
                )));
            }
        }

        for discount in &self.discounts {
            if discount.discount < Decimal::ZERO || discount.discount > Decimal::ONE_HUNDRED {
                return Err(RepositoryError::DataCorruption(format!(
                    "discount {} is outside 0..=100",
                    discount.discount
                )));
            }
            if discount.created_at > discount.end_at {
                return Err(RepositoryError::DataCorruption(
                    "discount ends before it starts".to_owned(),
                ));
            }
            if let Some(article) = discount
                .products
                .iter()
                .find(|a| !articles.contains(a.as_str()))
            {
                return Err(RepositoryError::DataCorruption(format!(
                    "discount refers to unknown article '{article}'"
                )));
            }
        }

        Ok(())
    }
}

/// Look up an id assigned while seeding.
fn resolve<T: Copy>(ids: &BTreeMap<String, T>, key: &str) -> Result<T, RepositoryError> {
    ids.get(key)
        .copied()
        .ok_or_else(|| RepositoryError::DataCorruption(format!("unresolved reference '{key}'")))
}

impl PgStore {
    /// Write a seed in one transaction.
    ///
    /// Reference data, users and products are upserted by their natural keys
    /// (slug, name, email, article), so re-running a seed updates the catalog
    /// in place. Discounts have no natural key and are inserted each time.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::DataCorruption` if the seed is inconsistent
    /// and `RepositoryError::Database` if a write fails.
    pub async fn seed(&self, seed: &CatalogSeed) -> Result<SeedSummary, RepositoryError> {
        seed.validate()?;
        let mut tx = self.pool.begin().await?;

        for email in &seed.users {
            sqlx::query(
                "INSERT INTO storefront.user (email) VALUES ($1) ON CONFLICT (email) DO NOTHING",
            )
            .bind(email)
            .execute(&mut *tx)
            .await?;
        }

        let mut categories = BTreeMap::new();
        for category in &seed.categories {
            let id = sqlx::query_scalar::<_, CategoryId>(
                r"
                INSERT INTO storefront.category (name, slug) VALUES ($1, $2)
                ON CONFLICT (slug) DO UPDATE SET name = EXCLUDED.name
                RETURNING id
                ",
            )
            .bind(&category.name)
            .bind(&category.slug)
            .fetch_one(&mut *tx)
            .await?;
            categories.insert(category.slug.clone(), id);
        }

        let mut collections = BTreeMap::new();
        for collection in &seed.collections {
            let id = sqlx::query_scalar::<_, CollectionId>(
                r"
                INSERT INTO storefront.collection (name, slug, image) VALUES ($1, $2, $3)
                ON CONFLICT (slug) DO UPDATE SET name = EXCLUDED.name, image = EXCLUDED.image
                RETURNING id
                ",
            )
            .bind(&collection.name)
            .bind(&collection.slug)
            .bind(collection.image.as_deref())
            .fetch_one(&mut *tx)
            .await?;
            collections.insert(collection.slug.clone(), id);
        }

        let mut colors = BTreeMap::new();
        for name in &seed.colors {
            let id = sqlx::query_scalar::<_, ColorId>(
                r"
                INSERT INTO storefront.color (name) VALUES ($1)
                ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
                RETURNING id
                ",
            )
            .bind(name)
            .fetch_one(&mut *tx)
            .await?;
            colors.insert(name.clone(), id);
        }

        let mut materials = BTreeMap::new();
        for name in &seed.materials {
            let id = sqlx::query_scalar::<_, MaterialId>(
                r"
                INSERT INTO storefront.material (name) VALUES ($1)
                ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
                RETURNING id
                ",
            )
            .bind(name)
            .fetch_one(&mut *tx)
            .await?;
            materials.insert(name.clone(), id);
        }

        for name in &seed.delivery_types {
            sqlx::query(
                "INSERT INTO storefront.delivery_type (name) VALUES ($1) ON CONFLICT (name) DO NOTHING",
            )
            .bind(name)
            .execute(&mut *tx)
            .await?;
        }

        let mut products = BTreeMap::new();
        for product in &seed.products {
            let product_type = match product.product_type.as_deref() {
                Some(name) => Some(
                    sqlx::query_scalar::<_, i32>(
                        r"
                        INSERT INTO storefront.product_type (name) VALUES ($1)
                        ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
                        RETURNING id
                        ",
                    )
                    .bind(name)
                    .fetch_one(&mut *tx)
                    .await?,
                ),
                None => None,
            };

            let collection = product
                .collection
                .as_deref()
                .map(|slug| resolve(&collections, slug))
                .transpose()?;
            let color = product
                .color
                .as_deref()
                .map(|name| resolve(&colors, name))
                .transpose()?;
            let material = product
                .material
                .as_deref()
                .map(|name| resolve(&materials, name))
                .transpose()?;
            let legs_material = product
                .legs_material
                .as_deref()
                .map(|name| resolve(&materials, name))
                .transpose()?;

            let id = sqlx::query_scalar::<_, ProductId>(
                r"
                INSERT INTO storefront.product (
                    article, name, product_type_id, category_id, collection_id, color_id,
                    material_id, legs_material_id, brand, country, width, height, length,
                    weight, warranty, fast_delivery, description, price,
                    purpose, furniture_type, construction, swing_mechanism, armrest_adjustment,
                    main_image, first_image, second_image, third_image
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16,
                        $17, $18, $19, $20, $21, $22, $23, $24, $25, $26, $27)
                ON CONFLICT (article) DO UPDATE SET
                    name = EXCLUDED.name,
                    product_type_id = EXCLUDED.product_type_id,
                    category_id = EXCLUDED.category_id,
                    collection_id = EXCLUDED.collection_id,
                    color_id = EXCLUDED.color_id,
                    material_id = EXCLUDED.material_id,
                    legs_material_id = EXCLUDED.legs_material_id,
                    brand = EXCLUDED.brand,
                    country = EXCLUDED.country,
                    width = EXCLUDED.width,
                    height = EXCLUDED.height,
                    length = EXCLUDED.length,
                    weight = EXCLUDED.weight,
                    warranty = EXCLUDED.warranty,
                    fast_delivery = EXCLUDED.fast_delivery,
                    description = EXCLUDED.description,
                    price = EXCLUDED.price,
                    purpose = EXCLUDED.purpose,
                    furniture_type = EXCLUDED.furniture_type,
                    construction = EXCLUDED.construction,
                    swing_mechanism = EXCLUDED.swing_mechanism,
                    armrest_adjustment = EXCLUDED.armrest_adjustment,
                    main_image = EXCLUDED.main_image,
                    first_image = EXCLUDED.first_image,
                    second_image = EXCLUDED.second_image,
                    third_image = EXCLUDED.third_image
                RETURNING id
                ",
            )
            .bind(&product.article)
            .bind(&product.name)
            .bind(product_type)
            .bind(resolve(&categories, &product.category)?)
            .bind(collection)
            .bind(color)
            .bind(material)
            .bind(legs_material)
            .bind(product.brand.as_deref())
            .bind(product.country.as_deref())
            .bind(product.width)
            .bind(product.height)
            .bind(product.length)
            .bind(product.weight)
            .bind(product.warranty)
            .bind(product.fast_delivery)
            .bind(&product.description)
            .bind(product.price)
            .bind(product.details.purpose.as_deref())
            .bind(product.details.furniture_type.as_deref())
            .bind(product.details.construction.as_deref())
            .bind(product.details.swing_mechanism.as_deref())
            .bind(product.details.armrest_adjustment.as_deref())
            .bind(product.images.main_image.as_deref())
            .bind(product.images.first_image.as_deref())
            .bind(product.images.second_image.as_deref())
            .bind(product.images.third_image.as_deref())
            .fetch_one(&mut *tx)
            .await?;

            sqlx::query(
                r"
                INSERT INTO storefront.storehouse (product_id, quantity) VALUES ($1, $2)
                ON CONFLICT (product_id) DO UPDATE SET quantity = EXCLUDED.quantity
                ",
            )
            .bind(id)
            .bind(product.stock)
            .execute(&mut *tx)
            .await?;

            products.insert(product.article.clone(), id);
        }

        for discount in &seed.discounts {
            let id = sqlx::query_scalar::<_, DiscountId>(
                r"
                INSERT INTO storefront.discount (discount, created_at, end_at)
                VALUES ($1, $2, $3)
                RETURNING id
                ",
            )
            .bind(discount.discount)
            .bind(discount.created_at)
            .bind(discount.end_at)
            .fetch_one(&mut *tx)
            .await?;

            for article in &discount.products {
                sqlx::query(
                    r"
                    INSERT INTO storefront.discount_product (discount_id, product_id)
                    VALUES ($1, $2)
                    ON CONFLICT DO NOTHING
                    ",
                )
                .bind(id)
                .bind(resolve(&products, article)?)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;

        Ok(SeedSummary {
            users: seed.users.len(),
            categories: seed.categories.len(),
            products: seed.products.len(),
            discounts: seed.discounts.len(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const SEED: &str = r#"
categories:
  - { name: Sofas, slug: sofas }
colors: [Grey]
materials: [Oak]
products:
  - article: SF-001
    name: Oslo sofa
    category: sofas
    color: Grey
    legs_material: Oak
    price: "499.00"
    stock: 3
    purpose: living room
discounts:
  - discount: "15"
    created_at: 2026-01-01T00:00:00Z
    end_at: 2026-12-31T23:59:59Z
    products: [SF-001]
"#;

    #[test]
    fn test_parse_seed() {
        let seed = CatalogSeed::from_yaml(SEED).unwrap();
        let product = seed.products.first().unwrap();
        assert_eq!(product.price, Decimal::new(49900, 2));
        assert_eq!(product.details.purpose.as_deref(), Some("living room"));
        assert_eq!(seed.discounts.len(), 1);
    }

    #[test]
    fn test_unknown_category_is_rejected() {
        let yaml = SEED.replace("category: sofas", "category: beds");
        let err = CatalogSeed::from_yaml(&yaml).unwrap_err();
        assert!(err.to_string().contains("unknown category 'beds'"));
    }

    #[test]
    fn test_discount_with_unknown_article_is_rejected() {
        let yaml = SEED.replace("products: [SF-001]", "products: [XX-999]");
        assert!(CatalogSeed::from_yaml(&yaml).is_err());
    }

    #[test]
    fn test_discount_over_hundred_is_rejected() {
        let yaml = SEED.replace("discount: \"15\"", "discount: \"150\"");
        assert!(CatalogSeed::from_yaml(&yaml).is_err());
    }
}

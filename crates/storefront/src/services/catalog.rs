//! Product pricing, filtering and presentation.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::instrument;

use furnish_core::{Discount, ProductId, round_money};

use super::CatalogError;
use crate::db::Store;
use crate::models::{
    BrandMatch, CatalogFilter, Category, Collection, Color, FurnitureDetails, Identity, Material,
    Product, ProductImages,
};

/// Number of best sellers returned by default.
pub const DEFAULT_POPULAR_LIMIT: i64 = 6;

/// Product as shown in listings, carts and favorites.
///
/// `total_price` is rounded to cents; `price` is the list price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductView {
    pub id: ProductId,
    pub article: String,
    pub product_type: Option<String>,
    pub name: String,
    pub is_favorited: bool,
    pub price: Decimal,
    /// Percentage of the discount that applies now.
    pub discount: Option<Decimal>,
    pub total_price: Decimal,
    pub available_quantity: i32,
    pub images: ProductImages,
}

impl ProductView {
    #[must_use]
    pub fn new(product: &Product, is_favorited: bool, now: DateTime<Utc>) -> Self {
        let price = product.price_at(now);
        Self {
            id: product.id,
            article: product.article.clone(),
            product_type: product.product_type.clone(),
            name: product.name.clone(),
            is_favorited,
            price: price.price,
            discount: price.discount,
            total_price: round_money(price.total_price),
            available_quantity: product.available_quantity,
            images: product.images.clone(),
        }
    }
}

/// Build views for a list of products.
#[must_use]
pub fn product_views(
    products: &[Product],
    favorites: &BTreeSet<ProductId>,
    now: DateTime<Utc>,
) -> Vec<ProductView> {
    products
        .iter()
        .map(|p| ProductView::new(p, favorites.contains(&p.id), now))
        .collect()
}

/// Full product page: the product, the same model in other colors and other
/// products from its category.
#[derive(Debug, Clone, Serialize)]
pub struct ProductDetailView {
    #[serde(flatten)]
    pub product: ProductView,
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
    #[serde(flatten)]
    pub details: FurnitureDetails,
    pub rating: Option<Decimal>,
    pub other_color_same_products: Vec<ProductView>,
    pub similar_products: Vec<ProductView>,
}

/// A collection with its products.
#[derive(Debug, Clone, Serialize)]
pub struct CollectionDetailView {
    #[serde(flatten)]
    pub collection: Collection,
    pub products: Vec<ProductView>,
}

/// Read-only catalog operations.
pub struct CatalogService<'a> {
    store: &'a dyn Store,
    brand_match: BrandMatch,
}

impl<'a> CatalogService<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn Store, brand_match: BrandMatch) -> Self {
        Self { store, brand_match }
    }

    /// Products matching `filter`, ordered by id.
    ///
    /// `favorites` is the caller's favorite set; it is only consulted for an
    /// authenticated `identity`.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the store fails.
    #[instrument(skip(self, filter, favorites))]
    pub async fn filter_catalog(
        &self,
        filter: CatalogFilter,
        identity: Identity,
        favorites: &BTreeSet<ProductId>,
        now: DateTime<Utc>,
    ) -> Result<Vec<Product>, CatalogError> {
        let filter = filter.with_brand_match(self.brand_match);
        let candidates = self.store.list_products(&filter).await?;

        let products: Vec<Product> = candidates
            .into_iter()
            .filter(|p| filter.matches(p, identity, favorites, now))
            .collect();

        tracing::debug!(count = products.len(), "catalog filtered");
        Ok(products)
    }

    /// Product page with related products.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::ProductNotFound` if the product does not exist.
    #[instrument(skip(self, favorites))]
    pub async fn product_detail(
        &self,
        id: ProductId,
        favorites: &BTreeSet<ProductId>,
        now: DateTime<Utc>,
    ) -> Result<ProductDetailView, CatalogError> {
        let product = self
            .store
            .get_product(id)
            .await?
            .ok_or(CatalogError::ProductNotFound(id))?;

        let same_category = CatalogFilter {
            categories: vec![product.category.slug.clone()],
            ..CatalogFilter::default()
        };
        let similar: Vec<Product> = self
            .store
            .list_products(&same_category)
            .await?
            .into_iter()
            .filter(|p| p.id != product.id && p.category.id == product.category.id)
            .collect();

        let other_colors: Vec<Product> = similar
            .iter()
            .filter(|p| {
                p.name == product.name
                    && p.product_type == product.product_type
                    && p.color.as_ref().map(|c| c.id) != product.color.as_ref().map(|c| c.id)
            })
            .cloned()
            .collect();

        Ok(ProductDetailView {
            product: ProductView::new(&product, favorites.contains(&product.id), now),
            other_color_same_products: product_views(&other_colors, favorites, now),
            similar_products: product_views(&similar, favorites, now),
            category: product.category,
            collection: product.collection,
            color: product.color,
            material: product.material,
            legs_material: product.legs_material,
            brand: product.brand,
            country: product.country,
            width: product.width,
            height: product.height,
            length: product.length,
            weight: product.weight,
            warranty: product.warranty,
            fast_delivery: product.fast_delivery,
            description: product.description,
            details: product.details,
            rating: product.rating,
        })
    }

    /// Best sellers by total ordered quantity.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the store fails.
    #[instrument(skip(self, favorites))]
    pub async fn popular(
        &self,
        limit: i64,
        favorites: &BTreeSet<ProductId>,
        now: DateTime<Utc>,
    ) -> Result<Vec<ProductView>, CatalogError> {
        let ranked = self.store.best_sellers(limit).await?;
        let products = self.store.products_by_ids(&ranked).await?;

        // products_by_ids sorts by id; restore the ranking.
        Ok(ranked
            .iter()
            .filter_map(|id| products.iter().find(|p| p.id == *id))
            .map(|p| ProductView::new(p, favorites.contains(&p.id), now))
            .collect())
    }

    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the store fails.
    pub async fn categories(&self) -> Result<Vec<Category>, CatalogError> {
        Ok(self.store.list_categories().await?)
    }

    /// # Errors
    ///
    /// Returns `CatalogError::CategoryNotFound` for an unknown slug.
    pub async fn category(&self, slug: &str) -> Result<Category, CatalogError> {
        self.store
            .get_category(slug)
            .await?
            .ok_or_else(|| CatalogError::CategoryNotFound(slug.to_owned()))
    }

    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the store fails.
    pub async fn collections(&self) -> Result<Vec<Collection>, CatalogError> {
        Ok(self.store.list_collections().await?)
    }

    /// A collection and its products.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::CollectionNotFound` for an unknown slug.
    pub async fn collection(
        &self,
        slug: &str,
        favorites: &BTreeSet<ProductId>,
        now: DateTime<Utc>,
    ) -> Result<CollectionDetailView, CatalogError> {
        let collection = self
            .store
            .get_collection(slug)
            .await?
            .ok_or_else(|| CatalogError::CollectionNotFound(slug.to_owned()))?;

        let filter = CatalogFilter {
            collections: vec![collection.slug.clone()],
            ..CatalogFilter::default()
        };
        let products: Vec<Product> = self
            .store
            .list_products(&filter)
            .await?
            .into_iter()
            .filter(|p| p.collection.as_ref().is_some_and(|c| c.id == collection.id))
            .collect();

        Ok(CollectionDetailView {
            products: product_views(&products, favorites, now),
            collection,
        })
    }

    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the store fails.
    pub async fn colors(&self) -> Result<Vec<Color>, CatalogError> {
        Ok(self.store.list_colors().await?)
    }

    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the store fails.
    pub async fn materials(&self) -> Result<Vec<Material>, CatalogError> {
        Ok(self.store.list_materials().await?)
    }

    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the store fails.
    pub async fn discounts(&self) -> Result<Vec<Discount>, CatalogError> {
        Ok(self.store.list_discounts().await?)
    }

    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the store fails.
    pub async fn brands(&self) -> Result<Vec<String>, CatalogError> {
        Ok(self.store.list_brands().await?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::db::{CatalogRepository, CatalogSeed, MemoryStore};

    const SEED: &str = r#"
categories:
  - { name: Sofas, slug: sofas }
  - { name: Beds, slug: beds }
collections:
  - { name: Nordic, slug: nordic }
colors: [Grey, Blue]
products:
  - { article: A, name: Oslo, product_type: sofa, category: sofas, color: Grey, price: "100", stock: 0, collection: nordic }
  - { article: B, name: Oslo, product_type: sofa, category: sofas, color: Blue, price: "120", stock: 1 }
  - { article: C, name: Bergen, category: sofas, price: "300", stock: 5 }
  - { article: D, name: Dream, category: beds, price: "250", stock: 2, collection: nordic }
discounts:
  - { discount: "50", created_at: "2020-01-01T00:00:00Z", end_at: "2100-01-01T00:00:00Z", products: [D] }
"#;

    fn store() -> MemoryStore {
        MemoryStore::from_seed(&CatalogSeed::from_yaml(SEED).unwrap()).unwrap()
    }

    fn ids(products: &[Product]) -> Vec<i32> {
        products.iter().map(|p| p.id.as_i32()).collect()
    }

    #[tokio::test]
    async fn test_in_stock_filter() {
        let store = store();
        let service = CatalogService::new(&store, BrandMatch::Exact);
        let filter = CatalogFilter::from_query("in_stock=true").unwrap();
        let products = service
            .filter_catalog(filter, Identity::Anonymous, &BTreeSet::new(), Utc::now())
            .await
            .unwrap();
        assert_eq!(ids(&products), vec![2, 3, 4]);
    }

    #[tokio::test]
    async fn test_price_range_includes_discounted_product() {
        let store = store();
        let service = CatalogService::new(&store, BrandMatch::Exact);
        let filter = CatalogFilter::from_query("min_total_price=100&max_total_price=200").unwrap();
        let products = service
            .filter_catalog(filter, Identity::Anonymous, &BTreeSet::new(), Utc::now())
            .await
            .unwrap();
        assert_eq!(ids(&products), vec![1, 2, 4]);
    }

    #[tokio::test]
    async fn test_product_detail_related_products() {
        let store = store();
        let service = CatalogService::new(&store, BrandMatch::Exact);
        let detail = service
            .product_detail(ProductId::new(1), &BTreeSet::new(), Utc::now())
            .await
            .unwrap();

        let other: Vec<_> = detail.other_color_same_products.iter().map(|p| p.id.as_i32()).collect();
        let similar: Vec<_> = detail.similar_products.iter().map(|p| p.id.as_i32()).collect();
        assert_eq!(other, vec![2]);
        assert_eq!(similar, vec![2, 3]);
    }

    #[tokio::test]
    async fn test_missing_product_detail() {
        let store = store();
        let service = CatalogService::new(&store, BrandMatch::Exact);
        let err = service
            .product_detail(ProductId::new(99), &BTreeSet::new(), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::ProductNotFound(_)));
    }

    #[tokio::test]
    async fn test_view_rounds_total_price() {
        let store = store();
        let mut product = store.get_product(ProductId::new(3)).await.unwrap().unwrap();
        let now = Utc::now();
        product.price = Decimal::new(9999, 2);
        product.discounts.push(Discount {
            id: furnish_core::DiscountId::new(9),
            discount: Decimal::new(125, 1),
            created_at: now - Duration::days(1),
            end_at: now + Duration::days(1),
        });

        let view = ProductView::new(&product, false, now);
        assert_eq!(view.total_price, Decimal::new(8749, 2));
        assert_eq!(view.discount, Some(Decimal::new(125, 1)));
    }

    #[tokio::test]
    async fn test_collection_detail_lists_products() {
        let store = store();
        let service = CatalogService::new(&store, BrandMatch::Exact);
        let detail = service
            .collection("nordic", &BTreeSet::new(), Utc::now())
            .await
            .unwrap();
        let ids: Vec<_> = detail.products.iter().map(|p| p.id.as_i32()).collect();
        assert_eq!(ids, vec![1, 4]);
    }
}

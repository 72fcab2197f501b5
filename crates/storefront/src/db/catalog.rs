//! Catalog queries for [`PgStore`].

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{Postgres, QueryBuilder};

use furnish_core::{
    CategoryId, CollectionId, ColorId, Discount, DiscountId, MaterialId, ProductId,
};

use super::{CatalogRepository, PgStore, RepositoryError};
use crate::models::{
    CatalogFilter, Category, Collection, Color, FurnitureDetails, Material, Product,
    ProductImages,
};

/// Product columns with reference data, stock and average rating joined in.
const PRODUCT_SELECT: &str = r"
    SELECT p.id, p.article, p.name, pt.name AS product_type,
           p.category_id, c.name AS category_name, c.slug AS category_slug,
           p.collection_id, co.name AS collection_name, co.slug AS collection_slug,
           co.image AS collection_image,
           p.color_id, cl.name AS color_name,
           p.material_id, m.name AS material_name,
           p.legs_material_id, lm.name AS legs_material_name,
           p.brand, p.country, p.width, p.height, p.length, p.weight, p.warranty,
           p.fast_delivery, p.description, p.price,
           p.purpose, p.furniture_type, p.construction, p.swing_mechanism,
           p.armrest_adjustment,
           p.main_image, p.first_image, p.second_image, p.third_image,
           COALESCE(s.quantity, 0) AS available_quantity,
           (SELECT AVG(r.rating) FROM storefront.review r WHERE r.product_id = p.id) AS rating
    FROM storefront.product p
    JOIN storefront.category c ON c.id = p.category_id
    LEFT JOIN storefront.product_type pt ON pt.id = p.product_type_id
    LEFT JOIN storefront.collection co ON co.id = p.collection_id
    LEFT JOIN storefront.color cl ON cl.id = p.color_id
    LEFT JOIN storefront.material m ON m.id = p.material_id
    LEFT JOIN storefront.material lm ON lm.id = p.legs_material_id
    LEFT JOIN storefront.storehouse s ON s.product_id = p.id
";

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: ProductId,
    article: String,
    name: String,
    product_type: Option<String>,
    category_id: CategoryId,
    category_name: String,
    category_slug: String,
    collection_id: Option<CollectionId>,
    collection_name: Option<String>,
    collection_slug: Option<String>,
    collection_image: Option<String>,
    color_id: Option<ColorId>,
    color_name: Option<String>,
    material_id: Option<MaterialId>,
    material_name: Option<String>,
    legs_material_id: Option<MaterialId>,
    legs_material_name: Option<String>,
    brand: Option<String>,
    country: Option<String>,
    width: Option<i32>,
    height: Option<i32>,
    length: Option<i32>,
    weight: Option<Decimal>,
    warranty: Option<i32>,
    fast_delivery: bool,
    description: String,
    price: Decimal,
    purpose: Option<String>,
    furniture_type: Option<String>,
    construction: Option<String>,
    swing_mechanism: Option<String>,
    armrest_adjustment: Option<String>,
    main_image: Option<String>,
    first_image: Option<String>,
    second_image: Option<String>,
    third_image: Option<String>,
    available_quantity: i32,
    rating: Option<Decimal>,
}

impl ProductRow {
    fn into_product(self, discounts: Vec<Discount>) -> Product {
        let collection = match (self.collection_id, self.collection_name, self.collection_slug) {
            (Some(id), Some(name), Some(slug)) => Some(Collection {
                id,
                name,
                slug,
                image: self.collection_image,
            }),
            _ => None,
        };

        Product {
            id: self.id,
            article: self.article,
            name: self.name,
            product_type: self.product_type,
            category: Category {
                id: self.category_id,
                name: self.category_name,
                slug: self.category_slug,
            },
            collection,
            color: self
                .color_id
                .zip(self.color_name)
                .map(|(id, name)| Color { id, name }),
            material: self
                .material_id
                .zip(self.material_name)
                .map(|(id, name)| Material { id, name }),
            legs_material: self
                .legs_material_id
                .zip(self.legs_material_name)
                .map(|(id, name)| Material { id, name }),
            brand: self.brand,
            country: self.country,
            width: self.width,
            height: self.height,
            length: self.length,
            weight: self.weight,
            warranty: self.warranty,
            fast_delivery: self.fast_delivery,
            description: self.description,
            price: self.price,
            details: FurnitureDetails {
                purpose: self.purpose,
                furniture_type: self.furniture_type,
                construction: self.construction,
                swing_mechanism: self.swing_mechanism,
                armrest_adjustment: self.armrest_adjustment,
            },
            images: ProductImages {
                main_image: self.main_image,
                first_image: self.first_image,
                second_image: self.second_image,
                third_image: self.third_image,
            },
            available_quantity: self.available_quantity,
            rating: self.rating,
            discounts,
        }
    }
}

#[derive(sqlx::FromRow)]
struct DiscountRow {
    id: DiscountId,
    discount: Decimal,
    created_at: DateTime<Utc>,
    end_at: DateTime<Utc>,
}

impl From<DiscountRow> for Discount {
    fn from(row: DiscountRow) -> Self {
        Self {
            id: row.id,
            discount: row.discount,
            created_at: row.created_at,
            end_at: row.end_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ProductDiscountRow {
    product_id: ProductId,
    #[sqlx(flatten)]
    discount: DiscountRow,
}

impl PgStore {
    /// Load the discounts of every row in one query and build products.
    async fn with_discounts(&self, rows: Vec<ProductRow>) -> Result<Vec<Product>, RepositoryError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i32> = rows.iter().map(|r| r.id.as_i32()).collect();
        let links: Vec<ProductDiscountRow> = sqlx::query_as(
            r"
            SELECT dp.product_id, d.id, d.discount, d.created_at, d.end_at
            FROM storefront.discount_product dp
            JOIN storefront.discount d ON d.id = dp.discount_id
            WHERE dp.product_id = ANY($1)
            ORDER BY d.id
            ",
        )
        .bind(ids.as_slice())
        .fetch_all(&self.pool)
        .await?;

        let mut by_product: HashMap<ProductId, Vec<Discount>> = HashMap::new();
        for link in links {
            by_product
                .entry(link.product_id)
                .or_default()
                .push(link.discount.into());
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let discounts = by_product.remove(&row.id).unwrap_or_default();
                row.into_product(discounts)
            })
            .collect())
    }
}

#[async_trait]
impl CatalogRepository for PgStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let sql = format!("{PRODUCT_SELECT} WHERE p.id = $1");
        let row: Option<ProductRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(self.with_discounts(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn products_by_ids(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let raw: Vec<i32> = ids.iter().map(ProductId::as_i32).collect();
        let sql = format!("{PRODUCT_SELECT} WHERE p.id = ANY($1) ORDER BY p.id");
        let rows: Vec<ProductRow> = sqlx::query_as(&sql)
            .bind(raw.as_slice())
            .fetch_all(&self.pool)
            .await?;

        self.with_discounts(rows).await
    }

    async fn list_products(&self, filter: &CatalogFilter) -> Result<Vec<Product>, RepositoryError> {
        // Narrow by the indexed facets; prices, ratings and text are matched
        // by the caller.
        let mut qb = QueryBuilder::<Postgres>::new(PRODUCT_SELECT);
        qb.push(" WHERE TRUE");

        if !filter.categories.is_empty() {
            qb.push(" AND c.slug = ANY(")
                .push_bind(filter.categories.clone())
                .push(")");
        }
        if !filter.collections.is_empty() {
            qb.push(" AND co.slug = ANY(")
                .push_bind(filter.collections.clone())
                .push(")");
        }
        if !filter.colors.is_empty() {
            qb.push(" AND cl.name = ANY(")
                .push_bind(filter.colors.clone())
                .push(")");
        }
        if !filter.materials.is_empty() {
            qb.push(" AND m.name = ANY(")
                .push_bind(filter.materials.clone())
                .push(")");
        }
        if let Some(fast_delivery) = filter.fast_delivery {
            qb.push(" AND p.fast_delivery = ").push_bind(fast_delivery);
        }
        if filter.in_stock {
            qb.push(" AND COALESCE(s.quantity, 0) > 0");
        }
        qb.push(" ORDER BY p.id");

        let rows: Vec<ProductRow> = qb.build_query_as().fetch_all(&self.pool).await?;
        self.with_discounts(rows).await
    }

    async fn best_sellers(&self, limit: i64) -> Result<Vec<ProductId>, RepositoryError> {
        let ids = sqlx::query_scalar::<_, ProductId>(
            r"
            SELECT product_id
            FROM storefront.order_product
            GROUP BY product_id
            HAVING SUM(quantity) > 0
            ORDER BY SUM(quantity) DESC, product_id
            LIMIT $1
            ",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    async fn list_categories(&self) -> Result<Vec<Category>, RepositoryError> {
        let rows = sqlx::query_as::<_, (CategoryId, String, String)>(
            "SELECT id, name, slug FROM storefront.category ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, name, slug)| Category { id, name, slug })
            .collect())
    }

    async fn get_category(&self, slug: &str) -> Result<Option<Category>, RepositoryError> {
        let row = sqlx::query_as::<_, (CategoryId, String, String)>(
            "SELECT id, name, slug FROM storefront.category WHERE slug = $1",
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(id, name, slug)| Category { id, name, slug }))
    }

    async fn list_collections(&self) -> Result<Vec<Collection>, RepositoryError> {
        let rows = sqlx::query_as::<_, (CollectionId, String, String, Option<String>)>(
            "SELECT id, name, slug, image FROM storefront.collection ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, name, slug, image)| Collection {
                id,
                name,
                slug,
                image,
            })
            .collect())
    }

    async fn get_collection(&self, slug: &str) -> Result<Option<Collection>, RepositoryError> {
        let row = sqlx::query_as::<_, (CollectionId, String, String, Option<String>)>(
            "SELECT id, name, slug, image FROM storefront.collection WHERE slug = $1",
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(id, name, slug, image)| Collection {
            id,
            name,
            slug,
            image,
        }))
    }

    async fn list_colors(&self) -> Result<Vec<Color>, RepositoryError> {
        let rows = sqlx::query_as::<_, (ColorId, String)>(
            "SELECT id, name FROM storefront.color ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|(id, name)| Color { id, name }).collect())
    }

    async fn list_materials(&self) -> Result<Vec<Material>, RepositoryError> {
        let rows = sqlx::query_as::<_, (MaterialId, String)>(
            "SELECT id, name FROM storefront.material ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, name)| Material { id, name })
            .collect())
    }

    async fn list_discounts(&self) -> Result<Vec<Discount>, RepositoryError> {
        let rows: Vec<DiscountRow> = sqlx::query_as(
            "SELECT id, discount, created_at, end_at FROM storefront.discount ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Discount::from).collect())
    }

    async fn list_brands(&self) -> Result<Vec<String>, RepositoryError> {
        let brands = sqlx::query_scalar::<_, String>(
            r"
            SELECT DISTINCT brand
            FROM storefront.product
            WHERE brand IS NOT NULL AND brand <> ''
            ORDER BY brand
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(brands)
    }
}

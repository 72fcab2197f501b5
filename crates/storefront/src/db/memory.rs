//! In-process store with the same semantics as [`PgStore`](super::PgStore).
//!
//! Used by tests and by `STOREFRONT_STORE=memory` for local demos. Ids are
//! assigned sequentially from 1 in seed order, like `SERIAL` columns on a
//! fresh database.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::RwLock;

use furnish_core::{
    CategoryId, CollectionId, ColorId, DeliveryId, DeliveryTypeId, Discount, DiscountId,
    MaterialId, OrderId, OrderProductId, OrderStatus, ProductId, Quantity, ReviewId, UserId,
};

use super::seed::{CatalogSeed, SeedSummary};
use super::{
    CartRepository, CatalogRepository, FavoriteRepository, OrderRepository, RepositoryError,
    ReviewRepository,
};
use crate::models::{
    CartLine, CatalogFilter, Category, Collection, Color, Delivery, DeliveryType, Material,
    NewDelivery, NewOrder, NewReview, Order, OrderLine, Product, Review, ReviewPatch,
};

#[derive(Debug, Default)]
struct MemoryData {
    products: BTreeMap<ProductId, Product>,
    categories: Vec<Category>,
    collections: Vec<Collection>,
    colors: Vec<Color>,
    materials: Vec<Material>,
    discounts: Vec<Discount>,
    users: BTreeMap<String, UserId>,
    delivery_types: Vec<DeliveryType>,
    deliveries: BTreeMap<DeliveryId, Delivery>,
    carts: BTreeMap<UserId, BTreeMap<ProductId, Quantity>>,
    favorites: BTreeMap<UserId, BTreeSet<ProductId>>,
    orders: BTreeMap<OrderId, Order>,
    reviews: BTreeMap<ReviewId, Review>,
    next_order_product: i32,
}

impl MemoryData {
    /// A product with its current average rating.
    fn product(&self, id: ProductId) -> Option<Product> {
        let mut product = self.products.get(&id)?.clone();
        let ratings: Vec<Decimal> = self
            .reviews
            .values()
            .filter(|r| r.product_id == id)
            .map(|r| Decimal::from(r.rating.get()))
            .collect();
        product.rating = if ratings.is_empty() {
            None
        } else {
            Some(ratings.iter().sum::<Decimal>() / Decimal::from(ratings.len()))
        };
        Some(product)
    }
}

/// Next id after the largest key of a map.
fn next_id<K: Copy + Into<i32>, V>(map: &BTreeMap<K, V>) -> i32 {
    map.keys().next_back().map_or(1, |k| (*k).into() + 1)
}

fn next_index<T>(items: &[T]) -> Result<i32, RepositoryError> {
    i32::try_from(items.len() + 1)
        .map_err(|_| RepositoryError::DataCorruption("too many records".to_owned()))
}

/// Tokio-lock-protected in-memory store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: RwLock<MemoryData>,
}

impl MemoryStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A store populated from a seed.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::DataCorruption`] if the seed is inconsistent.
    pub fn from_seed(seed: &CatalogSeed) -> Result<Self, RepositoryError> {
        let mut data = MemoryData::default();
        load_seed(&mut data, seed)?;
        Ok(Self {
            data: RwLock::new(data),
        })
    }

    /// Add a seed to the store.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::DataCorruption`] if the seed is inconsistent.
    pub async fn seed(&self, seed: &CatalogSeed) -> Result<SeedSummary, RepositoryError> {
        let mut data = self.data.write().await;
        load_seed(&mut data, seed)
    }

    /// Id of a seeded user.
    pub async fn user_id(&self, email: &str) -> Option<UserId> {
        self.data.read().await.users.get(email).copied()
    }

    /// Id of a seeded product.
    pub async fn product_id(&self, article: &str) -> Option<ProductId> {
        self.data
            .read()
            .await
            .products
            .values()
            .find(|p| p.article == article)
            .map(|p| p.id)
    }
}

fn load_seed(data: &mut MemoryData, seed: &CatalogSeed) -> Result<SeedSummary, RepositoryError> {
    seed.validate()?;

    for email in &seed.users {
        let next = UserId::new(
            i32::try_from(data.users.len() + 1)
                .map_err(|_| RepositoryError::DataCorruption("too many users".to_owned()))?,
        );
        data.users.entry(email.clone()).or_insert(next);
    }

    for category in &seed.categories {
        let id = CategoryId::new(next_index(&data.categories)?);
        data.categories.push(Category {
            id,
            name: category.name.clone(),
            slug: category.slug.clone(),
        });
    }
    for collection in &seed.collections {
        let id = CollectionId::new(next_index(&data.collections)?);
        data.collections.push(Collection {
            id,
            name: collection.name.clone(),
            slug: collection.slug.clone(),
            image: collection.image.clone(),
        });
    }
    for name in &seed.colors {
        let id = ColorId::new(next_index(&data.colors)?);
        data.colors.push(Color {
            id,
            name: name.clone(),
        });
    }
    for name in &seed.materials {
        let id = MaterialId::new(next_index(&data.materials)?);
        data.materials.push(Material {
            id,
            name: name.clone(),
        });
    }
    for name in &seed.delivery_types {
        let id = DeliveryTypeId::new(next_index(&data.delivery_types)?);
        data.delivery_types.push(DeliveryType {
            id,
            name: name.clone(),
        });
    }

    let material = |name: Option<&String>, materials: &[Material]| {
        name.and_then(|n| materials.iter().find(|m| &m.name == n))
            .cloned()
    };

    for product in &seed.products {
        let id = ProductId::new(next_id(&data.products));
        let category = data
            .categories
            .iter()
            .find(|c| c.slug == product.category)
            .cloned()
            .ok_or_else(|| RepositoryError::DataCorruption(product.category.clone()))?;

        data.products.insert(
            id,
            Product {
                id,
                article: product.article.clone(),
                name: product.name.clone(),
                product_type: product.product_type.clone(),
                category,
                collection: product.collection.as_ref().and_then(|slug| {
                    data.collections.iter().find(|c| &c.slug == slug).cloned()
                }),
                color: product
                    .color
                    .as_ref()
                    .and_then(|name| data.colors.iter().find(|c| &c.name == name).cloned()),
                material: material(product.material.as_ref(), &data.materials),
                legs_material: material(product.legs_material.as_ref(), &data.materials),
                brand: product.brand.clone(),
                country: product.country.clone(),
                width: product.width,
                height: product.height,
                length: product.length,
                weight: product.weight,
                warranty: product.warranty,
                fast_delivery: product.fast_delivery,
                description: product.description.clone(),
                price: product.price,
                details: product.details.clone(),
                images: product.images.clone(),
                available_quantity: product.stock,
                rating: None,
                discounts: Vec::new(),
            },
        );
    }

    for discount in &seed.discounts {
        let value = Discount {
            id: DiscountId::new(next_index(&data.discounts)?),
            discount: discount.discount,
            created_at: discount.created_at,
            end_at: discount.end_at,
        };
        for product in data.products.values_mut() {
            if discount.products.contains(&product.article) {
                product.discounts.push(value.clone());
            }
        }
        data.discounts.push(value);
    }

    Ok(SeedSummary {
        users: seed.users.len(),
        categories: seed.categories.len(),
        products: seed.products.len(),
        discounts: seed.discounts.len(),
    })
}

#[async_trait]
impl CatalogRepository for MemoryStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        Ok(self.data.read().await.product(id))
    }

    async fn products_by_ids(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
        let data = self.data.read().await;
        let wanted: BTreeSet<ProductId> = ids.iter().copied().collect();
        Ok(wanted.into_iter().filter_map(|id| data.product(id)).collect())
    }

    async fn list_products(&self, _filter: &CatalogFilter) -> Result<Vec<Product>, RepositoryError> {
        let data = self.data.read().await;
        Ok(data
            .products
            .keys()
            .filter_map(|id| data.product(*id))
            .collect())
    }

    async fn best_sellers(&self, limit: i64) -> Result<Vec<ProductId>, RepositoryError> {
        let data = self.data.read().await;
        let mut sold: HashMap<ProductId, u64> = HashMap::new();
        for line in data.orders.values().flat_map(|o| &o.lines) {
            *sold.entry(line.product_id).or_default() += u64::from(line.quantity.get());
        }

        let mut ranked: Vec<(ProductId, u64)> = sold.into_iter().filter(|(_, q)| *q > 0).collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

        let limit = usize::try_from(limit).unwrap_or(0);
        Ok(ranked.into_iter().take(limit).map(|(id, _)| id).collect())
    }

    async fn list_categories(&self) -> Result<Vec<Category>, RepositoryError> {
        Ok(self.data.read().await.categories.clone())
    }

    async fn get_category(&self, slug: &str) -> Result<Option<Category>, RepositoryError> {
        let data = self.data.read().await;
        Ok(data.categories.iter().find(|c| c.slug == slug).cloned())
    }

    async fn list_collections(&self) -> Result<Vec<Collection>, RepositoryError> {
        Ok(self.data.read().await.collections.clone())
    }

    async fn get_collection(&self, slug: &str) -> Result<Option<Collection>, RepositoryError> {
        let data = self.data.read().await;
        Ok(data.collections.iter().find(|c| c.slug == slug).cloned())
    }

    async fn list_colors(&self) -> Result<Vec<Color>, RepositoryError> {
        Ok(self.data.read().await.colors.clone())
    }

    async fn list_materials(&self) -> Result<Vec<Material>, RepositoryError> {
        Ok(self.data.read().await.materials.clone())
    }

    async fn list_discounts(&self) -> Result<Vec<Discount>, RepositoryError> {
        Ok(self.data.read().await.discounts.clone())
    }

    async fn list_brands(&self) -> Result<Vec<String>, RepositoryError> {
        let data = self.data.read().await;
        let brands: BTreeSet<String> = data
            .products
            .values()
            .filter_map(|p| p.brand.clone())
            .filter(|b| !b.is_empty())
            .collect();
        Ok(brands.into_iter().collect())
    }
}

#[async_trait]
impl CartRepository for MemoryStore {
    async fn cart_lines(&self, user: UserId) -> Result<Vec<CartLine>, RepositoryError> {
        let data = self.data.read().await;
        Ok(data
            .carts
            .get(&user)
            .map(|lines| {
                lines
                    .iter()
                    .map(|(product_id, quantity)| CartLine {
                        product_id: *product_id,
                        quantity: *quantity,
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn put_cart_line(
        &self,
        user: UserId,
        product: ProductId,
        quantity: Quantity,
    ) -> Result<(), RepositoryError> {
        let mut data = self.data.write().await;
        data.carts.entry(user).or_default().insert(product, quantity);
        Ok(())
    }

    async fn update_cart_line(
        &self,
        user: UserId,
        product: ProductId,
        quantity: Quantity,
    ) -> Result<bool, RepositoryError> {
        let mut data = self.data.write().await;
        Ok(data
            .carts
            .get_mut(&user)
            .and_then(|lines| lines.get_mut(&product))
            .map(|line| *line = quantity)
            .is_some())
    }

    async fn remove_cart_line(
        &self,
        user: UserId,
        product: ProductId,
    ) -> Result<(), RepositoryError> {
        let mut data = self.data.write().await;
        if let Some(lines) = data.carts.get_mut(&user) {
            lines.remove(&product);
        }
        Ok(())
    }

    async fn clear_cart(&self, user: UserId) -> Result<(), RepositoryError> {
        self.data.write().await.carts.remove(&user);
        Ok(())
    }
}

#[async_trait]
impl FavoriteRepository for MemoryStore {
    async fn favorite_ids(&self, user: UserId) -> Result<Vec<ProductId>, RepositoryError> {
        let data = self.data.read().await;
        Ok(data
            .favorites
            .get(&user)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default())
    }

    async fn add_favorite(&self, user: UserId, product: ProductId) -> Result<(), RepositoryError> {
        let mut data = self.data.write().await;
        data.favorites.entry(user).or_default().insert(product);
        Ok(())
    }

    async fn remove_favorite(
        &self,
        user: UserId,
        product: ProductId,
    ) -> Result<(), RepositoryError> {
        let mut data = self.data.write().await;
        if let Some(ids) = data.favorites.get_mut(&user) {
            ids.remove(&product);
        }
        Ok(())
    }
}

#[async_trait]
impl OrderRepository for MemoryStore {
    async fn list_delivery_types(&self) -> Result<Vec<DeliveryType>, RepositoryError> {
        Ok(self.data.read().await.delivery_types.clone())
    }

    async fn delivery_type_exists(&self, id: DeliveryTypeId) -> Result<bool, RepositoryError> {
        let data = self.data.read().await;
        Ok(data.delivery_types.iter().any(|t| t.id == id))
    }

    async fn get_delivery(&self, id: DeliveryId) -> Result<Option<Delivery>, RepositoryError> {
        Ok(self.data.read().await.deliveries.get(&id).cloned())
    }

    async fn create_delivery(&self, delivery: &NewDelivery) -> Result<Delivery, RepositoryError> {
        let mut data = self.data.write().await;
        let id = DeliveryId::new(next_id(&data.deliveries));
        let created = Delivery {
            id,
            address: delivery.address.clone(),
            type_delivery: delivery.type_delivery,
            datetime_from: delivery.datetime_from,
            datetime_to: delivery.datetime_to,
            elevator: delivery.elevator,
        };
        data.deliveries.insert(id, created.clone());
        Ok(created)
    }

    async fn create_order(&self, order: &NewOrder) -> Result<Order, RepositoryError> {
        let mut data = self.data.write().await;
        let id = OrderId::new(next_id(&data.orders));
        let now = Utc::now();

        let mut lines = Vec::with_capacity(order.lines.len());
        for line in &order.lines {
            data.next_order_product += 1;
            lines.push(OrderLine {
                id: OrderProductId::new(data.next_order_product),
                product_id: line.product_id,
                quantity: line.quantity,
                price: line.price,
            });
        }

        let created = Order {
            id,
            user_id: order.user_id,
            delivery_id: order.delivery_id,
            phone: order.phone.clone(),
            comment: order.comment.clone(),
            status: OrderStatus::Created,
            created_at: now,
            updated_at: now,
            lines,
        };
        data.orders.insert(id, created.clone());
        data.carts.remove(&order.user_id);
        Ok(created)
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        Ok(self.data.read().await.orders.get(&id).cloned())
    }

    async fn orders_for_user(&self, user: UserId) -> Result<Vec<Order>, RepositoryError> {
        let data = self.data.read().await;
        Ok(data
            .orders
            .values()
            .rev()
            .filter(|o| o.user_id == user)
            .cloned()
            .collect())
    }

    async fn mark_paid(&self, id: OrderId) -> Result<bool, RepositoryError> {
        let mut data = self.data.write().await;
        let Some(order) = data.orders.get_mut(&id) else {
            return Ok(false);
        };
        match order.status.pay() {
            Ok(status) => {
                order.status = status;
                order.updated_at = Utc::now();
                Ok(true)
            }
            Err(_) => Ok(false),
        }
    }

    async fn set_delivery(&self, id: OrderId, delivery: DeliveryId) -> Result<(), RepositoryError> {
        let mut data = self.data.write().await;
        let order = data.orders.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        order.delivery_id = delivery;
        order.updated_at = Utc::now();
        Ok(())
    }
}

#[async_trait]
impl ReviewRepository for MemoryStore {
    async fn list_reviews(
        &self,
        product: Option<ProductId>,
    ) -> Result<Vec<Review>, RepositoryError> {
        let data = self.data.read().await;
        Ok(data
            .reviews
            .values()
            .filter(|r| product.is_none_or(|p| r.product_id == p))
            .cloned()
            .collect())
    }

    async fn get_review(&self, id: ReviewId) -> Result<Option<Review>, RepositoryError> {
        Ok(self.data.read().await.reviews.get(&id).cloned())
    }

    async fn create_review(&self, review: &NewReview) -> Result<Review, RepositoryError> {
        let mut data = self.data.write().await;
        if data
            .reviews
            .values()
            .any(|r| r.user_id == review.user_id && r.product_id == review.product_id)
        {
            return Err(RepositoryError::Conflict(
                "product already reviewed by this user".to_owned(),
            ));
        }

        let id = ReviewId::new(next_id(&data.reviews));
        let now = Utc::now();
        let created = Review {
            id,
            user_id: review.user_id,
            product_id: review.product_id,
            rating: review.rating,
            text: review.text.clone(),
            created_at: now,
            updated_at: now,
        };
        data.reviews.insert(id, created.clone());
        Ok(created)
    }

    async fn update_review(
        &self,
        id: ReviewId,
        patch: &ReviewPatch,
    ) -> Result<Review, RepositoryError> {
        let mut data = self.data.write().await;
        let review = data.reviews.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        if let Some(rating) = patch.rating {
            review.rating = rating;
        }
        if let Some(text) = &patch.text {
            review.text.clone_from(text);
        }
        review.updated_at = Utc::now();
        Ok(review.clone())
    }

    async fn delete_review(&self, id: ReviewId) -> Result<(), RepositoryError> {
        self.data
            .write()
            .await
            .reviews
            .remove(&id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }
}

//! Unified cart and favorites.
//!
//! Anonymous visitors keep their cart in the session, logged-in users in the
//! database. [`CartService`] hides the difference: the backend is chosen once
//! from the caller's [`Identity`] and every operation returns the same view
//! shapes on both paths.
//!
//! The session-backed variant never touches the session itself. It mutates a
//! [`SessionCart`] value in memory; the handler persists it afterwards via
//! [`CartService::into_session_state`].

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::instrument;

use furnish_core::{ProductId, Quantity, UserId};

use super::CartError;
use super::catalog::{ProductView, product_views};
use crate::db::Store;
use crate::models::{CartLine, Identity, Product, SessionCart};

/// Storage for one visitor's cart and favorites.
#[async_trait]
pub trait CartBackend: Send + Sync {
    /// Lines ordered by product id.
    async fn lines(&self) -> Result<Vec<CartLine>, CartError>;

    /// Insert or overwrite a line.
    async fn put(&mut self, product: ProductId, quantity: Quantity) -> Result<(), CartError>;

    /// Overwrite an existing line; `false` if there is none.
    async fn update(&mut self, product: ProductId, quantity: Quantity) -> Result<bool, CartError>;

    async fn remove(&mut self, product: ProductId) -> Result<(), CartError>;

    async fn clear(&mut self) -> Result<(), CartError>;

    async fn favorites(&self) -> Result<BTreeSet<ProductId>, CartError>;

    async fn add_favorite(&mut self, product: ProductId) -> Result<(), CartError>;

    async fn remove_favorite(&mut self, product: ProductId) -> Result<(), CartError>;

    /// Session state to write back, for backends that keep one.
    fn into_session_state(self: Box<Self>) -> Option<SessionCart>;
}

/// Cart kept in the anonymous visitor's session.
#[derive(Debug, Default)]
pub struct SessionBackedCart {
    state: SessionCart,
}

impl SessionBackedCart {
    #[must_use]
    pub const fn new(state: SessionCart) -> Self {
        Self { state }
    }
}

#[async_trait]
impl CartBackend for SessionBackedCart {
    async fn lines(&self) -> Result<Vec<CartLine>, CartError> {
        Ok(self.state.lines())
    }

    async fn put(&mut self, product: ProductId, quantity: Quantity) -> Result<(), CartError> {
        self.state.put(product, quantity);
        Ok(())
    }

    async fn update(&mut self, product: ProductId, quantity: Quantity) -> Result<bool, CartError> {
        Ok(self.state.update(product, quantity))
    }

    async fn remove(&mut self, product: ProductId) -> Result<(), CartError> {
        self.state.remove(product);
        Ok(())
    }

    async fn clear(&mut self) -> Result<(), CartError> {
        self.state.cart.clear();
        Ok(())
    }

    async fn favorites(&self) -> Result<BTreeSet<ProductId>, CartError> {
        Ok(self.state.favorites.clone())
    }

    async fn add_favorite(&mut self, product: ProductId) -> Result<(), CartError> {
        self.state.favorites.insert(product);
        Ok(())
    }

    async fn remove_favorite(&mut self, product: ProductId) -> Result<(), CartError> {
        self.state.favorites.remove(&product);
        Ok(())
    }

    fn into_session_state(self: Box<Self>) -> Option<SessionCart> {
        Some(self.state)
    }
}

/// Cart kept in the database for a logged-in user.
pub struct StoreBackedCart<'a> {
    store: &'a dyn Store,
    user: UserId,
}

impl<'a> StoreBackedCart<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn Store, user: UserId) -> Self {
        Self { store, user }
    }
}

#[async_trait]
impl CartBackend for StoreBackedCart<'_> {
    async fn lines(&self) -> Result<Vec<CartLine>, CartError> {
        Ok(self.store.cart_lines(self.user).await?)
    }

    async fn put(&mut self, product: ProductId, quantity: Quantity) -> Result<(), CartError> {
        Ok(self.store.put_cart_line(self.user, product, quantity).await?)
    }

    async fn update(&mut self, product: ProductId, quantity: Quantity) -> Result<bool, CartError> {
        Ok(self
            .store
            .update_cart_line(self.user, product, quantity)
            .await?)
    }

    async fn remove(&mut self, product: ProductId) -> Result<(), CartError> {
        Ok(self.store.remove_cart_line(self.user, product).await?)
    }

    async fn clear(&mut self) -> Result<(), CartError> {
        Ok(self.store.clear_cart(self.user).await?)
    }

    async fn favorites(&self) -> Result<BTreeSet<ProductId>, CartError> {
        let ids = self.store.favorite_ids(self.user).await?;
        Ok(ids.into_iter().collect())
    }

    async fn add_favorite(&mut self, product: ProductId) -> Result<(), CartError> {
        Ok(self.store.add_favorite(self.user, product).await?)
    }

    async fn remove_favorite(&mut self, product: ProductId) -> Result<(), CartError> {
        Ok(self.store.remove_favorite(self.user, product).await?)
    }

    fn into_session_state(self: Box<Self>) -> Option<SessionCart> {
        None
    }
}

/// One cart line as returned to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartLineView {
    pub product: ProductView,
    pub quantity: Quantity,
}

/// Cart contents, identical in shape for anonymous and logged-in visitors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CartView {
    pub products: Vec<CartLineView>,
}

/// Favorite products.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FavoritesView {
    pub products: Vec<ProductView>,
}

/// Cart and favorites operations for one visitor.
pub struct CartService<'a> {
    store: &'a dyn Store,
    backend: Box<dyn CartBackend + 'a>,
}

impl<'a> CartService<'a> {
    /// Pick the backend for `identity`. `session` is only used for anonymous
    /// visitors.
    #[must_use]
    pub fn new(store: &'a dyn Store, identity: Identity, session: SessionCart) -> Self {
        let backend: Box<dyn CartBackend + 'a> = match identity {
            Identity::Anonymous => Box::new(SessionBackedCart::new(session)),
            Identity::User(user) => Box::new(StoreBackedCart::new(store, user)),
        };
        Self { store, backend }
    }

    /// Cart contents. Lines whose product no longer exists are dropped.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if the store fails.
    #[instrument(skip(self))]
    pub async fn get_cart(&self, now: DateTime<Utc>) -> Result<CartView, CartError> {
        let lines = self.backend.lines().await?;
        if lines.is_empty() {
            return Ok(CartView::default());
        }

        let ids: Vec<ProductId> = lines.iter().map(|l| l.product_id).collect();
        let products = self.store.products_by_ids(&ids).await?;
        let favorites = self.backend.favorites().await?;

        let products = lines
            .iter()
            .filter_map(|line| {
                products
                    .iter()
                    .find(|p| p.id == line.product_id)
                    .map(|p| CartLineView {
                        product: ProductView::new(p, favorites.contains(&p.id), now),
                        quantity: line.quantity,
                    })
            })
            .collect();

        Ok(CartView { products })
    }

    /// Add a product, overwriting the quantity if it is already in the cart.
    /// A missing quantity means one.
    ///
    /// # Errors
    ///
    /// Returns `CartError::InvalidQuantity` for a non-positive quantity,
    /// `CartError::ProductNotFound` for an unknown product and
    /// `CartError::InsufficientStock` when the storehouse holds less.
    #[instrument(skip(self))]
    pub async fn add_item(
        &mut self,
        product_id: ProductId,
        quantity: Option<i64>,
        now: DateTime<Utc>,
    ) -> Result<CartView, CartError> {
        let quantity = quantity.map_or(Ok(Quantity::ONE), Quantity::new)?;
        self.checked_product(product_id, quantity).await?;
        self.backend.put(product_id, quantity).await?;

        tracing::info!(product_id = %product_id, quantity = %quantity, "item added to cart");
        self.get_cart(now).await
    }

    /// Change the quantity of a product already in the cart.
    ///
    /// # Errors
    ///
    /// Same as [`CartService::add_item`], plus `CartError::NotInCart`.
    #[instrument(skip(self))]
    pub async fn update_quantity(
        &mut self,
        product_id: ProductId,
        quantity: i64,
        now: DateTime<Utc>,
    ) -> Result<CartView, CartError> {
        let quantity = Quantity::new(quantity)?;
        self.checked_product(product_id, quantity).await?;

        if !self.backend.update(product_id, quantity).await? {
            return Err(CartError::NotInCart(product_id));
        }
        self.get_cart(now).await
    }

    /// Remove a product. Removing a product that is not in the cart is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `CartError::ProductNotFound` if the product does not exist.
    #[instrument(skip(self))]
    pub async fn remove_item(
        &mut self,
        product_id: ProductId,
        now: DateTime<Utc>,
    ) -> Result<CartView, CartError> {
        self.product(product_id).await?;
        self.backend.remove(product_id).await?;
        self.get_cart(now).await
    }

    /// Empty the cart. Clearing an empty cart is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if the store fails.
    #[instrument(skip(self))]
    pub async fn clear(&mut self) -> Result<CartView, CartError> {
        self.backend.clear().await?;
        Ok(CartView::default())
    }

    /// Favorite product ids.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if the store fails.
    pub async fn favorite_ids(&self) -> Result<BTreeSet<ProductId>, CartError> {
        self.backend.favorites().await
    }

    /// Whether the visitor has favorited `product_id`.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if the store fails.
    pub async fn is_favorited(&self, product_id: ProductId) -> Result<bool, CartError> {
        Ok(self.backend.favorites().await?.contains(&product_id))
    }

    /// Favorite products that still exist, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if the store fails.
    #[instrument(skip(self))]
    pub async fn get_favorites(&self, now: DateTime<Utc>) -> Result<FavoritesView, CartError> {
        let favorites = self.backend.favorites().await?;
        if favorites.is_empty() {
            return Ok(FavoritesView::default());
        }

        let ids: Vec<ProductId> = favorites.iter().copied().collect();
        let products = self.store.products_by_ids(&ids).await?;
        Ok(FavoritesView {
            products: product_views(&products, &favorites, now),
        })
    }

    /// # Errors
    ///
    /// Returns `CartError::ProductNotFound` if the product does not exist.
    #[instrument(skip(self))]
    pub async fn add_favorite(
        &mut self,
        product_id: ProductId,
        now: DateTime<Utc>,
    ) -> Result<FavoritesView, CartError> {
        self.product(product_id).await?;
        self.backend.add_favorite(product_id).await?;
        self.get_favorites(now).await
    }

    /// Removing a product that is not a favorite is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if the store fails.
    #[instrument(skip(self))]
    pub async fn remove_favorite(
        &mut self,
        product_id: ProductId,
        now: DateTime<Utc>,
    ) -> Result<FavoritesView, CartError> {
        self.backend.remove_favorite(product_id).await?;
        self.get_favorites(now).await
    }

    /// Hand back the session state for anonymous visitors.
    #[must_use]
    pub fn into_session_state(self) -> Option<SessionCart> {
        self.backend.into_session_state()
    }

    async fn product(&self, product_id: ProductId) -> Result<Product, CartError> {
        self.store
            .get_product(product_id)
            .await?
            .ok_or(CartError::ProductNotFound(product_id))
    }

    /// Load the product and check the storehouse holds `quantity`. Stock is
    /// checked, not reserved.
    async fn checked_product(
        &self,
        product_id: ProductId,
        quantity: Quantity,
    ) -> Result<Product, CartError> {
        let product = self.product(product_id).await?;
        if i64::from(quantity.get()) > i64::from(product.available_quantity) {
            return Err(CartError::InsufficientStock {
                available: product.available_quantity.max(0),
            });
        }
        Ok(product)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::{CatalogSeed, MemoryStore};

    const SEED: &str = r#"
users: [buyer@example.com]
categories:
  - { name: Sofas, slug: sofas }
products:
  - { article: A, name: Oslo, category: sofas, price: "100", stock: 10 }
  - { article: B, name: Bergen, category: sofas, price: "50", stock: 1 }
  - { article: C, name: Lund, category: sofas, price: "75", stock: 10 }
  - { article: D, name: Malmo, category: sofas, price: "80", stock: 10 }
  - { article: E, name: Aarhus, category: sofas, price: "90", stock: 10 }
  - { article: F, name: Turku, category: sofas, price: "95", stock: 10 }
  - { article: G, name: Tromso, category: sofas, price: "60", stock: 10 }
"#;

    fn store() -> MemoryStore {
        MemoryStore::from_seed(&CatalogSeed::from_yaml(SEED).unwrap()).unwrap()
    }

    fn quantities(view: &CartView) -> Vec<(i32, u32)> {
        view.products
            .iter()
            .map(|l| (l.product.id.as_i32(), l.quantity.get()))
            .collect()
    }

    #[tokio::test]
    async fn test_anonymous_add_overwrites_then_remove_is_idempotent() {
        let store = store();
        let now = Utc::now();
        let mut cart = CartService::new(&store, Identity::Anonymous, SessionCart::default());
        let seven = ProductId::new(7);

        cart.add_item(seven, Some(2), now).await.unwrap();
        let view = cart.add_item(seven, Some(5), now).await.unwrap();
        assert_eq!(quantities(&view), vec![(7, 5)]);

        let view = cart.remove_item(seven, now).await.unwrap();
        assert!(view.products.is_empty());
        assert!(cart.remove_item(seven, now).await.is_ok());

        let state = cart.into_session_state().unwrap();
        assert!(state.cart.is_empty());
    }

    #[tokio::test]
    async fn test_user_add_twice_keeps_one_line() {
        let store = store();
        let now = Utc::now();
        let user = Identity::User(UserId::new(1));
        let mut cart = CartService::new(&store, user, SessionCart::default());

        cart.add_item(ProductId::new(1), None, now).await.unwrap();
        let view = cart.add_item(ProductId::new(1), Some(3), now).await.unwrap();
        assert_eq!(quantities(&view), vec![(1, 3)]);
        assert!(cart.into_session_state().is_none());
    }

    #[tokio::test]
    async fn test_both_paths_render_identical_views() {
        let store = store();
        let now = Utc::now();
        let mut anonymous = CartService::new(&store, Identity::Anonymous, SessionCart::default());
        let mut user = CartService::new(&store, Identity::User(UserId::new(1)), SessionCart::default());

        for cart in [&mut anonymous, &mut user] {
            cart.add_item(ProductId::new(3), Some(2), now).await.unwrap();
            cart.add_item(ProductId::new(1), Some(1), now).await.unwrap();
        }

        assert_eq!(
            anonymous.get_cart(now).await.unwrap(),
            user.get_cart(now).await.unwrap()
        );
    }

    #[tokio::test]
    async fn test_quantity_validation() {
        let store = store();
        let now = Utc::now();
        let mut cart = CartService::new(&store, Identity::Anonymous, SessionCart::default());

        let err = cart.add_item(ProductId::new(1), Some(0), now).await.unwrap_err();
        assert!(matches!(err, CartError::InvalidQuantity(_)));

        let err = cart.add_item(ProductId::new(2), Some(2), now).await.unwrap_err();
        assert!(matches!(err, CartError::InsufficientStock { available: 1 }));

        let err = cart.add_item(ProductId::new(99), None, now).await.unwrap_err();
        assert!(matches!(err, CartError::ProductNotFound(_)));
    }

    #[tokio::test]
    async fn test_update_requires_line() {
        let store = store();
        let now = Utc::now();
        let mut cart = CartService::new(&store, Identity::User(UserId::new(1)), SessionCart::default());

        let err = cart.update_quantity(ProductId::new(1), 2, now).await.unwrap_err();
        assert!(matches!(err, CartError::NotInCart(_)));

        cart.add_item(ProductId::new(1), None, now).await.unwrap();
        let view = cart.update_quantity(ProductId::new(1), 4, now).await.unwrap();
        assert_eq!(quantities(&view), vec![(1, 4)]);
    }

    #[tokio::test]
    async fn test_remove_unknown_product_is_not_found() {
        let store = store();
        let mut cart = CartService::new(&store, Identity::Anonymous, SessionCart::default());
        let err = cart.remove_item(ProductId::new(99), Utc::now()).await.unwrap_err();
        assert!(matches!(err, CartError::ProductNotFound(_)));
    }

    #[tokio::test]
    async fn test_clear_is_idempotent() {
        let store = store();
        let now = Utc::now();
        let mut cart = CartService::new(&store, Identity::User(UserId::new(1)), SessionCart::default());
        cart.add_item(ProductId::new(1), None, now).await.unwrap();

        assert!(cart.clear().await.unwrap().products.is_empty());
        assert!(cart.clear().await.unwrap().products.is_empty());
        assert!(cart.get_cart(now).await.unwrap().products.is_empty());
    }

    #[tokio::test]
    async fn test_vanished_products_are_dropped() {
        let store = store();
        let mut state = SessionCart::default();
        state.put(ProductId::new(1), Quantity::ONE);
        state.put(ProductId::new(404), Quantity::ONE);

        let cart = CartService::new(&store, Identity::Anonymous, state);
        let view = cart.get_cart(Utc::now()).await.unwrap();
        assert_eq!(quantities(&view), vec![(1, 1)]);
    }

    #[tokio::test]
    async fn test_favorites_mark_cart_products() {
        let store = store();
        let now = Utc::now();
        let mut cart = CartService::new(&store, Identity::Anonymous, SessionCart::default());

        cart.add_favorite(ProductId::new(1), now).await.unwrap();
        cart.add_favorite(ProductId::new(1), now).await.unwrap();
        let view = cart.add_item(ProductId::new(1), None, now).await.unwrap();
        assert!(view.products.iter().all(|l| l.product.is_favorited));

        let favorites = cart.remove_favorite(ProductId::new(1), now).await.unwrap();
        assert!(favorites.products.is_empty());
        assert!(cart.remove_favorite(ProductId::new(1), now).await.is_ok());
    }

    #[tokio::test]
    async fn test_is_favorited_on_both_paths() {
        let store = store();
        let now = Utc::now();

        for identity in [Identity::Anonymous, Identity::User(UserId::new(2))] {
            let mut cart = CartService::new(&store, identity, SessionCart::default());
            assert!(!cart.is_favorited(ProductId::new(3)).await.unwrap());

            cart.add_favorite(ProductId::new(3), now).await.unwrap();
            assert!(cart.is_favorited(ProductId::new(3)).await.unwrap());
            assert!(!cart.is_favorited(ProductId::new(4)).await.unwrap());

            cart.remove_favorite(ProductId::new(3), now).await.unwrap();
            assert!(!cart.is_favorited(ProductId::new(3)).await.unwrap());
        }
    }
}

//! End-to-end tests for the storefront API.
//!
//! Each test spawns the real router on an ephemeral port, backed by the
//! in-memory store seeded from [`CATALOG`], and talks to it over HTTP with a
//! cookie-keeping `reqwest` client. No database is needed.
//!
//! ```bash
//! cargo test -p furnish-integration-tests
//! ```
//!
//! Logging in goes through `GET /test/login/{user_id}`, a route that only
//! exists in this harness.

use std::sync::Arc;

use axum::{
    Router,
    extract::Path,
    http::StatusCode,
    routing::get,
};
use reqwest::Client;
use rust_decimal::Decimal;
use serde_json::Value;
use tower_sessions::Session;

use furnish_core::UserId;
use furnish_storefront::AppState;
use furnish_storefront::config::StorefrontConfig;
use furnish_storefront::db::{CatalogSeed, MemoryStore};
use furnish_storefront::middleware::set_current_user;
use furnish_storefront::models::CurrentUser;
use furnish_storefront::routes::{routes, with_layers};

/// Seed shared by every test.
///
/// Ids follow declaration order: users ann=1, bob=2; products 1..=7 as
/// listed; delivery types Courier=1, Pickup=2.
pub const CATALOG: &str = r#"
users: [ann@example.com, bob@example.com]
categories:
  - { name: Sofas, slug: sofas }
  - { name: Tables, slug: tables }
collections:
  - { name: Nordic, slug: nordic }
colors: [Grey, Blue]
materials: [Oak]
delivery_types: [Courier, Pickup]
products:
  - { article: SF-1, name: Oslo, category: sofas, color: Grey, collection: nordic, brand: Norrland, price: "100.00", stock: 10 }
  - { article: SF-2, name: Oslo, category: sofas, color: Blue, brand: Norrland, price: "120.00", stock: 10 }
  - { article: SF-3, name: Bergen, category: sofas, price: "300.00", stock: 0 }
  - { article: SF-4, name: Lund, category: sofas, collection: nordic, price: "250.00", stock: 3 }
  - { article: TB-1, name: Desk, category: tables, material: Oak, price: "50.00", stock: 10 }
  - { article: TB-2, name: Stool, category: tables, price: "40.00", stock: 1 }
  - { article: TB-3, name: Bench, category: tables, price: "80.00", stock: 10 }
discounts:
  - discount: "50"
    created_at: 2020-01-01T00:00:00Z
    end_at: 2099-12-31T23:59:59Z
    products: [SF-4]
"#;

/// A storefront running on a local port.
pub struct TestServer {
    pub base_url: String,
    pub store: Arc<MemoryStore>,
}

impl TestServer {
    /// Seed a memory store and serve the app on `127.0.0.1:0`.
    ///
    /// # Panics
    ///
    /// Panics if the seed or the listener cannot be set up.
    pub async fn spawn() -> Self {
        let seed = CatalogSeed::from_yaml(CATALOG).expect("test catalog is valid");
        let store = Arc::new(MemoryStore::from_seed(&seed).expect("test catalog loads"));

        let config = StorefrontConfig::from_lookup(|key| match key {
            "STOREFRONT_STORE" => Some("memory".to_owned()),
            "STOREFRONT_BASE_URL" => Some("http://localhost".to_owned()),
            _ => None,
        })
        .expect("test config is valid");

        let state = AppState::new(config, store.clone());
        let router: Router<AppState> = routes().route("/test/login/{id}", get(login));
        let app = with_layers(router, state, tower_sessions::MemoryStore::default());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind ephemeral port");
        let addr = listener.local_addr().expect("listener has an address");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            base_url: format!("http://{addr}"),
            store,
        }
    }

    /// Absolute URL for `path`.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// A new visitor with an empty cookie jar.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be built.
    #[must_use]
    pub fn visitor(&self) -> Client {
        Client::builder()
            .cookie_store(true)
            .build()
            .expect("Failed to create HTTP client")
    }

    /// A visitor logged in as `user_id`.
    ///
    /// # Panics
    ///
    /// Panics if the login request fails.
    pub async fn logged_in(&self, user_id: i32) -> Client {
        let client = self.visitor();
        let resp = client
            .get(self.url(&format!("/test/login/{user_id}")))
            .send()
            .await
            .expect("login request");
        assert_eq!(resp.status(), reqwest::StatusCode::NO_CONTENT);
        client
    }
}

async fn login(session: Session, Path(id): Path<i32>) -> StatusCode {
    let user = CurrentUser { id: UserId::new(id) };
    match set_current_user(&session, &user).await {
        Ok(()) => StatusCode::NO_CONTENT,
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Product ids of a JSON array of products.
#[must_use]
pub fn product_ids(products: &Value) -> Vec<i64> {
    products
        .as_array()
        .map(|items| items.iter().filter_map(|p| p["id"].as_i64()).collect())
        .unwrap_or_default()
}

/// Product ids and quantities of a cart view.
#[must_use]
pub fn cart_lines(cart: &Value) -> Vec<(i64, i64)> {
    cart["products"]
        .as_array()
        .map(|lines| {
            lines
                .iter()
                .filter_map(|l| Some((l["product"]["id"].as_i64()?, l["quantity"].as_i64()?)))
                .collect()
        })
        .unwrap_or_default()
}

/// Parse a money amount, which the API serializes as a string.
#[must_use]
pub fn money(value: &Value) -> Option<Decimal> {
    value.as_str().and_then(|s| s.parse().ok())
}

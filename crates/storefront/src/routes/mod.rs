//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                    - Liveness check
//! GET    /health/ready              - Readiness check (store reachable)
//!
//! # Catalog
//! GET    /api/products              - Filtered catalog
//! GET    /api/products/popular      - Best sellers
//! GET    /api/products/{id}         - Product detail with related products
//! GET    /api/categories[/{slug}]   - Categories
//! GET    /api/collections[/{slug}]  - Collections (detail lists products)
//! GET    /api/colors                - Colors
//! GET    /api/materials             - Materials
//! GET    /api/discounts             - Discounts
//! GET    /api/brands                - Distinct brands
//!
//! # Cart and favorites (anonymous or logged in)
//! GET    /api/carts/items           - Cart contents
//! POST   /api/carts/items           - Add (overwrites quantity)
//! DELETE /api/carts/items           - Clear
//! PATCH  /api/carts/items/{id}      - Change quantity
//! DELETE /api/carts/items/{id}      - Remove
//! GET    /api/favorites             - Favorites
//! POST   /api/favorites             - Add favorite
//! DELETE /api/favorites/{id}        - Remove favorite
//!
//! # Checkout
//! GET    /api/delivery_types        - Delivery types
//! POST   /api/deliveries            - Create delivery slot
//! GET    /api/deliveries/{id}       - Delivery slot
//! POST   /api/orders                - Place order from cart (requires auth)
//! GET    /api/orders                - Caller's orders (requires auth)
//! GET    /api/orders/{id}           - One order (owner only)
//!
//! # Reviews
//! GET    /api/reviews?product=      - Reviews
//! POST   /api/reviews               - Create (requires auth)
//! GET    /api/reviews/{id}          - Review
//! PATCH  /api/reviews/{id}          - Update (author only)
//! DELETE /api/reviews/{id}          - Delete (author only)
//! ```

pub mod cart;
pub mod favorites;
pub mod orders;
pub mod products;
pub mod reference;
pub mod reviews;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::{delete, get, patch, post},
};
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tower_sessions::{Session, SessionStore};
use tracing::Span;

use crate::error::Result;
use crate::middleware::{
    create_session_layer, load_session_cart, request_id_middleware, store_session_cart,
};
use crate::models::{Identity, SessionCart};
use crate::services::CartService;
use crate::state::AppState;

/// Cart service for the caller. The session cart is only read for anonymous
/// visitors.
pub(crate) async fn visitor_cart<'a>(
    state: &'a AppState,
    identity: Identity,
    session: &Session,
) -> Result<CartService<'a>> {
    let session_cart = if identity.is_authenticated() {
        SessionCart::default()
    } else {
        load_session_cart(session).await?
    };
    Ok(CartService::new(state.store(), identity, session_cart))
}

/// Write an anonymous visitor's cart back to the session.
pub(crate) async fn persist_visitor_cart(cart: CartService<'_>, session: &Session) -> Result<()> {
    if let Some(state) = cart.into_session_state() {
        store_session_cart(session, &state).await?;
    }
    Ok(())
}

/// Create the catalog routes router.
pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(products::index))
        .route("/products/popular", get(products::popular))
        .route("/products/{id}", get(products::show))
        .route("/categories", get(reference::categories))
        .route("/categories/{slug}", get(reference::category))
        .route("/collections", get(reference::collections))
        .route("/collections/{slug}", get(reference::collection))
        .route("/colors", get(reference::colors))
        .route("/materials", get(reference::materials))
        .route("/discounts", get(reference::discounts))
        .route("/brands", get(reference::brands))
}

/// Create the cart and favorites routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/carts/items",
            get(cart::show).post(cart::add).delete(cart::clear),
        )
        .route("/carts/items/{id}", patch(cart::update).delete(cart::remove))
        .route("/favorites", get(favorites::show).post(favorites::add))
        .route("/favorites/{id}", delete(favorites::remove))
}

/// Create the checkout routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/delivery_types", get(orders::delivery_types))
        .route("/deliveries", post(orders::create_delivery))
        .route("/deliveries/{id}", get(orders::delivery))
        .route("/orders", get(orders::index).post(orders::place))
        .route("/orders/{id}", get(orders::show))
}

/// Create the review routes router.
pub fn review_routes() -> Router<AppState> {
    Router::new()
        .route("/reviews", get(reviews::index).post(reviews::create))
        .route(
            "/reviews/{id}",
            get(reviews::show)
                .patch(reviews::update)
                .delete(reviews::delete),
        )
}

/// Create the JSON API router.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(catalog_routes())
        .merge(cart_routes())
        .merge(order_routes())
        .merge(review_routes())
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .nest("/api", api_routes())
}

/// Build the application: routes, sessions, request IDs and tracing.
///
/// Rate limiting and the Sentry layers are added by the binary.
pub fn app<S>(state: AppState, session_store: S) -> Router
where
    S: SessionStore + Clone,
{
    with_layers(routes(), state, session_store)
}

/// Wrap `router` in the session, request ID and tracing layers.
pub fn with_layers<S>(router: Router<AppState>, state: AppState, session_store: S) -> Router
where
    S: SessionStore + Clone,
{
    let session_layer = create_session_layer(session_store, state.config());

    router
        .layer(session_layer)
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        user_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the store is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.store().ping().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

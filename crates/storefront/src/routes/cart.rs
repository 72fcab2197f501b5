//! Cart route handlers.
//!
//! Every mutating handler returns the updated cart. Anonymous carts are
//! written back to the session after the service has run.

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use chrono::Utc;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use furnish_core::ProductId;

use super::{persist_visitor_cart, visitor_cart};
use crate::error::{Result, add_breadcrumb};
use crate::middleware::OptionalAuth;
use crate::services::CartView;
use crate::state::AppState;

/// Body of `POST /api/carts/items`.
#[derive(Debug, Deserialize)]
pub struct AddItem {
    pub product: ProductId,
    /// Defaults to one.
    #[serde(default)]
    pub quantity: Option<i64>,
}

/// Body of `PATCH /api/carts/items/{id}`.
#[derive(Debug, Deserialize)]
pub struct UpdateItem {
    pub quantity: i64,
}

/// `GET /api/carts/items`
#[instrument(skip(state, session))]
pub async fn show(
    State(state): State<AppState>,
    OptionalAuth(identity): OptionalAuth,
    session: Session,
) -> Result<Json<CartView>> {
    let cart = visitor_cart(&state, identity, &session).await?;
    Ok(Json(cart.get_cart(Utc::now()).await?))
}

/// `POST /api/carts/items`
#[instrument(skip(state, session, body))]
pub async fn add(
    State(state): State<AppState>,
    OptionalAuth(identity): OptionalAuth,
    session: Session,
    body: std::result::Result<Json<AddItem>, JsonRejection>,
) -> Result<(StatusCode, Json<CartView>)> {
    let Json(body) = body?;
    let mut cart = visitor_cart(&state, identity, &session).await?;
    let view = cart.add_item(body.product, body.quantity, Utc::now()).await?;
    persist_visitor_cart(cart, &session).await?;

    add_breadcrumb(
        "cart",
        "Item added",
        Some(&[("product_id", &body.product.to_string())]),
    );
    Ok((StatusCode::CREATED, Json(view)))
}

/// `PATCH /api/carts/items/{id}`
#[instrument(skip(state, session, body))]
pub async fn update(
    State(state): State<AppState>,
    OptionalAuth(identity): OptionalAuth,
    session: Session,
    Path(product): Path<ProductId>,
    body: std::result::Result<Json<UpdateItem>, JsonRejection>,
) -> Result<Json<CartView>> {
    let Json(body) = body?;
    let mut cart = visitor_cart(&state, identity, &session).await?;
    let view = cart
        .update_quantity(product, body.quantity, Utc::now())
        .await?;
    persist_visitor_cart(cart, &session).await?;
    Ok(Json(view))
}

/// `DELETE /api/carts/items/{id}`
#[instrument(skip(state, session))]
pub async fn remove(
    State(state): State<AppState>,
    OptionalAuth(identity): OptionalAuth,
    session: Session,
    Path(product): Path<ProductId>,
) -> Result<Json<CartView>> {
    let mut cart = visitor_cart(&state, identity, &session).await?;
    let view = cart.remove_item(product, Utc::now()).await?;
    persist_visitor_cart(cart, &session).await?;
    Ok(Json(view))
}

/// `DELETE /api/carts/items`
#[instrument(skip(state, session))]
pub async fn clear(
    State(state): State<AppState>,
    OptionalAuth(identity): OptionalAuth,
    session: Session,
) -> Result<Json<CartView>> {
    let mut cart = visitor_cart(&state, identity, &session).await?;
    let view = cart.clear().await?;
    persist_visitor_cart(cart, &session).await?;
    Ok(Json(view))
}

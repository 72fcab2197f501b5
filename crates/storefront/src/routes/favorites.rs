//! Favorites route handlers.

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
use crate::error::Result;
use crate::middleware::OptionalAuth;
use crate::services::FavoritesView;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AddFavorite {
    pub product: ProductId,
}

#[instrument(skip(state, session))]
pub async fn show(
    State(state): State<AppState>,
    OptionalAuth(identity): OptionalAuth,
    session: Session,
) -> Result<Json<FavoritesView>> {
    let cart = visitor_cart(&state, identity, &session).await?;
    Ok(Json(cart.get_favorites(Utc::now()).await?))
}

#[instrument(skip(state, session, body))]
pub async fn add(
    State(state): State<AppState>,
    OptionalAuth(identity): OptionalAuth,
    session: Session,
    body: std::result::Result<Json<AddFavorite>, JsonRejection>,
) -> Result<(StatusCode, Json<FavoritesView>)> {
    let Json(body) = body?;
    let mut cart = visitor_cart(&state, identity, &session).await?;
    let view = cart.add_favorite(body.product, Utc::now()).await?;
    persist_visitor_cart(cart, &session).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

#[instrument(skip(state, session))]
pub async fn remove(
    State(state): State<AppState>,
    OptionalAuth(identity): OptionalAuth,
    session: Session,
    Path(product): Path<ProductId>,
) -> Result<Json<FavoritesView>> {
    let mut cart = visitor_cart(&state, identity, &session).await?;
    let view = cart.remove_favorite(product, Utc::now()).await?;
    persist_visitor_cart(cart, &session).await?;
    Ok(Json(view))
}

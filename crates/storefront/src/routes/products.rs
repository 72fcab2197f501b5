//! Catalog route handlers.

use axum::{
    Json,
    extract::{Path, RawQuery, State},
};
use chrono::Utc;
use tower_sessions::Session;
use tracing::instrument;

use furnish_core::ProductId;

use super::visitor_cart;
use crate::error::Result;
use crate::middleware::OptionalAuth;
use crate::models::CatalogFilter;
use crate::services::catalog::product_views;
use crate::services::{CatalogError, CatalogService, ProductDetailView, ProductView};
use crate::state::AppState;

/// `GET /api/products` - filtered catalog.
#[instrument(skip(state, session))]
pub async fn index(
    State(state): State<AppState>,
    OptionalAuth(identity): OptionalAuth,
    session: Session,
    RawQuery(query): RawQuery,
) -> Result<Json<Vec<ProductView>>> {
    let filter =
        CatalogFilter::from_query(query.as_deref().unwrap_or_default()).map_err(CatalogError::from)?;
    let favorites = visitor_cart(&state, identity, &session)
        .await?
        .favorite_ids()
        .await?;

    let now = Utc::now();
    let catalog = CatalogService::new(state.store(), state.config().brand_match);
    let products = catalog
        .filter_catalog(filter, identity, &favorites, now)
        .await?;
    Ok(Json(product_views(&products, &favorites, now)))
}

/// `GET /api/products/popular` - best sellers.
#[instrument(skip(state, session))]
pub async fn popular(
    State(state): State<AppState>,
    OptionalAuth(identity): OptionalAuth,
    session: Session,
) -> Result<Json<Vec<ProductView>>> {
    let favorites = visitor_cart(&state, identity, &session)
        .await?
        .favorite_ids()
        .await?;
    let catalog = CatalogService::new(state.store(), state.config().brand_match);
    let products = catalog
        .popular(state.config().popular_limit, &favorites, Utc::now())
        .await?;
    Ok(Json(products))
}

/// `GET /api/products/{id}` - product page with related products.
#[instrument(skip(state, session))]
pub async fn show(
    State(state): State<AppState>,
    OptionalAuth(identity): OptionalAuth,
    session: Session,
    Path(id): Path<ProductId>,
) -> Result<Json<ProductDetailView>> {
    let favorites = visitor_cart(&state, identity, &session)
        .await?
        .favorite_ids()
        .await?;
    let catalog = CatalogService::new(state.store(), state.config().brand_match);
    Ok(Json(catalog.product_detail(id, &favorites, Utc::now()).await?))
}

//! Reference data: categories, collections, colors, materials, discounts and
//! brands.

use axum::{
    Json,
    extract::{Path, State},
};
use chrono::Utc;
use tower_sessions::Session;
use tracing::instrument;

use furnish_core::Discount;

use super::visitor_cart;
use crate::error::Result;
use crate::middleware::OptionalAuth;
use crate::models::{Category, Collection, Color, Material};
use crate::services::CatalogService;
use crate::services::catalog::CollectionDetailView;
use crate::state::AppState;

fn catalog(state: &AppState) -> CatalogService<'_> {
    CatalogService::new(state.store(), state.config().brand_match)
}

pub async fn categories(State(state): State<AppState>) -> Result<Json<Vec<Category>>> {
    Ok(Json(catalog(&state).categories().await?))
}

pub async fn category(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<Category>> {
    Ok(Json(catalog(&state).category(&slug).await?))
}

pub async fn collections(State(state): State<AppState>) -> Result<Json<Vec<Collection>>> {
    Ok(Json(catalog(&state).collections().await?))
}

/// `GET /api/collections/{slug}` - the collection and its products.
#[instrument(skip(state, session))]
pub async fn collection(
    State(state): State<AppState>,
    OptionalAuth(identity): OptionalAuth,
    session: Session,
    Path(slug): Path<String>,
) -> Result<Json<CollectionDetailView>> {
    let favorites = visitor_cart(&state, identity, &session)
        .await?
        .favorite_ids()
        .await?;
    Ok(Json(
        catalog(&state)
            .collection(&slug, &favorites, Utc::now())
            .await?,
    ))
}

pub async fn colors(State(state): State<AppState>) -> Result<Json<Vec<Color>>> {
    Ok(Json(catalog(&state).colors().await?))
}

pub async fn materials(State(state): State<AppState>) -> Result<Json<Vec<Material>>> {
    Ok(Json(catalog(&state).materials().await?))
}

pub async fn discounts(State(state): State<AppState>) -> Result<Json<Vec<Discount>>> {
    Ok(Json(catalog(&state).discounts().await?))
}

pub async fn brands(State(state): State<AppState>) -> Result<Json<Vec<String>>> {
    Ok(Json(catalog(&state).brands().await?))
}

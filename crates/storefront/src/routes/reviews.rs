//! Review route handlers.

use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
};
use serde::Deserialize;
use tracing::instrument;

use furnish_core::{ProductId, ReviewId};

use crate::error::Result;
use crate::middleware::OptionalAuth;
use crate::models::Review;
use crate::services::{CreateReview, ReviewService, UpdateReview};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ReviewQuery {
    pub product: Option<ProductId>,
}

pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<ReviewQuery>,
) -> Result<Json<Vec<Review>>> {
    Ok(Json(ReviewService::new(state.store()).list(query.product).await?))
}

pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<ReviewId>,
) -> Result<Json<Review>> {
    Ok(Json(ReviewService::new(state.store()).get(id).await?))
}

#[instrument(skip(state, body))]
pub async fn create(
    State(state): State<AppState>,
    OptionalAuth(identity): OptionalAuth,
    body: std::result::Result<Json<CreateReview>, JsonRejection>,
) -> Result<(StatusCode, Json<Review>)> {
    let Json(body) = body?;
    let review = ReviewService::new(state.store())
        .create(identity, body)
        .await?;
    Ok((StatusCode::CREATED, Json(review)))
}

#[instrument(skip(state, body))]
pub async fn update(
    State(state): State<AppState>,
    OptionalAuth(identity): OptionalAuth,
    Path(id): Path<ReviewId>,
    body: std::result::Result<Json<UpdateReview>, JsonRejection>,
) -> Result<Json<Review>> {
    let Json(body) = body?;
    let review = ReviewService::new(state.store())
        .update(identity, id, body)
        .await?;
    Ok(Json(review))
}

#[instrument(skip(state))]
pub async fn delete(
    State(state): State<AppState>,
    OptionalAuth(identity): OptionalAuth,
    Path(id): Path<ReviewId>,
) -> Result<StatusCode> {
    ReviewService::new(state.store()).delete(identity, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

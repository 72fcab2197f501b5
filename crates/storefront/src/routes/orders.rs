//! Checkout, delivery and order history handlers.

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use chrono::Utc;
use tracing::instrument;

use furnish_core::{DeliveryId, OrderId};

use crate::error::Result;
use crate::middleware::{OptionalAuth, RequireAuth};
use crate::models::{Delivery, DeliveryType, Identity, NewDelivery};
use crate::services::{OrderService, OrderView, PlaceOrder};
use crate::state::AppState;

pub async fn delivery_types(State(state): State<AppState>) -> Result<Json<Vec<DeliveryType>>> {
    Ok(Json(OrderService::new(state.store()).delivery_types().await?))
}

/// `POST /api/deliveries`
#[instrument(skip(state, body))]
pub async fn create_delivery(
    State(state): State<AppState>,
    body: std::result::Result<Json<NewDelivery>, JsonRejection>,
) -> Result<(StatusCode, Json<Delivery>)> {
    let Json(body) = body?;
    let delivery = OrderService::new(state.store()).create_delivery(&body).await?;
    Ok((StatusCode::CREATED, Json(delivery)))
}

pub async fn delivery(
    State(state): State<AppState>,
    Path(id): Path<DeliveryId>,
) -> Result<Json<Delivery>> {
    Ok(Json(OrderService::new(state.store()).get_delivery(id).await?))
}

/// `POST /api/orders` - turn the caller's cart into an order.
#[instrument(skip(state, body))]
pub async fn place(
    State(state): State<AppState>,
    OptionalAuth(identity): OptionalAuth,
    body: std::result::Result<Json<PlaceOrder>, JsonRejection>,
) -> Result<(StatusCode, Json<OrderView>)> {
    let Json(body) = body?;
    let order = OrderService::new(state.store())
        .place_order(identity, body, Utc::now())
        .await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// `GET /api/orders` - the caller's orders, newest first.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<OrderView>>> {
    let orders = OrderService::new(state.store())
        .my_orders(Identity::User(user))
        .await?;
    Ok(Json(orders))
}

#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<OrderId>,
) -> Result<Json<OrderView>> {
    let order = OrderService::new(state.store())
        .get_order(Identity::User(user), id)
        .await?;
    Ok(Json(order))
}

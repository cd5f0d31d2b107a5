//! Order endpoints: checkout, history, cancellation and reorder.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::{OrderId, OrderStatus};
use domain::PlaceOrder;
use serde::Serialize;
use store::{OrderDetails, Store};

use super::parse_id;
use crate::AppState;
use crate::error::ApiError;
use crate::extract::Session;

#[derive(Serialize)]
pub struct OrderCreatedResponse {
    pub success: bool,
    pub order_id: OrderId,
}

#[derive(Serialize)]
pub struct OrderStatusResponse {
    pub success: bool,
    pub status: OrderStatus,
}

#[derive(Serialize)]
pub struct ReorderResponse {
    pub success: bool,
    pub lines_added: usize,
}

/// POST /orders: turn the caller's cart into an order.
#[tracing::instrument(skip(state, ctx, cmd))]
pub async fn create<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Session(ctx): Session,
    Json(cmd): Json<PlaceOrder>,
) -> Result<(StatusCode, Json<OrderCreatedResponse>), ApiError> {
    let order = state.orders.place_order(&ctx, cmd).await?;

    Ok((
        StatusCode::CREATED,
        Json(OrderCreatedResponse {
            success: true,
            order_id: order.id,
        }),
    ))
}

/// GET /orders: the caller's orders, newest first.
pub async fn list<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Session(ctx): Session,
) -> Result<Json<Vec<OrderDetails>>, ApiError> {
    Ok(Json(state.orders.list_orders(&ctx).await?))
}

/// GET /orders/{id}
#[tracing::instrument(skip(state, ctx))]
pub async fn get<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Session(ctx): Session,
    Path(id): Path<String>,
) -> Result<Json<OrderDetails>, ApiError> {
    let order_id: OrderId = parse_id(&id, "order")?;
    state
        .orders
        .get_order(&ctx, order_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Order not found".to_string()))
}

/// POST /orders/{id}/cancel
#[tracing::instrument(skip(state, ctx))]
pub async fn cancel<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Session(ctx): Session,
    Path(id): Path<String>,
) -> Result<Json<OrderStatusResponse>, ApiError> {
    let order_id: OrderId = parse_id(&id, "order")?;
    let order = state.orders.cancel_order(&ctx, order_id).await?;

    Ok(Json(OrderStatusResponse {
        success: true,
        status: order.status,
    }))
}

/// POST /orders/{id}/reorder
#[tracing::instrument(skip(state, ctx))]
pub async fn reorder<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Session(ctx): Session,
    Path(id): Path<String>,
) -> Result<Json<ReorderResponse>, ApiError> {
    let order_id: OrderId = parse_id(&id, "order")?;
    let merged = state.orders.reorder_items(&ctx, order_id).await?;

    Ok(Json(ReorderResponse {
        success: true,
        lines_added: merged.len(),
    }))
}

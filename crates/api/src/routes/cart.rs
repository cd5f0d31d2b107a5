//! Cart endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::CartItemId;
use domain::{AddToCart, CartSummary, UpdateCartItem};
use serde::{Deserialize, Serialize};
use store::Store;

use super::{SuccessResponse, parse_id};
use crate::AppState;
use crate::error::ApiError;
use crate::extract::Session;

#[derive(Deserialize)]
pub struct UpdateQuantityRequest {
    pub quantity: i64,
}

#[derive(Serialize)]
pub struct CartItemResponse {
    pub success: bool,
    pub cart_item_id: CartItemId,
    pub quantity: u32,
}

#[derive(Serialize)]
pub struct ClearedResponse {
    pub success: bool,
    pub removed: u64,
}

/// GET /cart: the caller's priced cart, empty when signed out.
pub async fn get<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Session(ctx): Session,
) -> Result<Json<CartSummary>, ApiError> {
    Ok(Json(state.cart.summary(&ctx).await?))
}

/// POST /cart/items
#[tracing::instrument(skip(state, ctx))]
pub async fn add<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Session(ctx): Session,
    Json(cmd): Json<AddToCart>,
) -> Result<(StatusCode, Json<CartItemResponse>), ApiError> {
    let item = state.cart.add(&ctx, cmd).await?;

    Ok((
        StatusCode::CREATED,
        Json(CartItemResponse {
            success: true,
            cart_item_id: item.id,
            quantity: item.quantity,
        }),
    ))
}

/// PATCH /cart/items/{id}
#[tracing::instrument(skip(state, ctx, req))]
pub async fn update<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Session(ctx): Session,
    Path(id): Path<String>,
    Json(req): Json<UpdateQuantityRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let cart_item_id: CartItemId = parse_id(&id, "cart item")?;
    state
        .cart
        .update_quantity(&ctx, UpdateCartItem::new(cart_item_id, req.quantity))
        .await?;
    Ok(Json(SuccessResponse::ok()))
}

/// DELETE /cart/items/{id}
#[tracing::instrument(skip(state, ctx))]
pub async fn remove<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Session(ctx): Session,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let cart_item_id: CartItemId = parse_id(&id, "cart item")?;
    state.cart.remove(&ctx, cart_item_id).await?;
    Ok(Json(SuccessResponse::ok()))
}

/// DELETE /cart
pub async fn clear<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Session(ctx): Session,
) -> Result<Json<ClearedResponse>, ApiError> {
    let removed = state.cart.clear(&ctx).await?;
    Ok(Json(ClearedResponse {
        success: true,
        removed,
    }))
}

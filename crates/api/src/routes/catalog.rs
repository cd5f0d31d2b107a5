//! Catalog browsing endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use common::ProductId;
use domain::{PriceRange, ProductFilter};
use serde::Deserialize;
use store::{Category, ProductDetails, Store};

use super::parse_id;
use crate::AppState;
use crate::error::ApiError;

#[derive(Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
}

/// GET /categories
pub async fn categories<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<Category>>, ApiError> {
    Ok(Json(state.catalog.list_categories().await?))
}

/// GET /products
#[tracing::instrument(skip(state))]
pub async fn list<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Query(filter): Query<ProductFilter>,
) -> Result<Json<Vec<ProductDetails>>, ApiError> {
    Ok(Json(state.catalog.list_products(&filter).await?))
}

/// GET /products/featured
pub async fn featured<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<ProductDetails>>, ApiError> {
    Ok(Json(state.catalog.featured_products().await?))
}

/// GET /products/search?q=
pub async fn search<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<ProductDetails>>, ApiError> {
    Ok(Json(state.catalog.search_products(&params.q).await?))
}

/// GET /products/price-range
pub async fn price_range<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<PriceRange>, ApiError> {
    Ok(Json(state.catalog.price_range().await?))
}

/// GET /products/{id}
#[tracing::instrument(skip(state))]
pub async fn get<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<ProductDetails>, ApiError> {
    let product_id: ProductId = parse_id(&id, "product")?;
    state
        .catalog
        .get_product(product_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Product not found".to_string()))
}

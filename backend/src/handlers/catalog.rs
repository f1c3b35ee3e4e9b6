//! HTTP handlers for products and bottle types

use axum::{
    extract::{Path, State},
    Json,
};
use shared::{BottleType, Product};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::{CatalogService, RatioService};
use crate::AppState;

/// List active products
pub async fn list_products(
    State(state): State<AppState>,
    _current_user: CurrentUser,
) -> AppResult<Json<Vec<Product>>> {
    let service = CatalogService::new(state.db);
    Ok(Json(service.list_products().await?))
}

/// Get a product
pub async fn get_product(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<Product>> {
    let service = CatalogService::new(state.db);
    Ok(Json(service.get_product(product_id).await?))
}

/// List active bottle types
pub async fn list_bottle_types(
    State(state): State<AppState>,
    _current_user: CurrentUser,
) -> AppResult<Json<Vec<BottleType>>> {
    let service = CatalogService::new(state.db);
    Ok(Json(service.list_bottle_types().await?))
}

/// Recompute a product's material ratios from its completed batches
pub async fn refresh_product_ratios(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<Product>> {
    current_user.0.require("catalog", "write")?;
    let service = RatioService::new(state.db);
    Ok(Json(service.refresh_product_ratios(product_id).await?))
}

//! HTTP handlers for inventory ledger reads

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use shared::{InventoryBatch, InventoryMovement};

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::inventory::{InventoryBatchQuery, InventoryService, MaterialAvailability};
use crate::AppState;

/// List inventory batches
pub async fn list_inventory_batches(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<InventoryBatchQuery>,
) -> AppResult<Json<Vec<InventoryBatch>>> {
    current_user.0.require("inventory", "read")?;
    let service = InventoryService::new(state.db);
    let batches = service.list_batches(&query).await?;
    Ok(Json(batches))
}

/// Remaining stock per material
pub async fn material_availability(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<MaterialAvailability>>> {
    current_user.0.require("inventory", "read")?;
    let service = InventoryService::new(state.db);
    let availability = service
        .material_availability(current_user.0.can_view_costs())
        .await?;
    Ok(Json(availability))
}

#[derive(Debug, Deserialize)]
pub struct MovementQuery {
    pub reference: String,
}

/// Movements for a reference (production batch code)
pub async fn list_movements(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<MovementQuery>,
) -> AppResult<Json<Vec<InventoryMovement>>> {
    current_user.0.require("inventory", "read")?;
    let service = InventoryService::new(state.db);
    let movements = service.list_movements(&query.reference).await?;
    Ok(Json(movements))
}

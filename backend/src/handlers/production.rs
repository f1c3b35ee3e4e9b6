//! HTTP handlers for production planning and execution endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use shared::{InventoryMovement, ProductionBatch};

use crate::error::{AppError, AppResult};
use crate::middleware::{AuthUser, CurrentUser};
use crate::services::execution::{ExecuteInput, ExecutionResult};
use crate::services::planning::{
    BatchListQuery, CreatePlanInput, GenerateCodeInput, GeneratedBatchCode, PreviewInput,
    RequirementPreview, UpdatePlanInput,
};
use crate::services::{ExecutionService, InventoryService, PlanningService};
use crate::AppState;

fn planning_service(state: &AppState) -> PlanningService {
    PlanningService::new(state.db.clone(), state.config.production.clone())
}

fn require_production_read(user: &AuthUser) -> AppResult<()> {
    if user.has_any_permission(&[("production", "plan"), ("production", "execute")]) {
        Ok(())
    } else {
        Err(AppError::InsufficientPermissions)
    }
}

/// Preview material requirements for a bottle mix
pub async fn preview_requirements(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<PreviewInput>,
) -> AppResult<Json<RequirementPreview>> {
    current_user.0.require("production", "plan")?;
    let preview = planning_service(&state)
        .preview_requirements(input, current_user.0.can_view_costs())
        .await?;
    Ok(Json(preview))
}

/// Draw a batch code for the planning form
pub async fn generate_batch_code(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<GenerateCodeInput>,
) -> AppResult<Json<GeneratedBatchCode>> {
    current_user.0.require("production", "plan")?;
    let code = planning_service(&state).generate_batch_code(input).await?;
    Ok(Json(code))
}

/// Create a production plan
pub async fn create_plan(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreatePlanInput>,
) -> AppResult<(StatusCode, Json<ProductionBatch>)> {
    current_user.0.require("production", "plan")?;
    let batch = planning_service(&state)
        .create_plan(current_user.0.user_id, input, current_user.0.can_view_costs())
        .await?;
    Ok((StatusCode::CREATED, Json(batch)))
}

/// Revise a planned batch
pub async fn update_plan(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(batch_code): Path<String>,
    Json(input): Json<UpdatePlanInput>,
) -> AppResult<Json<ProductionBatch>> {
    current_user.0.require("production", "plan")?;
    let batch = planning_service(&state)
        .update_plan(&batch_code, input, current_user.0.can_view_costs())
        .await?;
    Ok(Json(batch))
}

/// Get a production batch
pub async fn get_batch(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(batch_code): Path<String>,
) -> AppResult<Json<ProductionBatch>> {
    require_production_read(&current_user.0)?;
    let batch = planning_service(&state)
        .get_batch(&batch_code, current_user.0.can_view_costs())
        .await?;
    Ok(Json(batch))
}

/// List production batches
pub async fn list_batches(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<BatchListQuery>,
) -> AppResult<Json<Vec<ProductionBatch>>> {
    require_production_read(&current_user.0)?;
    let batches = planning_service(&state)
        .list_batches(&query, current_user.0.can_view_costs())
        .await?;
    Ok(Json(batches))
}

/// Execute a planned batch
pub async fn execute_batch(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(batch_code): Path<String>,
    Json(input): Json<ExecuteInput>,
) -> AppResult<Json<ExecutionResult>> {
    current_user.0.require("production", "execute")?;
    let service = ExecutionService::new(state.db, state.config.production.currency.clone());
    let result = service
        .execute(
            &batch_code,
            current_user.0.user_id,
            input,
            current_user.0.can_view_costs(),
        )
        .await?;
    Ok(Json(result))
}

/// Inventory movements written by a batch's execution
pub async fn list_batch_movements(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(batch_code): Path<String>,
) -> AppResult<Json<Vec<InventoryMovement>>> {
    current_user.0.require("inventory", "read")?;
    let service = InventoryService::new(state.db);
    let movements = service.list_movements(&batch_code).await?;
    Ok(Json(movements))
}

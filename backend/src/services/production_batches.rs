//! Row mapping and lookups for the `production_batches` table

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{types::Json, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use shared::{
    BottleQuantities, PlannedMaterial, ProductionBatch, ProductionStatus, QualityTest,
};

/// Name of the unique constraint guarding batch codes
pub const BATCH_CODE_CONSTRAINT: &str = "production_batches_batch_code_key";

pub const PRODUCTION_BATCH_COLUMNS: &str = "id, batch_code, product_id, product_name, \
     production_date, planned_bottles, total_juice_liters, material_requirements, \
     total_estimated_cost, notes, status, planned_by, planned_at, updated_at, actual_bottles, \
     actual_materials_used, material_costs, material_cost, cost_per_liter, quality_tests, \
     production_notes, started_by, started_at, completed_by, completed_at";

/// Database row for production batch
#[derive(Debug, sqlx::FromRow)]
pub struct ProductionBatchRow {
    id: Uuid,
    batch_code: String,
    product_id: Uuid,
    product_name: String,
    production_date: NaiveDate,
    planned_bottles: Json<BottleQuantities>,
    total_juice_liters: Decimal,
    material_requirements: Json<BTreeMap<String, PlannedMaterial>>,
    total_estimated_cost: Option<Decimal>,
    notes: Option<String>,
    status: String,
    planned_by: Uuid,
    planned_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    actual_bottles: Option<Json<BottleQuantities>>,
    actual_materials_used: Option<Json<BTreeMap<String, Decimal>>>,
    material_costs: Option<Json<BTreeMap<String, Decimal>>>,
    material_cost: Option<Decimal>,
    cost_per_liter: Option<Decimal>,
    quality_tests: Option<Json<Vec<QualityTest>>>,
    production_notes: Option<String>,
    started_by: Option<Uuid>,
    started_at: Option<DateTime<Utc>>,
    completed_by: Option<Uuid>,
    completed_at: Option<DateTime<Utc>>,
}

impl From<ProductionBatchRow> for ProductionBatch {
    fn from(row: ProductionBatchRow) -> Self {
        ProductionBatch {
            id: row.id,
            batch_code: row.batch_code,
            product_id: row.product_id,
            product_name: row.product_name,
            production_date: row.production_date,
            planned_bottles: row.planned_bottles.0,
            total_juice_liters: row.total_juice_liters,
            material_requirements: row.material_requirements.0,
            total_estimated_cost: row.total_estimated_cost,
            notes: row.notes,
            // A completed row must never read back as editable
            status: ProductionStatus::from_str(&row.status).unwrap_or(ProductionStatus::Completed),
            planned_by: row.planned_by,
            planned_at: row.planned_at,
            updated_at: row.updated_at,
            actual_bottles: row.actual_bottles.map(|j| j.0),
            actual_materials_used: row.actual_materials_used.map(|j| j.0),
            material_costs: row.material_costs.map(|j| j.0),
            material_cost: row.material_cost,
            cost_per_liter: row.cost_per_liter,
            quality_tests: row.quality_tests.map(|j| j.0).unwrap_or_default(),
            production_notes: row.production_notes,
            started_by: row.started_by,
            started_at: row.started_at,
            completed_by: row.completed_by,
            completed_at: row.completed_at,
        }
    }
}

/// Load a batch by code
pub async fn find_by_code(db: &PgPool, batch_code: &str) -> AppResult<ProductionBatch> {
    let row = sqlx::query_as::<_, ProductionBatchRow>(&format!(
        "SELECT {} FROM production_batches WHERE batch_code = $1",
        PRODUCTION_BATCH_COLUMNS
    ))
    .bind(batch_code)
    .fetch_optional(db)
    .await?
    .ok_or_else(|| AppError::NotFound("Production batch".to_string()))?;

    Ok(row.into())
}

/// Whether any batch already uses `batch_code`
pub async fn code_exists(db: &PgPool, batch_code: &str) -> AppResult<bool> {
    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM production_batches WHERE batch_code = $1)",
    )
    .bind(batch_code)
    .fetch_one(db)
    .await?;

    Ok(exists)
}

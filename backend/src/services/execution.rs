//! Production execution: records the actual output of a planned batch and
//! draws the materials used from inventory, oldest stock first.
//!
//! The whole commit runs in one transaction. The batch row is claimed first
//! with a guarded status update so concurrent executions of the same batch
//! serialize, then each material's active inventory batches are locked in
//! material-name order before any stock is drawn.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::services::inventory::{apply_batch_update, insert_movement, lock_fifo_batches};
use crate::services::planning::visible;
use crate::services::production_batches::{ProductionBatchRow, PRODUCTION_BATCH_COLUMNS};
use crate::services::CatalogService;
use shared::{
    build_quality_tests, plan_execution, positive_quantities, total_bottles,
    validate_execution_request, validate_known_bottle_types, BottleQuantities, ExecutionContext,
    FifoAllocation, MaterialStock, ProductionBatch, ProductionStatus, QualityMeasurements,
};

/// Execution service for completing planned batches
#[derive(Clone)]
pub struct ExecutionService {
    db: PgPool,
    currency: String,
}

/// Input for executing a planned batch
#[derive(Debug, Deserialize, Validate)]
pub struct ExecuteInput {
    #[serde(default)]
    pub actual_bottles: BottleQuantities,
    #[serde(default)]
    pub actual_materials_used: BTreeMap<String, Decimal>,
    #[serde(default)]
    pub quality: QualityMeasurements,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
}

/// Stock drawn for one material
#[derive(Debug, Clone, Serialize)]
pub struct MaterialDrawSummary {
    pub material_type: String,
    pub requested: Decimal,
    pub allocated: Decimal,
    pub shortfall: Decimal,
    pub inventory_batches: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost: Option<Decimal>,
}

impl MaterialDrawSummary {
    fn new(allocation: &FifoAllocation, include_cost: bool) -> Self {
        Self {
            material_type: allocation.material_type.clone(),
            requested: allocation.requested,
            allocated: allocation.allocated,
            shortfall: allocation.shortfall(),
            inventory_batches: allocation
                .allocations
                .iter()
                .map(|a| a.batch_code.clone())
                .collect(),
            cost: include_cost.then_some(allocation.cost),
        }
    }
}

/// Result of executing a batch
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionResult {
    pub batch: ProductionBatch,
    pub materials: Vec<MaterialDrawSummary>,
    /// Materials whose stock ran out before the entered usage was covered
    pub shortfalls: BTreeMap<String, Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
}

impl ExecutionService {
    pub fn new(db: PgPool, currency: String) -> Self {
        Self { db, currency }
    }

    /// Complete a planned batch
    pub async fn execute(
        &self,
        batch_code: &str,
        actor: Uuid,
        input: ExecuteInput,
        include_cost: bool,
    ) -> AppResult<ExecutionResult> {
        input.validate()?;
        validate_execution_request(&input.actual_bottles, &input.actual_materials_used)?;

        let bottle_types = CatalogService::new(self.db.clone()).list_bottle_types().await?;
        validate_known_bottle_types("actual_bottles", &input.actual_bottles, &bottle_types)?;

        let now = Utc::now();
        let started_at = input.started_at.unwrap_or(now);

        let mut tx = self.db.begin().await?;

        let target = ProductionStatus::Completed;
        let claimable: Vec<&str> = ProductionStatus::sources_of(target)
            .iter()
            .map(ProductionStatus::as_str)
            .collect();

        // Claim the batch; zero rows means missing or already completed
        let claimed = sqlx::query_scalar::<_, Uuid>(
            r#"
            UPDATE production_batches
            SET status = $2, updated_at = $3
            WHERE batch_code = $1 AND status = ANY($4)
            RETURNING id
            "#,
        )
        .bind(batch_code)
        .bind(target.as_str())
        .bind(now)
        .bind(&claimable)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(batch_id) = claimed else {
            tracing::debug!(batch_code = %batch_code, "No batch could move to {}", target);
            return Err(AppError::NotFoundOrAlreadyExecuted(batch_code.to_string()));
        };

        // BTreeMap iteration gives the name order used for locking
        let mut stock = MaterialStock::new();
        for (material, quantity) in &input.actual_materials_used {
            if *quantity > Decimal::ZERO {
                let batches = lock_fifo_batches(&mut *tx, material).await?;
                stock.insert(material.clone(), batches);
            }
        }

        let ctx = ExecutionContext {
            batch_code,
            actor,
            at: now,
        };
        let plan = plan_execution(
            &ctx,
            &input.actual_materials_used,
            &stock,
            &bottle_types,
            &input.actual_bottles,
        );

        for update in &plan.batch_updates {
            apply_batch_update(&mut *tx, update, now).await?;
            if update.finished {
                tracing::info!(
                    inventory_batch_id = %update.inventory_batch_id,
                    batch_code = %batch_code,
                    "Inventory batch finished"
                );
            }
        }

        for movement in &plan.movements {
            insert_movement(&mut *tx, movement).await?;
        }

        let quality_tests = build_quality_tests(&input.quality, actor, now);

        let row = sqlx::query_as::<_, ProductionBatchRow>(&format!(
            r#"
            UPDATE production_batches
            SET actual_bottles = $2,
                actual_materials_used = $3,
                material_costs = $4,
                material_cost = $5,
                cost_per_liter = $6,
                quality_tests = $7,
                production_notes = $8,
                started_by = $9,
                started_at = $10,
                completed_by = $9,
                completed_at = $11
            WHERE id = $1
            RETURNING {}
            "#,
            PRODUCTION_BATCH_COLUMNS
        ))
        .bind(batch_id)
        .bind(Json(positive_quantities(&input.actual_bottles)))
        .bind(Json(&input.actual_materials_used))
        .bind(include_cost.then(|| Json(&plan.material_costs)))
        .bind(include_cost.then_some(plan.material_cost))
        .bind(plan.cost_per_liter.filter(|_| include_cost))
        .bind(Json(&quality_tests))
        .bind(&input.notes)
        .bind(actor)
        .bind(started_at)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        let shortfalls = plan.shortfalls();
        if !shortfalls.is_empty() {
            tracing::warn!(
                batch_code = %batch_code,
                "Executed with insufficient stock: {:?}",
                shortfalls
            );
        }

        tracing::info!(
            batch_code = %batch_code,
            liters = %plan.produced_liters,
            bottles = total_bottles(&input.actual_bottles),
            movements = plan.movements.len(),
            quality_tests = quality_tests.len(),
            "Production batch executed"
        );

        Ok(ExecutionResult {
            batch: visible(row.into(), include_cost),
            materials: plan
                .allocations
                .iter()
                .map(|a| MaterialDrawSummary::new(a, include_cost))
                .collect(),
            shortfalls,
            currency: include_cost.then(|| self.currency.clone()),
        })
    }
}

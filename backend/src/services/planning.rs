//! Production planning: requirement previews, plan creation and plan edits

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::config::ProductionConfig;
use crate::error::{is_unique_violation, AppError, AppResult};
use crate::services::production_batches::{
    self, ProductionBatchRow, BATCH_CODE_CONSTRAINT, PRODUCTION_BATCH_COLUMNS,
};
use crate::services::{BatchCodeService, CatalogService, InventoryService};
use shared::{
    batch_code_prefix, calculate_requirements, estimate_material_ratios, is_valid_batch_code,
    planned_materials,
    positive_quantities, regenerate_suffix, validate_bottle_quantities, validate_known_bottle_types,
    validate_plan_request, BottleQuantities, BottleType, MaterialRatios, MaterialRequirement,
    DateRange, Pagination, Product, ProductionBatch, ProductionStatus, RequirementCalculation,
};

/// Planning service for creating and revising production plans
#[derive(Clone)]
pub struct PlanningService {
    db: PgPool,
    production: ProductionConfig,
}

/// Input for a live requirement preview
#[derive(Debug, Deserialize)]
pub struct PreviewInput {
    pub product_id: Uuid,
    #[serde(default)]
    pub bottle_quantities: BottleQuantities,
}

/// Requirement preview shown on the planning form
#[derive(Debug, Clone, Serialize)]
pub struct RequirementPreview {
    pub product_id: Uuid,
    pub total_juice_liters: Decimal,
    pub ratios: MaterialRatios,
    pub requirements: Vec<MaterialRequirement>,
    pub has_shortage: bool,
    /// Materials estimated from the default ratio for lack of executed batches
    pub materials_without_history: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_estimated_cost: Option<Decimal>,
    /// Currency of the cost figures, present only when costs are shown
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
}

impl RequirementPreview {
    fn new(
        product_id: Uuid,
        ratios: MaterialRatios,
        calc: RequirementCalculation,
        currency: Option<&str>,
    ) -> Self {
        let materials_without_history = ratios
            .iter()
            .filter(|(_, ratio)| !ratio.has_history())
            .map(|(material, _)| material.clone())
            .collect();

        Self {
            product_id,
            total_juice_liters: calc.total_juice_liters,
            has_shortage: calc.has_shortage(),
            materials_without_history,
            total_estimated_cost: calc.total_estimated_cost(),
            currency: currency.map(str::to_string),
            ratios,
            requirements: calc.requirements,
        }
    }
}

/// Input for drawing a batch code before the plan is saved
#[derive(Debug, Deserialize)]
pub struct GenerateCodeInput {
    pub product_id: Uuid,
    pub production_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GeneratedBatchCode {
    pub batch_code: String,
    pub production_date: Option<NaiveDate>,
}

/// Input for creating a plan
#[derive(Debug, Deserialize, Validate)]
pub struct CreatePlanInput {
    pub product_id: Option<Uuid>,
    pub production_date: Option<NaiveDate>,
    #[serde(default)]
    pub bottle_quantities: BottleQuantities,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
    /// Code shown on the form, if one was drawn
    pub batch_code: Option<String>,
    #[serde(default)]
    pub confirm_shortage: bool,
}

/// Input for revising a planned batch
#[derive(Debug, Deserialize, Validate)]
pub struct UpdatePlanInput {
    #[serde(default)]
    pub bottle_quantities: BottleQuantities,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
    #[serde(default)]
    pub confirm_shortage: bool,
}

/// Filter for listing batches
#[derive(Debug, Default, Deserialize)]
pub struct BatchListQuery {
    pub status: Option<ProductionStatus>,
    /// Earliest production date, inclusive
    pub from: Option<NaiveDate>,
    /// Latest production date, inclusive
    pub to: Option<NaiveDate>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl BatchListQuery {
    pub fn pagination(&self) -> Pagination {
        let defaults = Pagination::default();
        Pagination {
            page: self.page.unwrap_or(defaults.page),
            per_page: self.per_page.unwrap_or(defaults.per_page),
        }
    }

    pub fn date_range(&self) -> AppResult<DateRange> {
        DateRange::from_bounds(self.from, self.to).ok_or_else(|| AppError::Validation {
            field: "from".to_string(),
            message: "Start date must not be after end date".to_string(),
            message_th: "วันที่เริ่มต้นต้องไม่อยู่หลังวันที่สิ้นสุด".to_string(),
        })
    }
}

impl PlanningService {
    pub fn new(db: PgPool, production: ProductionConfig) -> Self {
        Self { db, production }
    }

    fn catalog(&self) -> CatalogService {
        CatalogService::new(self.db.clone())
    }

    fn inventory(&self) -> InventoryService {
        InventoryService::new(self.db.clone())
    }

    /// Ratios, stock and requirements for a product and bottle mix
    async fn calculate(
        &self,
        product: &Product,
        bottle_types: &[BottleType],
        quantities: &BottleQuantities,
    ) -> (MaterialRatios, RequirementCalculation) {
        let ratios = estimate_material_ratios(product, &self.production.default_ratio());
        let stock = self.inventory().load_stock(&product.materials).await;
        let calc = calculate_requirements(product, bottle_types, quantities, &ratios, &stock);
        (ratios, calc)
    }

    /// Compute requirements without saving anything
    pub async fn preview_requirements(
        &self,
        input: PreviewInput,
        include_cost: bool,
    ) -> AppResult<RequirementPreview> {
        let product = self.catalog().get_product(input.product_id).await?;
        let bottle_types = self.catalog().list_bottle_types().await?;

        let (ratios, mut calc) = self
            .calculate(&product, &bottle_types, &input.bottle_quantities)
            .await;
        if !include_cost {
            calc.strip_costs();
        }

        let currency = include_cost.then_some(self.production.currency.as_str());
        Ok(RequirementPreview::new(product.id, ratios, calc, currency))
    }

    /// Draw a code to show on the planning form
    pub async fn generate_batch_code(&self, input: GenerateCodeInput) -> AppResult<GeneratedBatchCode> {
        let product = self.catalog().get_product(input.product_id).await?;
        let batch_code = self.batch_codes().generate(&product.name).await;

        Ok(GeneratedBatchCode {
            batch_code,
            production_date: input.production_date,
        })
    }

    fn batch_codes(&self) -> BatchCodeService {
        BatchCodeService::new(self.db.clone(), self.production.batch_code_max_attempts)
    }

    /// Create a planned production batch
    pub async fn create_plan(
        &self,
        planned_by: Uuid,
        input: CreatePlanInput,
        include_cost: bool,
    ) -> AppResult<ProductionBatch> {
        input.validate()?;
        validate_plan_request(input.product_id, input.production_date, &input.bottle_quantities)?;
        let (Some(product_id), Some(production_date)) = (input.product_id, input.production_date)
        else {
            return Err(AppError::Internal("Plan input passed validation incomplete".to_string()));
        };

        let product = self.catalog().get_product(product_id).await?;
        let bottle_types = self.catalog().list_bottle_types().await?;
        validate_known_bottle_types("bottle_quantities", &input.bottle_quantities, &bottle_types)?;

        let (_, calc) = self
            .calculate(&product, &bottle_types, &input.bottle_quantities)
            .await;
        ensure_shortage_confirmed(&calc, input.confirm_shortage)?;

        let mut batch_code = match accepted_proposed_code(input.batch_code.as_deref(), &product.name) {
            Some(code) => code,
            None => self.batch_codes().generate(&product.name).await,
        };

        let planned_bottles = positive_quantities(&input.bottle_quantities);
        let requirements = planned_materials(&calc.requirements, include_cost);
        let total_estimated_cost = if include_cost {
            calc.total_estimated_cost()
        } else {
            None
        };

        for attempt in 1..=self.production.batch_code_max_attempts.max(1) {
            let result = sqlx::query_as::<_, ProductionBatchRow>(&format!(
                r#"
                INSERT INTO production_batches (
                    batch_code, product_id, product_name, production_date, planned_bottles,
                    total_juice_liters, material_requirements, total_estimated_cost, notes,
                    status, planned_by
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
                RETURNING {}
                "#,
                PRODUCTION_BATCH_COLUMNS
            ))
            .bind(&batch_code)
            .bind(product.id)
            .bind(&product.name)
            .bind(production_date)
            .bind(Json(&planned_bottles))
            .bind(calc.total_juice_liters)
            .bind(Json(&requirements))
            .bind(total_estimated_cost)
            .bind(&input.notes)
            .bind(ProductionStatus::Planned.as_str())
            .bind(planned_by)
            .fetch_one(&self.db)
            .await;

            match result {
                Ok(row) => {
                    let batch = ProductionBatch::from(row);
                    tracing::info!(
                        batch_code = %batch.batch_code,
                        product = %batch.product_name,
                        liters = %batch.total_juice_liters,
                        shortage = calc.has_shortage(),
                        "Production plan created"
                    );
                    return Ok(visible(batch, include_cost));
                }
                Err(e) if is_unique_violation(&e, BATCH_CODE_CONSTRAINT) => {
                    tracing::warn!(attempt, "Batch code {} collided on insert, retrying", batch_code);
                    batch_code = regenerate_suffix(&batch_code, &mut rand::thread_rng());
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(AppError::Conflict {
            resource: "batch_code".to_string(),
            message: "Could not allocate a unique batch code, please try again".to_string(),
            message_th: "ไม่สามารถสร้างรหัสล็อตที่ไม่ซ้ำได้ กรุณาลองใหม่อีกครั้ง".to_string(),
        })
    }

    /// Revise the bottle mix and notes of a batch that is still planned
    pub async fn update_plan(
        &self,
        batch_code: &str,
        input: UpdatePlanInput,
        include_cost: bool,
    ) -> AppResult<ProductionBatch> {
        input.validate()?;
        validate_bottle_quantities("bottle_quantities", &input.bottle_quantities)?;

        let existing = production_batches::find_by_code(&self.db, batch_code)
            .await
            .map_err(|e| match e {
                AppError::NotFound(_) => AppError::NotFoundOrAlreadyExecuted(batch_code.to_string()),
                other => other,
            })?;
        if !existing.status.can_transition_to(ProductionStatus::Completed) {
            tracing::debug!(batch_code = %batch_code, status = %existing.status, "Plan is no longer editable");
            return Err(AppError::NotFoundOrAlreadyExecuted(batch_code.to_string()));
        }

        let product = self.catalog().get_product(existing.product_id).await?;
        let bottle_types = self.catalog().list_bottle_types().await?;
        validate_known_bottle_types("bottle_quantities", &input.bottle_quantities, &bottle_types)?;

        let (_, calc) = self
            .calculate(&product, &bottle_types, &input.bottle_quantities)
            .await;
        ensure_shortage_confirmed(&calc, input.confirm_shortage)?;

        let total_estimated_cost = if include_cost {
            calc.total_estimated_cost()
        } else {
            None
        };

        let row = sqlx::query_as::<_, ProductionBatchRow>(&format!(
            r#"
            UPDATE production_batches
            SET planned_bottles = $2,
                total_juice_liters = $3,
                material_requirements = $4,
                total_estimated_cost = $5,
                notes = $6,
                updated_at = $7
            WHERE batch_code = $1 AND status = 'planned'
            RETURNING {}
            "#,
            PRODUCTION_BATCH_COLUMNS
        ))
        .bind(batch_code)
        .bind(Json(positive_quantities(&input.bottle_quantities)))
        .bind(calc.total_juice_liters)
        .bind(Json(planned_materials(&calc.requirements, include_cost)))
        .bind(total_estimated_cost)
        .bind(&input.notes)
        .bind(Utc::now())
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFoundOrAlreadyExecuted(batch_code.to_string()))?;

        tracing::info!(batch_code = %batch_code, "Production plan updated");
        Ok(visible(row.into(), include_cost))
    }

    /// Get a batch by code
    pub async fn get_batch(&self, batch_code: &str, include_cost: bool) -> AppResult<ProductionBatch> {
        let batch = production_batches::find_by_code(&self.db, batch_code).await?;
        Ok(visible(batch, include_cost))
    }

    /// List batches, newest production date first
    pub async fn list_batches(
        &self,
        query: &BatchListQuery,
        include_cost: bool,
    ) -> AppResult<Vec<ProductionBatch>> {
        query.date_range()?;
        let pagination = query.pagination();
        let rows = sqlx::query_as::<_, ProductionBatchRow>(&format!(
            r#"
            SELECT {}
            FROM production_batches
            WHERE ($1::text IS NULL OR status = $1)
              AND ($2::date IS NULL OR production_date >= $2)
              AND ($3::date IS NULL OR production_date <= $3)
            ORDER BY production_date DESC, planned_at DESC
            LIMIT $4 OFFSET $5
            "#,
            PRODUCTION_BATCH_COLUMNS
        ))
        .bind(query.status.map(|s| s.as_str()))
        .bind(query.from)
        .bind(query.to)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| visible(row.into(), include_cost))
            .collect())
    }
}

/// A code proposed by the form, kept only if well formed and prefixed for this product
fn accepted_proposed_code(proposed: Option<&str>, product_name: &str) -> Option<String> {
    proposed
        .filter(|code| is_valid_batch_code(code) && code.starts_with(&batch_code_prefix(product_name)))
        .map(str::to_string)
}

/// Reject a short plan unless the planner confirmed it
fn ensure_shortage_confirmed(calc: &RequirementCalculation, confirmed: bool) -> AppResult<()> {
    if calc.has_shortage() && !confirmed {
        return Err(AppError::ShortageConfirmationRequired {
            shortages: calc.shortage_report(),
        });
    }
    Ok(())
}

/// Apply the caller's cost visibility to a batch
pub(crate) fn visible(mut batch: ProductionBatch, include_cost: bool) -> ProductionBatch {
    if !include_cost {
        batch.strip_costs();
    }
    batch
}

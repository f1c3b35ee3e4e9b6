//! Production batch aggregate: planning records, execution results and the
//! inventory effects of completing a batch

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{
    allocate_fifo, total_volume_liters, BatchAllocation, BottleQuantities, BottleType,
    FifoAllocation, InventoryMovement, MaterialRequirement, MaterialStock, MovementDirection,
    MovementReferenceType,
};

/// Production batch lifecycle: planned, then completed exactly once
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProductionStatus {
    Planned,
    Completed,
}

impl ProductionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductionStatus::Planned => "planned",
            ProductionStatus::Completed => "completed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "planned" => Some(ProductionStatus::Planned),
            "completed" => Some(ProductionStatus::Completed),
            _ => None,
        }
    }

    pub const ALL: [ProductionStatus; 2] = [ProductionStatus::Planned, ProductionStatus::Completed];

    /// Only planned -> completed is allowed
    pub fn can_transition_to(&self, next: ProductionStatus) -> bool {
        matches!(
            (self, next),
            (ProductionStatus::Planned, ProductionStatus::Completed)
        )
    }

    /// Statuses a batch may hold when moved to `target`
    pub fn sources_of(target: ProductionStatus) -> Vec<ProductionStatus> {
        Self::ALL
            .into_iter()
            .filter(|status| status.can_transition_to(target))
            .collect()
    }
}

impl std::fmt::Display for ProductionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProductionStatus::Planned => write!(f, "Planned"),
            ProductionStatus::Completed => write!(f, "Completed"),
        }
    }
}

/// Material quantity fixed at planning time
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlannedMaterial {
    pub quantity: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_cost: Option<Decimal>,
}

/// Persisted form of the planning requirements
pub fn planned_materials(
    requirements: &[MaterialRequirement],
    include_cost: bool,
) -> BTreeMap<String, PlannedMaterial> {
    requirements
        .iter()
        .map(|r| {
            (
                r.material_type.clone(),
                PlannedMaterial {
                    quantity: r.required_quantity,
                    estimated_cost: if include_cost { r.estimated_cost } else { None },
                },
            )
        })
        .collect()
}

/// The central production aggregate
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductionBatch {
    pub id: Uuid,
    /// Human-facing code, immutable once planned
    pub batch_code: String,
    pub product_id: Uuid,
    pub product_name: String,
    pub production_date: NaiveDate,
    pub planned_bottles: BottleQuantities,
    pub total_juice_liters: Decimal,
    pub material_requirements: BTreeMap<String, PlannedMaterial>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_estimated_cost: Option<Decimal>,
    pub notes: Option<String>,
    pub status: ProductionStatus,
    pub planned_by: Uuid,
    pub planned_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    // Execution results
    pub actual_bottles: Option<BottleQuantities>,
    pub actual_materials_used: Option<BTreeMap<String, Decimal>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub material_costs: Option<BTreeMap<String, Decimal>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub material_cost: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost_per_liter: Option<Decimal>,
    pub quality_tests: Vec<QualityTest>,
    pub production_notes: Option<String>,
    pub started_by: Option<Uuid>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_by: Option<Uuid>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl ProductionBatch {
    /// Remove every cost figure for actors without cost access
    pub fn strip_costs(&mut self) {
        self.total_estimated_cost = None;
        self.material_costs = None;
        self.material_cost = None;
        self.cost_per_liter = None;
        for material in self.material_requirements.values_mut() {
            material.estimated_cost = None;
        }
    }
}

/// Kind of quality measurement
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum QualityTestType {
    /// Sugar content (°Bx)
    Brix,
    /// Titratable acidity (%)
    Acidity,
}

/// When in the process a measurement was taken
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MixingStage {
    BeforeMixing,
    AfterMixing,
}

/// A single reading entered by the operator
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct QualityMeasurement {
    pub value: Option<Decimal>,
    /// Uploaded photo of the instrument reading
    pub image_url: Option<String>,
}

impl QualityMeasurement {
    /// Positive value, if the measurement was taken
    pub fn recorded_value(&self) -> Option<Decimal> {
        self.value.filter(|v| *v > Decimal::ZERO)
    }
}

/// Readings entered on the execution form
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct QualityMeasurements {
    #[serde(default)]
    pub brix_before_mixing: QualityMeasurement,
    #[serde(default)]
    pub brix_after_mixing: QualityMeasurement,
    #[serde(default)]
    pub acidity_before_mixing: QualityMeasurement,
    #[serde(default)]
    pub acidity_after_mixing: QualityMeasurement,
}

/// A recorded quality test
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QualityTest {
    pub test_type: QualityTestType,
    pub stage: MixingStage,
    pub value: Decimal,
    pub image_url: Option<String>,
    pub tested_by: Uuid,
    pub tested_at: DateTime<Utc>,
    /// Always true: failing a test is not supported yet
    pub passed: bool,
}

/// Turn form readings into recorded tests. Missing or non-positive readings
/// count as "not measured" and produce no test.
pub fn build_quality_tests(
    measurements: &QualityMeasurements,
    tested_by: Uuid,
    tested_at: DateTime<Utc>,
) -> Vec<QualityTest> {
    let readings = [
        (QualityTestType::Brix, MixingStage::BeforeMixing, &measurements.brix_before_mixing),
        (QualityTestType::Brix, MixingStage::AfterMixing, &measurements.brix_after_mixing),
        (QualityTestType::Acidity, MixingStage::BeforeMixing, &measurements.acidity_before_mixing),
        (QualityTestType::Acidity, MixingStage::AfterMixing, &measurements.acidity_after_mixing),
    ];

    readings
        .into_iter()
        .filter_map(|(test_type, stage, reading)| {
            reading.recorded_value().map(|value| QualityTest {
                test_type,
                stage,
                value,
                image_url: reading.image_url.clone(),
                tested_by,
                tested_at,
                passed: true,
            })
        })
        .collect()
}

/// New remaining quantity for an inventory batch touched by execution
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InventoryBatchUpdate {
    pub inventory_batch_id: Uuid,
    pub previous_quantity: Decimal,
    pub remaining_quantity: Decimal,
    /// Remaining reached exactly zero; the batch becomes finished
    pub finished: bool,
}

impl From<&BatchAllocation> for InventoryBatchUpdate {
    fn from(a: &BatchAllocation) -> Self {
        InventoryBatchUpdate {
            inventory_batch_id: a.inventory_batch_id,
            previous_quantity: a.previous_quantity,
            remaining_quantity: a.new_quantity,
            finished: a.depletes_batch(),
        }
    }
}

/// Everything the execution commit writes besides the batch status change
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExecutionPlan {
    pub allocations: Vec<FifoAllocation>,
    pub batch_updates: Vec<InventoryBatchUpdate>,
    pub movements: Vec<InventoryMovement>,
    pub material_costs: BTreeMap<String, Decimal>,
    pub material_cost: Decimal,
    pub produced_liters: Decimal,
    pub cost_per_liter: Option<Decimal>,
}

impl ExecutionPlan {
    /// Materials whose stock did not cover the entered usage
    pub fn shortfalls(&self) -> BTreeMap<String, Decimal> {
        self.allocations
            .iter()
            .filter(|a| !a.is_complete())
            .map(|a| (a.material_type.clone(), a.shortfall()))
            .collect()
    }
}

/// Who and when for an execution commit
#[derive(Debug, Clone)]
pub struct ExecutionContext<'a> {
    pub batch_code: &'a str,
    pub actor: Uuid,
    pub at: DateTime<Utc>,
}

/// Allocate actual material usage against FIFO-ordered stock and derive the
/// inventory updates, movement records and costs of completing a batch.
///
/// Materials with zero or negative usage are skipped. Usage beyond the
/// available stock is allocated as far as stock goes.
pub fn plan_execution(
    ctx: &ExecutionContext<'_>,
    materials_used: &BTreeMap<String, Decimal>,
    stock: &MaterialStock,
    bottle_types: &[BottleType],
    actual_bottles: &BottleQuantities,
) -> ExecutionPlan {
    let empty = Vec::new();
    let allocations: Vec<FifoAllocation> = materials_used
        .iter()
        .filter(|(_, qty)| **qty > Decimal::ZERO)
        .map(|(material, qty)| {
            let batches = stock.get(material).unwrap_or(&empty);
            allocate_fifo(material, batches, *qty)
        })
        .collect();

    let batch_updates = allocations
        .iter()
        .flat_map(|a| a.allocations.iter().map(InventoryBatchUpdate::from))
        .collect();

    let movements = allocations
        .iter()
        .flat_map(|a| {
            a.allocations.iter().map(move |b| InventoryMovement {
                id: Uuid::new_v4(),
                material_type: a.material_type.clone(),
                inventory_batch_id: b.inventory_batch_id,
                direction: MovementDirection::Out,
                quantity: b.quantity,
                previous_quantity: b.previous_quantity,
                new_quantity: b.new_quantity,
                reference: ctx.batch_code.to_string(),
                reference_type: MovementReferenceType::Production,
                unit_price: b.unit_price,
                created_at: ctx.at,
                created_by: ctx.actor,
            })
        })
        .collect();

    let material_costs: BTreeMap<String, Decimal> = allocations
        .iter()
        .map(|a| (a.material_type.clone(), a.cost))
        .collect();
    let material_cost: Decimal = material_costs.values().copied().sum();

    let produced_liters = total_volume_liters(bottle_types, actual_bottles);
    let cost_per_liter = if produced_liters > Decimal::ZERO {
        Some((material_cost / produced_liters).round_dp(4))
    } else {
        None
    };

    ExecutionPlan {
        allocations,
        batch_updates,
        movements,
        material_costs,
        material_cost,
        produced_liters,
        cost_per_liter,
    }
}

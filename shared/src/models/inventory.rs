//! Raw material inventory ledger models and FIFO allocation

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Decimal places kept for stock quantities (kg, gram precision)
pub const QUANTITY_DECIMAL_PLACES: u32 = 3;

/// Lifecycle of a received raw material batch
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InventoryBatchStatus {
    Active,
    /// Fully consumed. Terminal.
    Finished,
}

impl InventoryBatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InventoryBatchStatus::Active => "active",
            InventoryBatchStatus::Finished => "finished",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "active" => Some(InventoryBatchStatus::Active),
            "finished" => Some(InventoryBatchStatus::Finished),
            _ => None,
        }
    }
}

/// A raw material receipt with its remaining quantity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InventoryBatch {
    pub id: Uuid,
    /// Receipt code printed on the delivery
    pub batch_code: String,
    pub material_type: String,
    pub supplier: Option<String>,
    pub purchase_date: NaiveDate,
    /// Quantity received (kg)
    pub quantity: Decimal,
    /// Quantity not yet consumed (kg), never increases
    pub remaining_quantity: Decimal,
    /// Cost per kg (THB)
    pub unit_price: Decimal,
    pub status: InventoryBatchStatus,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl InventoryBatch {
    /// Whether the batch can still be drawn from
    pub fn is_available(&self) -> bool {
        self.status == InventoryBatchStatus::Active && self.remaining_quantity > Decimal::ZERO
    }

    /// Value of the remaining stock at the batch's unit price
    pub fn remaining_value(&self) -> Decimal {
        self.remaining_quantity * self.unit_price
    }
}

/// Direction of an inventory movement
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MovementDirection {
    In,
    Out,
}

impl MovementDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementDirection::In => "in",
            MovementDirection::Out => "out",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "in" => Some(MovementDirection::In),
            "out" => Some(MovementDirection::Out),
            _ => None,
        }
    }
}

/// What caused an inventory movement
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MovementReferenceType {
    Production,
}

impl MovementReferenceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementReferenceType::Production => "production",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "production" => Some(MovementReferenceType::Production),
            _ => None,
        }
    }
}

/// Write-once audit record of stock leaving or entering a batch
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InventoryMovement {
    pub id: Uuid,
    pub material_type: String,
    pub inventory_batch_id: Uuid,
    pub direction: MovementDirection,
    pub quantity: Decimal,
    pub previous_quantity: Decimal,
    pub new_quantity: Decimal,
    /// Production batch code
    pub reference: String,
    pub reference_type: MovementReferenceType,
    pub unit_price: Decimal,
    pub created_at: DateTime<Utc>,
    pub created_by: Uuid,
}

/// Quantity drawn from one inventory batch
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BatchAllocation {
    pub inventory_batch_id: Uuid,
    pub batch_code: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub previous_quantity: Decimal,
    pub new_quantity: Decimal,
}

impl BatchAllocation {
    pub fn cost(&self) -> Decimal {
        self.quantity * self.unit_price
    }

    /// Whether this draw empties the batch
    pub fn depletes_batch(&self) -> bool {
        self.new_quantity.is_zero()
    }
}

/// Result of walking a material's batches oldest-first
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FifoAllocation {
    pub material_type: String,
    pub requested: Decimal,
    pub allocated: Decimal,
    pub cost: Decimal,
    pub allocations: Vec<BatchAllocation>,
}

impl FifoAllocation {
    /// Quantity that could not be covered by available stock
    pub fn shortfall(&self) -> Decimal {
        (self.requested - self.allocated).max(Decimal::ZERO)
    }

    pub fn is_complete(&self) -> bool {
        self.shortfall().is_zero()
    }
}

/// Allocate `needed` units across `batches`, taking from each batch in the
/// order given until the need is met or the batches run out.
///
/// `batches` must already be in FIFO order (oldest first). Batches that are
/// finished or empty are skipped. Nothing is mutated: the same walk serves
/// the planning cost preview and the execution commit.
pub fn allocate_fifo(material_type: &str, batches: &[InventoryBatch], needed: Decimal) -> FifoAllocation {
    let mut remaining_needed = needed.max(Decimal::ZERO);
    let mut allocations = Vec::new();
    let mut cost = Decimal::ZERO;

    for batch in batches.iter().filter(|b| b.is_available()) {
        if remaining_needed <= Decimal::ZERO {
            break;
        }

        let used = remaining_needed.min(batch.remaining_quantity);
        let allocation = BatchAllocation {
            inventory_batch_id: batch.id,
            batch_code: batch.batch_code.clone(),
            quantity: used,
            unit_price: batch.unit_price,
            previous_quantity: batch.remaining_quantity,
            new_quantity: batch.remaining_quantity - used,
        };

        cost += allocation.cost();
        remaining_needed -= used;
        allocations.push(allocation);
    }

    let allocated = allocations.iter().map(|a| a.quantity).sum();

    FifoAllocation {
        material_type: material_type.to_string(),
        requested: needed.max(Decimal::ZERO),
        allocated,
        cost,
        allocations,
    }
}

/// Total remaining quantity across the available batches
pub fn available_quantity(batches: &[InventoryBatch]) -> Decimal {
    batches
        .iter()
        .filter(|b| b.is_available())
        .map(|b| b.remaining_quantity)
        .sum()
}

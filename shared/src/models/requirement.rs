//! Material requirement calculation for a planned bottle mix

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{
    allocate_fifo, available_quantity, total_volume_liters, BottleQuantities, BottleType,
    InventoryBatch, MaterialRatio, MaterialRatios, Product,
};

/// FIFO-ordered active batches per material type.
///
/// A material missing from the map means its inventory lookup failed.
pub type MaterialStock = BTreeMap<String, Vec<InventoryBatch>>;

/// What one recipe material needs for a planned batch
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MaterialRequirement {
    pub material_type: String,
    pub ratio: MaterialRatio,
    pub required_quantity: Decimal,
    pub available_quantity: Decimal,
    /// FIFO cost preview; stripped for actors without cost access
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_cost: Option<Decimal>,
    pub is_enough: bool,
}

impl MaterialRequirement {
    /// Quantity still missing after available stock is used
    pub fn shortage(&self) -> Decimal {
        (self.required_quantity - self.available_quantity).max(Decimal::ZERO)
    }
}

/// One line of the shortage report shown before a plan is confirmed
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MaterialShortage {
    pub material_type: String,
    pub required_quantity: Decimal,
    pub available_quantity: Decimal,
    pub shortage: Decimal,
}

impl From<&MaterialRequirement> for MaterialShortage {
    fn from(r: &MaterialRequirement) -> Self {
        MaterialShortage {
            material_type: r.material_type.clone(),
            required_quantity: r.required_quantity,
            available_quantity: r.available_quantity,
            shortage: r.shortage(),
        }
    }
}

/// Requirements for a whole bottle mix
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RequirementCalculation {
    pub total_juice_liters: Decimal,
    pub requirements: Vec<MaterialRequirement>,
}

impl RequirementCalculation {
    pub fn empty() -> Self {
        Self {
            total_juice_liters: Decimal::ZERO,
            requirements: Vec::new(),
        }
    }

    pub fn has_shortage(&self) -> bool {
        self.requirements.iter().any(|r| !r.is_enough)
    }

    pub fn shortages(&self) -> impl Iterator<Item = &MaterialRequirement> {
        self.requirements.iter().filter(|r| !r.is_enough)
    }

    pub fn shortage_report(&self) -> Vec<MaterialShortage> {
        self.shortages().map(MaterialShortage::from).collect()
    }

    /// Sum of the per-material estimates, `None` once costs are stripped
    pub fn total_estimated_cost(&self) -> Option<Decimal> {
        self.requirements
            .iter()
            .map(|r| r.estimated_cost)
            .sum::<Option<Decimal>>()
    }

    pub fn strip_costs(&mut self) {
        for requirement in &mut self.requirements {
            requirement.estimated_cost = None;
        }
    }
}

/// Requirement for one material given the liters to produce
pub fn material_requirement(
    material_type: &str,
    ratio: MaterialRatio,
    total_liters: Decimal,
    stock: Option<&[InventoryBatch]>,
) -> MaterialRequirement {
    let required_quantity = total_liters * ratio.avg;

    match stock {
        Some(batches) => {
            let available = available_quantity(batches);
            let preview = allocate_fifo(material_type, batches, required_quantity);
            MaterialRequirement {
                material_type: material_type.to_string(),
                ratio,
                required_quantity,
                available_quantity: available,
                estimated_cost: Some(preview.cost),
                is_enough: available >= required_quantity,
            }
        }
        None => MaterialRequirement {
            material_type: material_type.to_string(),
            ratio,
            required_quantity,
            available_quantity: Decimal::ZERO,
            estimated_cost: Some(Decimal::ZERO),
            is_enough: false,
        },
    }
}

/// Compute volume and per-material requirements for a bottle mix.
///
/// An empty mix yields no requirements. Output follows the order of the
/// product's material list. Only the average ratio drives quantities.
pub fn calculate_requirements(
    product: &Product,
    bottle_types: &[BottleType],
    quantities: &BottleQuantities,
    ratios: &MaterialRatios,
    stock: &MaterialStock,
) -> RequirementCalculation {
    let total_liters = total_volume_liters(bottle_types, quantities);
    if total_liters.is_zero() {
        return RequirementCalculation::empty();
    }

    let requirements = product
        .materials
        .iter()
        .map(|material| {
            let ratio = ratios
                .get(material)
                .copied()
                .unwrap_or_else(MaterialRatio::conservative_default);
            material_requirement(
                material,
                ratio,
                total_liters,
                stock.get(material).map(Vec::as_slice),
            )
        })
        .collect();

    RequirementCalculation {
        total_juice_liters: total_liters,
        requirements,
    }
}

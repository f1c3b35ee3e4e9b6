//! Bottle type reference data and bottle-mix volume arithmetic

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Requested or produced bottle counts keyed by bottle type
pub type BottleQuantities = BTreeMap<Uuid, i32>;

/// A bottle type that juice is filled into
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BottleType {
    pub id: Uuid,
    /// Display name (e.g., "250 ml PET")
    pub name: String,
    pub size_ml: i32,
    pub unit_cost: Decimal,
    /// Current stock counter, maintained by purchasing
    pub stock: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Total filled volume in milliliters for a bottle mix.
///
/// Only counts greater than zero contribute. Bottle type ids that are not
/// present in `bottle_types` are ignored; callers validate ids beforehand.
pub fn total_volume_ml(bottle_types: &[BottleType], quantities: &BottleQuantities) -> i64 {
    quantities
        .iter()
        .filter(|(_, qty)| **qty > 0)
        .filter_map(|(id, qty)| {
            bottle_types
                .iter()
                .find(|b| b.id == *id)
                .map(|b| i64::from(b.size_ml) * i64::from(*qty))
        })
        .sum()
}

/// Total filled volume in liters for a bottle mix
pub fn total_volume_liters(bottle_types: &[BottleType], quantities: &BottleQuantities) -> Decimal {
    Decimal::from(total_volume_ml(bottle_types, quantities)) / Decimal::from(1000)
}

/// Number of bottles with a positive count
pub fn total_bottles(quantities: &BottleQuantities) -> i64 {
    quantities
        .values()
        .filter(|qty| **qty > 0)
        .map(|qty| i64::from(*qty))
        .sum()
}

/// Drop zero and negative counts
pub fn positive_quantities(quantities: &BottleQuantities) -> BottleQuantities {
    quantities
        .iter()
        .filter(|(_, qty)| **qty > 0)
        .map(|(id, qty)| (*id, *qty))
        .collect()
}

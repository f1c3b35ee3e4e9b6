//! Juice product models and material ratio estimation

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Expected raw material ratios keyed by material type
pub type MaterialRatios = BTreeMap<String, MaterialRatio>;

/// A juice product with its recipe materials
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    pub id: Uuid,
    /// Latin-alphabet name, also used to derive batch codes
    pub name: String,
    pub name_th: Option<String>,
    pub category: String,
    /// Raw material types the recipe draws on, in display order
    pub materials: Vec<String>,
    /// Ratios derived from executed batches, if any have been recorded
    pub average_ratios: Option<MaterialRatios>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Raw material needed per liter of finished juice (kg/L)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct MaterialRatio {
    pub min: Decimal,
    pub max: Decimal,
    pub avg: Decimal,
    /// Number of executed batches the figures come from
    pub sample_count: i32,
}

impl MaterialRatio {
    /// Placeholder used when a product has no production history: 2.0 kg/L (1.8 - 2.2)
    pub fn conservative_default() -> Self {
        Self {
            min: Decimal::new(18, 1),
            max: Decimal::new(22, 1),
            avg: Decimal::new(20, 1),
            sample_count: 0,
        }
    }

    pub fn has_history(&self) -> bool {
        self.sample_count > 0
    }
}

impl Default for MaterialRatio {
    fn default() -> Self {
        Self::conservative_default()
    }
}

/// Estimate per-material ratios for a product.
///
/// Recorded ratios are returned as stored. Every recipe material without a
/// recorded ratio gets `fallback`.
pub fn estimate_material_ratios(product: &Product, fallback: &MaterialRatio) -> MaterialRatios {
    let mut ratios = product.average_ratios.clone().unwrap_or_default();
    for material in &product.materials {
        ratios.entry(material.clone()).or_insert(*fallback);
    }
    ratios
}

/// One executed batch's contribution to a material's ratio statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RatioSample {
    pub liters_produced: Decimal,
    pub material_used: Decimal,
}

impl RatioSample {
    fn ratio(&self) -> Option<Decimal> {
        if self.liters_produced > Decimal::ZERO && self.material_used > Decimal::ZERO {
            Some(self.material_used / self.liters_produced)
        } else {
            None
        }
    }
}

/// Compute min/max/avg ratio statistics from executed batches.
///
/// Samples with no output or no usage are skipped. Returns `None` when no
/// sample qualifies. Figures are rounded to four decimal places.
pub fn compute_ratio_statistics(samples: &[RatioSample]) -> Option<MaterialRatio> {
    let ratios: Vec<Decimal> = samples.iter().filter_map(RatioSample::ratio).collect();
    let first = *ratios.first()?;

    let (min, max, sum) = ratios.iter().fold(
        (first, first, Decimal::ZERO),
        |(min, max, sum), r| (min.min(*r), max.max(*r), sum + r),
    );
    let count = ratios.len();

    Some(MaterialRatio {
        min: min.round_dp(4),
        max: max.round_dp(4),
        avg: (sum / Decimal::from(count)).round_dp(4),
        sample_count: i32::try_from(count).unwrap_or(i32::MAX),
    })
}

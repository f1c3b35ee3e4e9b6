//! Recompute product material ratios from executed batches

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use sqlx::{types::Json, PgPool};
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::CatalogService;
use shared::{
    compute_ratio_statistics, total_volume_liters, BottleQuantities, BottleType, MaterialRatios,
    Product, RatioSample,
};

/// Ratio service for refreshing `products.average_ratios`
#[derive(Clone)]
pub struct RatioService {
    db: PgPool,
}

/// Output and usage recorded by one completed batch
#[derive(Debug, sqlx::FromRow)]
struct CompletedBatchRow {
    actual_bottles: Option<Json<BottleQuantities>>,
    actual_materials_used: Option<Json<BTreeMap<String, Decimal>>>,
}

impl RatioService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Recompute and store ratio statistics for every recipe material of a product
    pub async fn refresh_product_ratios(&self, product_id: Uuid) -> AppResult<Product> {
        let catalog = CatalogService::new(self.db.clone());
        let product = catalog.get_product(product_id).await?;
        let bottle_types = catalog.list_all_bottle_types().await?;

        let rows = sqlx::query_as::<_, CompletedBatchRow>(
            r#"
            SELECT actual_bottles, actual_materials_used
            FROM production_batches
            WHERE product_id = $1 AND status = 'completed'
            "#,
        )
        .bind(product_id)
        .fetch_all(&self.db)
        .await?;

        let ratios = ratios_from_history(&product, &bottle_types, &rows);

        tracing::info!(
            product_id = %product_id,
            batches = rows.len(),
            materials = ratios.len(),
            "Material ratios refreshed"
        );

        catalog.update_average_ratios(product_id, &ratios).await
    }
}

/// Per-material statistics; materials without usable samples are left out
fn ratios_from_history(
    product: &Product,
    bottle_types: &[BottleType],
    rows: &[CompletedBatchRow],
) -> MaterialRatios {
    let outputs: Vec<(Decimal, Option<&BTreeMap<String, Decimal>>)> = rows
        .iter()
        .map(|row| {
            let liters = row
                .actual_bottles
                .as_ref()
                .map(|b| total_volume_liters(bottle_types, &b.0))
                .unwrap_or_default();
            (liters, row.actual_materials_used.as_ref().map(|u| &u.0))
        })
        .collect();

    product
        .materials
        .iter()
        .filter_map(|material| {
            let samples: Vec<RatioSample> = outputs
                .iter()
                .map(|(liters, used)| RatioSample {
                    liters_produced: *liters,
                    material_used: used
                        .and_then(|u| u.get(material).copied())
                        .unwrap_or_default(),
                })
                .collect();
            compute_ratio_statistics(&samples).map(|stats| (material.clone(), stats))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn liter_bottle() -> BottleType {
        BottleType {
            id: Uuid::new_v4(),
            name: "1 L".to_string(),
            size_ml: 1000,
            unit_cost: Decimal::from(8),
            stock: 0,
            is_active: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn completed(bottle: &BottleType, count: i32, usage: &[(&str, i64)]) -> CompletedBatchRow {
        let mut bottles = BottleQuantities::new();
        bottles.insert(bottle.id, count);
        CompletedBatchRow {
            actual_bottles: Some(Json(bottles)),
            actual_materials_used: Some(Json(
                usage.iter().map(|(m, q)| (m.to_string(), Decimal::from(*q))).collect(),
            )),
        }
    }

    #[test]
    fn test_ratios_from_history() {
        let bottle = liter_bottle();
        let product = Product {
            id: Uuid::new_v4(),
            name: "Orange Juice".to_string(),
            name_th: None,
            category: "juice".to_string(),
            materials: vec!["Orange Concentrate".to_string(), "Sugar".to_string()],
            average_ratios: None,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let rows = vec![
            completed(&bottle, 10, &[("Orange Concentrate", 20)]),
            completed(&bottle, 20, &[("Orange Concentrate", 50)]),
        ];

        let ratios = ratios_from_history(&product, &[bottle], &rows);
        assert_eq!(ratios.len(), 1);
        let orange = ratios["Orange Concentrate"];
        assert_eq!(orange.min, Decimal::from(2));
        assert_eq!(orange.max, Decimal::new(25, 1));
        assert_eq!(orange.avg, Decimal::new(225, 2));
        assert_eq!(orange.sample_count, 2);
        assert!(!ratios.contains_key("Sugar"));
    }
}

//! Production planning tests
//!
//! Tests for the requirement preview and plan validation including:
//! - Bottle mix volume
//! - Material requirements from ratios
//! - Shortage detection
//! - Ratio statistics from executed batches

use chrono::{NaiveDate, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::models::{
    calculate_requirements, compute_ratio_statistics, estimate_material_ratios,
    total_volume_liters, BottleQuantities, BottleType, InventoryBatch, InventoryBatchStatus,
    MaterialRatio, MaterialRatios, MaterialStock, Product, RatioSample,
};
use shared::validation::{validate_known_bottle_types, validate_plan_request};
use std::str::FromStr;
use uuid::Uuid;

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn product(materials: &[&str]) -> Product {
    Product {
        id: Uuid::new_v4(),
        name: "Mango Smoothie".to_string(),
        name_th: Some("มะม่วงปั่น".to_string()),
        category: "smoothie".to_string(),
        materials: materials.iter().map(|m| m.to_string()).collect(),
        average_ratios: None,
        is_active: true,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn bottle(size_ml: i32) -> BottleType {
    BottleType {
        id: Uuid::new_v4(),
        name: format!("{} ml PET", size_ml),
        size_ml,
        unit_cost: dec("4.50"),
        stock: 1_000,
        is_active: true,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn stock_of(material: &str, remaining: &str, unit_price: &str) -> InventoryBatch {
    InventoryBatch {
        id: Uuid::new_v4(),
        batch_code: format!("{}-001", material.to_uppercase()),
        material_type: material.to_string(),
        supplier: None,
        purchase_date: Utc::now().date_naive(),
        quantity: dec(remaining),
        remaining_quantity: dec(remaining),
        unit_price: dec(unit_price),
        status: InventoryBatchStatus::Active,
        created_at: Utc::now(),
        finished_at: None,
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// 4 x 250 ml + 2 x 500 ml = 2.0 L
    #[test]
    fn test_bottle_mix_volume() {
        let small = bottle(250);
        let large = bottle(500);
        let quantities: BottleQuantities = [(small.id, 4), (large.id, 2)].into_iter().collect();

        let liters = total_volume_liters(&[small, large], &quantities);
        assert_eq!(liters, dec("2.0"));
    }

    #[test]
    fn test_zero_and_negative_counts_add_no_volume() {
        let small = bottle(250);
        let large = bottle(500);
        let quantities: BottleQuantities = [(small.id, 0), (large.id, -3)].into_iter().collect();

        assert_eq!(total_volume_liters(&[small, large], &quantities), Decimal::ZERO);
    }

    #[test]
    fn test_empty_mix_has_no_requirements() {
        let mango = product(&["mango", "sugar"]);
        let ratios = estimate_material_ratios(&mango, &MaterialRatio::conservative_default());

        let calculation = calculate_requirements(
            &mango,
            &[bottle(250)],
            &BottleQuantities::new(),
            &ratios,
            &MaterialStock::new(),
        );

        assert_eq!(calculation.total_juice_liters, Decimal::ZERO);
        assert!(calculation.requirements.is_empty());
        assert!(!calculation.has_shortage());
    }

    /// 2.0 L at the default 2.0 kg/L needs 4.0 kg of each material
    #[test]
    fn test_requirements_use_average_ratio() {
        let mango = product(&["mango", "sugar"]);
        let liter = bottle(1000);
        let quantities: BottleQuantities = [(liter.id, 2)].into_iter().collect();
        let ratios = estimate_material_ratios(&mango, &MaterialRatio::conservative_default());

        let mut stock = MaterialStock::new();
        stock.insert("mango".to_string(), vec![stock_of("mango", "10", "35")]);
        stock.insert("sugar".to_string(), vec![stock_of("sugar", "3", "22")]);

        let calculation = calculate_requirements(&mango, &[liter], &quantities, &ratios, &stock);

        assert_eq!(calculation.requirements.len(), 2);
        let mango_req = &calculation.requirements[0];
        assert_eq!(mango_req.material_type, "mango");
        assert_eq!(mango_req.required_quantity, dec("4.0"));
        assert!(mango_req.is_enough);
        assert_eq!(mango_req.estimated_cost, Some(dec("140")));

        let sugar_req = &calculation.requirements[1];
        assert!(!sugar_req.is_enough);
        assert_eq!(sugar_req.shortage(), dec("1"));
        assert!(calculation.has_shortage());

        let report = calculation.shortage_report();
        assert_eq!(report.len(), 1);
        assert_eq!(report[0].material_type, "sugar");
        assert_eq!(report[0].shortage, dec("1"));
    }

    fn two_orange_batches() -> MaterialStock {
        let first = InventoryBatch {
            batch_code: "ORANGE-A".to_string(),
            ..stock_of("orange", "30", "20")
        };
        let second = InventoryBatch {
            batch_code: "ORANGE-B".to_string(),
            created_at: first.created_at + chrono::Duration::days(1),
            ..stock_of("orange", "40", "25")
        };
        let mut stock = MaterialStock::new();
        stock.insert("orange".to_string(), vec![first, second]);
        stock
    }

    /// 100 x 250 ml = 25 L needs 50 kg; FIFO costs 30 x 20 + 20 x 25
    #[test]
    fn test_requirement_spanning_two_batches() {
        let orange = product(&["orange"]);
        let small = bottle(250);
        let quantities: BottleQuantities = [(small.id, 100)].into_iter().collect();
        let ratios = estimate_material_ratios(&orange, &MaterialRatio::conservative_default());

        let calculation =
            calculate_requirements(&orange, &[small], &quantities, &ratios, &two_orange_batches());

        let requirement = &calculation.requirements[0];
        assert_eq!(calculation.total_juice_liters, dec("25"));
        assert_eq!(requirement.required_quantity, dec("50"));
        assert_eq!(requirement.available_quantity, dec("70"));
        assert!(requirement.is_enough);
        assert_eq!(requirement.estimated_cost, Some(dec("1100")));
        assert!(!calculation.has_shortage());
    }

    /// 200 x 250 ml = 50 L needs 100 kg against 70 kg on hand
    #[test]
    fn test_requirement_beyond_stock_needs_confirmation() {
        let orange = product(&["orange"]);
        let small = bottle(250);
        let quantities: BottleQuantities = [(small.id, 200)].into_iter().collect();
        let ratios = estimate_material_ratios(&orange, &MaterialRatio::conservative_default());

        let calculation =
            calculate_requirements(&orange, &[small], &quantities, &ratios, &two_orange_batches());

        let requirement = &calculation.requirements[0];
        assert_eq!(requirement.required_quantity, dec("100"));
        assert!(!requirement.is_enough);
        assert!(calculation.has_shortage());

        let report = calculation.shortage_report();
        assert_eq!(report.len(), 1);
        assert_eq!(report[0].material_type, "orange");
        assert_eq!(report[0].available_quantity, dec("70"));
        assert_eq!(report[0].shortage, dec("30"));
    }

    #[test]
    fn test_material_without_stock_is_short() {
        let mango = product(&["mango"]);
        let liter = bottle(1000);
        let quantities: BottleQuantities = [(liter.id, 1)].into_iter().collect();
        let ratios = estimate_material_ratios(&mango, &MaterialRatio::conservative_default());

        let calculation =
            calculate_requirements(&mango, &[liter], &quantities, &ratios, &MaterialStock::new());

        let requirement = &calculation.requirements[0];
        assert_eq!(requirement.available_quantity, Decimal::ZERO);
        assert!(!requirement.is_enough);
    }

    #[test]
    fn test_stripping_costs_hides_estimates() {
        let mango = product(&["mango"]);
        let liter = bottle(1000);
        let quantities: BottleQuantities = [(liter.id, 1)].into_iter().collect();
        let ratios = estimate_material_ratios(&mango, &MaterialRatio::conservative_default());
        let mut stock = MaterialStock::new();
        stock.insert("mango".to_string(), vec![stock_of("mango", "10", "35")]);

        let mut calculation = calculate_requirements(&mango, &[liter], &quantities, &ratios, &stock);
        assert_eq!(calculation.total_estimated_cost(), Some(dec("70")));

        calculation.strip_costs();
        assert_eq!(calculation.total_estimated_cost(), None);
        assert!(calculation.requirements.iter().all(|r| r.estimated_cost.is_none()));
    }

    #[test]
    fn test_recorded_ratios_take_precedence() {
        let mut mango = product(&["mango", "sugar"]);
        let recorded = MaterialRatio {
            min: dec("1.2"),
            max: dec("1.6"),
            avg: dec("1.4"),
            sample_count: 3,
        };
        let mut history = MaterialRatios::new();
        history.insert("mango".to_string(), recorded);
        mango.average_ratios = Some(history);

        let ratios = estimate_material_ratios(&mango, &MaterialRatio::conservative_default());

        assert_eq!(ratios["mango"], recorded);
        assert!(ratios["mango"].has_history());
        assert_eq!(ratios["sugar"].avg, dec("2.0"));
        assert!(!ratios["sugar"].has_history());
    }

    /// Ratios 20/10 and 50/20 average to 2.25
    #[test]
    fn test_ratio_statistics() {
        let samples = [
            RatioSample { liters_produced: dec("10"), material_used: dec("20") },
            RatioSample { liters_produced: dec("20"), material_used: dec("50") },
            RatioSample { liters_produced: dec("0"), material_used: dec("5") },
        ];

        let stats = compute_ratio_statistics(&samples).unwrap();
        assert_eq!(stats.min, dec("2"));
        assert_eq!(stats.max, dec("2.5"));
        assert_eq!(stats.avg, dec("2.25"));
        assert_eq!(stats.sample_count, 2);
    }

    #[test]
    fn test_ratio_statistics_without_usable_samples() {
        let samples = [RatioSample { liters_produced: dec("10"), material_used: dec("0") }];
        assert!(compute_ratio_statistics(&samples).is_none());
        assert!(compute_ratio_statistics(&[]).is_none());
    }

    #[test]
    fn test_plan_request_validation() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 5);
        let liter = bottle(1000);
        let quantities: BottleQuantities = [(liter.id, 12)].into_iter().collect();

        let err = validate_plan_request(None, date, &quantities).unwrap_err();
        assert_eq!(err.field, "product_id");

        let err = validate_plan_request(Some(Uuid::new_v4()), None, &quantities).unwrap_err();
        assert_eq!(err.field, "production_date");

        let zeroes: BottleQuantities = [(liter.id, 0)].into_iter().collect();
        let err = validate_plan_request(Some(Uuid::new_v4()), date, &zeroes).unwrap_err();
        assert_eq!(err.field, "bottle_quantities");
        assert!(!err.message_th.is_empty());

        assert!(validate_plan_request(Some(Uuid::new_v4()), date, &quantities).is_ok());
    }

    #[test]
    fn test_unknown_bottle_type_rejected() {
        let liter = bottle(1000);
        let quantities: BottleQuantities = [(Uuid::new_v4(), 3)].into_iter().collect();

        let err = validate_known_bottle_types("bottle_quantities", &quantities, &[liter]).unwrap_err();
        assert_eq!(err.field, "bottle_quantities");
    }
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Volume is the sum of size times count over positive counts
    #[test]
    fn prop_volume_sums_positive_counts(
        counts in prop::collection::vec((prop::sample::select(vec![180, 250, 350, 500, 1000]), -5i32..200), 1..6)
    ) {
        let bottles: Vec<BottleType> = counts.iter().map(|(size, _)| bottle(*size)).collect();
        let quantities: BottleQuantities = bottles
            .iter()
            .zip(&counts)
            .map(|(b, (_, qty))| (b.id, *qty))
            .collect();

        let expected_ml: i64 = counts
            .iter()
            .filter(|(_, qty)| *qty > 0)
            .map(|(size, qty)| i64::from(*size) * i64::from(*qty))
            .sum();

        prop_assert_eq!(
            total_volume_liters(&bottles, &quantities),
            Decimal::from(expected_ml) / Decimal::from(1000)
        );
    }

    /// Required quantity equals liters times the average ratio, in recipe order
    #[test]
    fn prop_requirement_scales_with_volume(
        liters in 1i32..500,
        avg_tenths in 5i64..40,
    ) {
        let juice = product(&["orange", "sugar", "lime"]);
        let liter = bottle(1000);
        let quantities: BottleQuantities = [(liter.id, liters)].into_iter().collect();
        let fallback = MaterialRatio {
            min: Decimal::new(avg_tenths, 1),
            max: Decimal::new(avg_tenths, 1),
            avg: Decimal::new(avg_tenths, 1),
            sample_count: 0,
        };
        let ratios = estimate_material_ratios(&juice, &fallback);

        let calculation =
            calculate_requirements(&juice, &[liter], &quantities, &ratios, &MaterialStock::new());

        let order: Vec<&str> = calculation.requirements.iter().map(|r| r.material_type.as_str()).collect();
        prop_assert_eq!(order, vec!["orange", "sugar", "lime"]);
        for requirement in &calculation.requirements {
            prop_assert_eq!(
                requirement.required_quantity,
                Decimal::from(liters) * Decimal::new(avg_tenths, 1)
            );
        }
    }

    /// The enough flag is exactly available >= required
    #[test]
    fn prop_shortage_flag(on_hand in 0i64..20_000, liters in 1i32..50) {
        let juice = product(&["orange"]);
        let liter = bottle(1000);
        let quantities: BottleQuantities = [(liter.id, liters)].into_iter().collect();
        let ratios = estimate_material_ratios(&juice, &MaterialRatio::conservative_default());
        let mut stock = MaterialStock::new();
        stock.insert(
            "orange".to_string(),
            vec![stock_of("orange", &Decimal::new(on_hand, 2).to_string(), "20")],
        );

        let calculation = calculate_requirements(&juice, &[liter], &quantities, &ratios, &stock);
        let requirement = &calculation.requirements[0];

        prop_assert_eq!(
            requirement.is_enough,
            requirement.available_quantity >= requirement.required_quantity
        );
        prop_assert_eq!(calculation.has_shortage(), !requirement.is_enough);
    }

    /// min <= avg <= max for any usable history
    #[test]
    fn prop_ratio_statistics_are_ordered(
        samples in prop::collection::vec((1i64..10_000, 1i64..30_000), 1..12)
    ) {
        let samples: Vec<RatioSample> = samples
            .into_iter()
            .map(|(liters, used)| RatioSample {
                liters_produced: Decimal::new(liters, 1),
                material_used: Decimal::new(used, 1),
            })
            .collect();

        let stats = compute_ratio_statistics(&samples).unwrap();
        prop_assert!(stats.min <= stats.avg);
        prop_assert!(stats.avg <= stats.max);
        prop_assert_eq!(stats.sample_count as usize, samples.len());
    }
}

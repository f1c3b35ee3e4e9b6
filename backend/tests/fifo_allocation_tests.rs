//! FIFO allocation tests
//!
//! Tests for drawing raw materials from inventory batches including:
//! - Oldest batches are consumed first
//! - Allocations never exceed the need or the stock
//! - Depleted batches are reported as finished

use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::models::{
    allocate_fifo, available_quantity, InventoryBatch, InventoryBatchStatus,
};
use std::str::FromStr;
use uuid::Uuid;

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn batch(code: &str, remaining: Decimal, unit_price: Decimal, received_day: i64) -> InventoryBatch {
    let created_at = Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap() + Duration::days(received_day);
    InventoryBatch {
        id: Uuid::new_v4(),
        batch_code: code.to_string(),
        material_type: "orange".to_string(),
        supplier: Some("Chiang Mai Growers".to_string()),
        purchase_date: created_at.date_naive(),
        quantity: remaining,
        remaining_quantity: remaining,
        unit_price,
        status: InventoryBatchStatus::Active,
        created_at,
        finished_at: None,
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// 50 kg drawn from 30 kg @ 20 and 40 kg @ 25
    #[test]
    fn test_draws_oldest_batch_first() {
        let stock = vec![
            batch("ORG-001", dec("30"), dec("20"), 0),
            batch("ORG-002", dec("40"), dec("25"), 1),
        ];

        let allocation = allocate_fifo("orange", &stock, dec("50"));

        assert_eq!(allocation.allocations.len(), 2);
        assert_eq!(allocation.allocations[0].batch_code, "ORG-001");
        assert_eq!(allocation.allocations[0].quantity, dec("30"));
        assert!(allocation.allocations[0].depletes_batch());
        assert_eq!(allocation.allocations[1].quantity, dec("20"));
        assert_eq!(allocation.allocations[1].new_quantity, dec("20"));
        assert!(!allocation.allocations[1].depletes_batch());
        assert_eq!(allocation.cost, dec("1100"));
        assert!(allocation.is_complete());
    }

    /// 100 kg needed with 70 kg on hand
    #[test]
    fn test_shortfall_when_stock_runs_out() {
        let stock = vec![
            batch("ORG-001", dec("30"), dec("20"), 0),
            batch("ORG-002", dec("40"), dec("25"), 1),
        ];

        let allocation = allocate_fifo("orange", &stock, dec("100"));

        assert_eq!(allocation.allocated, dec("70"));
        assert_eq!(allocation.shortfall(), dec("30"));
        assert!(!allocation.is_complete());
        assert!(allocation.allocations.iter().all(|a| a.depletes_batch()));
    }

    #[test]
    fn test_finished_and_empty_batches_are_skipped() {
        let mut finished = batch("ORG-001", dec("10"), dec("20"), 0);
        finished.status = InventoryBatchStatus::Finished;
        let empty = batch("ORG-002", dec("0"), dec("20"), 1);
        let open = batch("ORG-003", dec("15"), dec("22"), 2);
        let stock = vec![finished, empty, open];

        assert_eq!(available_quantity(&stock), dec("15"));

        let allocation = allocate_fifo("orange", &stock, dec("5"));
        assert_eq!(allocation.allocations.len(), 1);
        assert_eq!(allocation.allocations[0].batch_code, "ORG-003");
        assert_eq!(allocation.cost, dec("110"));
    }

    #[test]
    fn test_non_positive_need_allocates_nothing() {
        let stock = vec![batch("ORG-001", dec("30"), dec("20"), 0)];

        for needed in [dec("0"), dec("-4")] {
            let allocation = allocate_fifo("orange", &stock, needed);
            assert!(allocation.allocations.is_empty());
            assert_eq!(allocation.requested, Decimal::ZERO);
            assert_eq!(allocation.cost, Decimal::ZERO);
        }
    }

    #[test]
    fn test_fractional_quantities_keep_precision() {
        let stock = vec![
            batch("ORG-001", dec("12.345"), dec("18.50"), 0),
            batch("ORG-002", dec("7.655"), dec("19.25"), 1),
        ];

        let allocation = allocate_fifo("orange", &stock, dec("20"));

        assert_eq!(allocation.allocated, dec("20"));
        assert_eq!(allocation.allocations[1].new_quantity, Decimal::ZERO);
        assert_eq!(allocation.cost, dec("12.345") * dec("18.50") + dec("7.655") * dec("19.25"));
    }
}

// ============================================================================
// Property Tests
// ============================================================================

fn quantity_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..100_000).prop_map(|cents| Decimal::new(cents, 2))
}

fn stock_strategy() -> impl Strategy<Value = Vec<InventoryBatch>> {
    prop::collection::vec((quantity_strategy(), 1i64..5_000), 0..8).prop_map(|entries| {
        entries
            .into_iter()
            .enumerate()
            .map(|(day, (remaining, price))| {
                batch(
                    &format!("ORG-{:03}", day),
                    remaining,
                    Decimal::new(price, 2),
                    day as i64,
                )
            })
            .collect()
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Allocated quantity is the smaller of need and stock
    #[test]
    fn prop_allocation_is_bounded(stock in stock_strategy(), needed in quantity_strategy()) {
        let available = available_quantity(&stock);
        let allocation = allocate_fifo("orange", &stock, needed);

        prop_assert!(allocation.allocated <= needed);
        prop_assert!(allocation.allocated <= available);
        prop_assert_eq!(allocation.allocated, needed.min(available));
        prop_assert_eq!(allocation.shortfall(), (needed - available).max(Decimal::ZERO));
    }

    /// Every batch before the last one drawn is emptied
    #[test]
    fn prop_only_last_draw_is_partial(stock in stock_strategy(), needed in quantity_strategy()) {
        let allocation = allocate_fifo("orange", &stock, needed);

        if let Some((_, earlier)) = allocation.allocations.split_last() {
            for draw in earlier {
                prop_assert!(draw.depletes_batch());
            }
        }
        for draw in &allocation.allocations {
            prop_assert!(draw.quantity > Decimal::ZERO);
            prop_assert_eq!(draw.previous_quantity - draw.quantity, draw.new_quantity);
            prop_assert!(draw.new_quantity >= Decimal::ZERO);
        }
    }

    /// Draws follow the stock order without gaps
    #[test]
    fn prop_draws_follow_stock_order(stock in stock_strategy(), needed in quantity_strategy()) {
        let allocation = allocate_fifo("orange", &stock, needed);

        let drawn: Vec<Uuid> = allocation.allocations.iter().map(|a| a.inventory_batch_id).collect();
        let leading: Vec<Uuid> = stock.iter().take(drawn.len()).map(|b| b.id).collect();
        prop_assert_eq!(drawn, leading);
    }

    /// Same stock and need always give the same allocation
    #[test]
    fn prop_allocation_is_deterministic(stock in stock_strategy(), needed in quantity_strategy()) {
        let first = allocate_fifo("orange", &stock, needed);
        let second = allocate_fifo("orange", &stock, needed);
        prop_assert_eq!(first, second);
    }

    /// Cost is the sum of quantity times unit price over the draws
    #[test]
    fn prop_cost_matches_draws(stock in stock_strategy(), needed in quantity_strategy()) {
        let allocation = allocate_fifo("orange", &stock, needed);
        let expected: Decimal = allocation
            .allocations
            .iter()
            .map(|a| a.quantity * a.unit_price)
            .sum();
        prop_assert_eq!(allocation.cost, expected);
    }
}

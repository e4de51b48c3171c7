//! Property-based tests for the deduction planner.
//!
//! The planner decides how a consumption is split across batches, so these
//! check conservation, non-negativity and ordering over arbitrary stock.

use chrono::{NaiveDate, Utc};
use poultry_farm_api::{
    entities::feed_batch::{self, FeedBatchStatus},
    errors::ServiceError,
    services::consumption_recorder::plan_deductions,
    services::feed_ledger::validate_quantity,
};
use proptest::prelude::*;
use rust_decimal::Decimal;

/// Quantities with up to three decimal places, as the ledger stores them.
fn quantity_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..200_000).prop_map(|milli| Decimal::new(milli, 3))
}

fn positive_quantity_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..400_000).prop_map(|milli| Decimal::new(milli, 3))
}

fn batches_strategy() -> impl Strategy<Value = Vec<feed_batch::Model>> {
    prop::collection::vec(quantity_strategy(), 0..8).prop_map(|quantities| {
        let now = Utc::now();
        let base = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        quantities
            .into_iter()
            .enumerate()
            .map(|(i, quantity)| feed_batch::Model {
                id: i as i32 + 1,
                feed_type: "Layer Mash".into(),
                quantity,
                purchase_date: base,
                expiry_date: base + chrono::Duration::days(i as i64),
                status: FeedBatchStatus::for_quantity(quantity).to_string(),
                supplier: None,
                unit_cost: None,
                created_at: now,
                updated_at: now,
            })
            .collect()
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn plan_conserves_requested_quantity(
        batches in batches_strategy(),
        requested in positive_quantity_strategy(),
    ) {
        let available: Decimal = batches.iter().map(|b| b.quantity).sum();
        match plan_deductions("Layer Mash", &batches, requested) {
            Ok(plan) => {
                prop_assert!(requested <= available);
                let planned: Decimal = plan.iter().map(|step| step.amount).sum();
                prop_assert_eq!(planned, requested);
            }
            Err(ServiceError::StockAccountingError { shortfall, .. }) => {
                prop_assert!(requested > available);
                prop_assert_eq!(shortfall, requested - available);
            }
            Err(other) => prop_assert!(false, "unexpected error: {}", other),
        }
    }

    #[test]
    fn plan_never_overdraws_a_batch(
        batches in batches_strategy(),
        requested in positive_quantity_strategy(),
    ) {
        if let Ok(plan) = plan_deductions("Layer Mash", &batches, requested) {
            for step in &plan {
                let batch = &batches[step.index];
                prop_assert_eq!(batch.id, step.batch_id);
                prop_assert!(step.amount > Decimal::ZERO);
                prop_assert!(step.amount <= batch.quantity);
                prop_assert!(batch.quantity - step.amount >= Decimal::ZERO);
            }
        }
    }

    #[test]
    fn plan_drains_earlier_batches_before_touching_later_ones(
        batches in batches_strategy(),
        requested in positive_quantity_strategy(),
    ) {
        if let Ok(plan) = plan_deductions("Layer Mash", &batches, requested) {
            // Every touched batch except the last is emptied, and no later
            // non-empty batch is skipped.
            for pair in plan.windows(2) {
                prop_assert!(pair[0].index < pair[1].index);
                prop_assert_eq!(pair[0].amount, batches[pair[0].index].quantity);
                for skipped in &batches[pair[0].index + 1..pair[1].index] {
                    prop_assert_eq!(skipped.quantity, Decimal::ZERO);
                }
            }
            if let Some(first) = plan.first() {
                for skipped in &batches[..first.index] {
                    prop_assert_eq!(skipped.quantity, Decimal::ZERO);
                }
            }
        }
    }

    #[test]
    fn ledger_scale_quantities_validate(quantity in positive_quantity_strategy()) {
        prop_assert!(validate_quantity(&quantity).is_ok());
    }

    #[test]
    fn non_positive_quantities_never_validate(milli in -400_000i64..=0) {
        prop_assert!(validate_quantity(&Decimal::new(milli, 3)).is_err());
    }
}

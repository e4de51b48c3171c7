mod common;

use assert_matches::assert_matches;
use common::{date, TestApp};
use poultry_farm_api::{
    entities::feed_batch::{self, FeedBatchStatus},
    errors::ServiceError,
    services::{consumption_recorder::NewConsumption, feed_ledger},
};
use rust_decimal_macros::dec;

#[tokio::test]
async fn deducting_more_than_remaining_is_an_invalid_deduction() {
    let app = TestApp::new().await;
    let batch = app
        .seed_batch("Grower", dec!(1.835), date(2024, 12, 1), date(2025, 3, 1))
        .await;
    let batch = app.batch(batch.id).await;

    let err = feed_ledger::deduct(app.state.db.as_ref(), &batch, dec!(2.835))
        .await
        .unwrap_err();

    assert_matches!(
        err,
        ServiceError::InvalidDeduction { batch_id, requested, remaining }
            if batch_id == batch.id && requested == dec!(2.835) && remaining == dec!(1.835)
    );
    assert_eq!(app.batch(batch.id).await.quantity, dec!(1.835));
}

#[tokio::test]
async fn negative_deduction_is_rejected() {
    let app = TestApp::new().await;
    let batch = app
        .seed_batch("Grower", dec!(10), date(2024, 12, 1), date(2025, 3, 1))
        .await;

    let err = feed_ledger::deduct(app.state.db.as_ref(), &batch, dec!(-1))
        .await
        .unwrap_err();

    assert_matches!(err, ServiceError::InvalidDeduction { .. });
    assert_eq!(app.batch(batch.id).await.quantity, dec!(10));
}

#[tokio::test]
async fn deduction_against_a_stale_quantity_is_an_accounting_error() {
    let app = TestApp::new().await;
    let batch = app
        .seed_batch("Grower", dec!(20), date(2024, 12, 1), date(2025, 3, 1))
        .await;
    let stale = feed_batch::Model {
        quantity: batch.quantity + dec!(5),
        ..batch.clone()
    };

    let err = feed_ledger::deduct(app.state.db.as_ref(), &stale, dec!(1))
        .await
        .unwrap_err();

    assert_matches!(
        err,
        ServiceError::StockAccountingError { ref feed_type, shortfall }
            if feed_type == "Grower" && shortfall == dec!(1)
    );
    assert_eq!(app.batch(batch.id).await.quantity, dec!(20));
}

#[tokio::test]
async fn deduction_against_a_batch_drained_elsewhere_is_an_accounting_error() {
    let app = TestApp::new().await;
    let flock = app.seed_flock("Hillside Pasture").await;
    let batch = app
        .seed_batch("Grower", dec!(12), date(2024, 12, 1), date(2025, 3, 1))
        .await;
    let snapshot = app.batch(batch.id).await;

    app.state
        .consumption_recorder
        .record_consumption(NewConsumption {
            flock_id: flock.id,
            feed_type: "Grower".into(),
            quantity: dec!(12),
            feeding_date: date(2025, 1, 5),
            notes: None,
            recorded_by: app.user_id,
        })
        .await
        .expect("consumption recorded");

    let err = feed_ledger::deduct(app.state.db.as_ref(), &snapshot, dec!(3))
        .await
        .unwrap_err();

    assert_matches!(err, ServiceError::StockAccountingError { .. });
    let current = app.batch(batch.id).await;
    assert_eq!(current.quantity, dec!(0));
    assert_eq!(current.status, FeedBatchStatus::Depleted.to_string());
}

#[tokio::test]
async fn exact_deduction_depletes_the_batch() {
    let app = TestApp::new().await;
    let batch = app
        .seed_batch("Starter", dec!(12.345), date(2024, 12, 1), date(2025, 3, 1))
        .await;
    let batch = app.batch(batch.id).await;

    let updated = feed_ledger::deduct(app.state.db.as_ref(), &batch, dec!(12.345))
        .await
        .expect("deduction applied");

    assert_eq!(updated.quantity, dec!(0));
    let stored = app.batch(batch.id).await;
    assert_eq!(stored.quantity, dec!(0));
    assert_eq!(stored.status, FeedBatchStatus::Depleted.to_string());
}

mod common;

use std::time::Duration;

use assert_matches::assert_matches;
use common::{date, TestApp};
use poultry_farm_api::{
    entities::feed_batch::FeedBatchStatus,
    errors::ServiceError,
    services::consumption_recorder::{ConsumptionFilter, NewConsumption},
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn consumption(app: &TestApp, flock_id: i32, feed_type: &str, quantity: Decimal) -> NewConsumption {
    NewConsumption {
        flock_id,
        feed_type: feed_type.to_string(),
        quantity,
        feeding_date: date(2025, 1, 5),
        notes: None,
        recorded_by: app.user_id,
    }
}

#[tokio::test]
async fn consumption_spills_from_soonest_expiry_into_next_batch() {
    let app = TestApp::new().await;
    let flock = app.seed_flock("North Barn Layers").await;
    let a = app
        .seed_batch("Layer Mash", dec!(30), date(2024, 12, 1), date(2025, 1, 10))
        .await;
    let b = app
        .seed_batch("Layer Mash", dec!(50), date(2024, 12, 15), date(2025, 2, 1))
        .await;

    let recorded = app
        .state
        .consumption_recorder
        .record_consumption(consumption(&app, flock.id, "Layer Mash", dec!(40)))
        .await
        .expect("consumption recorded");

    let a = app.batch(a.id).await;
    let b = app.batch(b.id).await;
    assert_eq!(a.quantity, dec!(0));
    assert_eq!(a.status, FeedBatchStatus::Depleted.to_string());
    assert_eq!(b.quantity, dec!(40));
    assert_eq!(b.status, FeedBatchStatus::InStock.to_string());

    assert_eq!(app.consumption_count().await, 1);
    assert_eq!(recorded.record.quantity, dec!(40));
    assert_eq!(recorded.record.flock_id, flock.id);
    assert_eq!(recorded.record.recorded_by, app.user_id);

    let drawn: Vec<(i32, Decimal)> = recorded
        .deductions
        .iter()
        .map(|d| (d.batch_id, d.quantity))
        .collect();
    assert_eq!(drawn, vec![(a.id, dec!(30)), (b.id, dec!(10))]);

    assert_eq!(
        app.state
            .feed_inventory
            .available_quantity("Layer Mash")
            .await
            .unwrap(),
        dec!(40)
    );
}

#[tokio::test]
async fn exact_fit_depletes_every_batch() {
    let app = TestApp::new().await;
    let flock = app.seed_flock("Broiler House 2").await;
    let a = app
        .seed_batch("Grower", dec!(12.5), date(2024, 11, 1), date(2025, 3, 1))
        .await;
    let b = app
        .seed_batch("Grower", dec!(7.5), date(2024, 11, 5), date(2025, 4, 1))
        .await;

    app.state
        .consumption_recorder
        .record_consumption(consumption(&app, flock.id, "Grower", dec!(20)))
        .await
        .expect("consumption recorded");

    for id in [a.id, b.id] {
        let batch = app.batch(id).await;
        assert_eq!(batch.quantity, dec!(0));
        assert_eq!(batch.status, FeedBatchStatus::Depleted.to_string());
    }
    assert_eq!(
        app.state
            .feed_inventory
            .available_quantity("Grower")
            .await
            .unwrap(),
        dec!(0)
    );
}

#[tokio::test]
async fn same_expiry_consumes_oldest_purchase_first() {
    let app = TestApp::new().await;
    let flock = app.seed_flock("Pullets").await;
    let newer = app
        .seed_batch("Starter", dec!(20), date(2024, 12, 20), date(2025, 3, 1))
        .await;
    let older = app
        .seed_batch("Starter", dec!(20), date(2024, 12, 1), date(2025, 3, 1))
        .await;
    let later_expiry = app
        .seed_batch("Starter", dec!(20), date(2024, 11, 1), date(2025, 5, 1))
        .await;

    app.state
        .consumption_recorder
        .record_consumption(consumption(&app, flock.id, "Starter", dec!(25)))
        .await
        .expect("consumption recorded");

    assert_eq!(app.batch(older.id).await.quantity, dec!(0));
    assert_eq!(app.batch(newer.id).await.quantity, dec!(15));
    assert_eq!(app.batch(later_expiry.id).await.quantity, dec!(20));
}

#[tokio::test]
async fn other_feed_types_are_untouched() {
    let app = TestApp::new().await;
    let flock = app.seed_flock("North Barn Layers").await;
    let mash = app
        .seed_batch("Layer Mash", dec!(30), date(2024, 12, 1), date(2025, 1, 10))
        .await;
    let grit = app
        .seed_batch("Oyster Grit", dec!(30), date(2024, 10, 1), date(2025, 1, 1))
        .await;

    app.state
        .consumption_recorder
        .record_consumption(consumption(&app, flock.id, "Layer Mash", dec!(10)))
        .await
        .expect("consumption recorded");

    assert_eq!(app.batch(mash.id).await.quantity, dec!(20));
    assert_eq!(app.batch(grit.id).await.quantity, dec!(30));
}

#[tokio::test]
async fn insufficient_stock_changes_nothing() {
    let app = TestApp::new().await;
    let flock = app.seed_flock("North Barn Layers").await;
    let a = app
        .seed_batch("Layer Mash", dec!(10), date(2024, 12, 1), date(2025, 1, 10))
        .await;
    let b = app
        .seed_batch("Layer Mash", dec!(15), date(2024, 12, 2), date(2025, 1, 20))
        .await;

    let err = app
        .state
        .consumption_recorder
        .record_consumption(consumption(&app, flock.id, "Layer Mash", dec!(40)))
        .await
        .unwrap_err();

    assert_matches!(
        err,
        ServiceError::InsufficientStock { requested, available }
            if requested == dec!(40) && available == dec!(25)
    );
    assert_eq!(app.consumption_count().await, 0);
    assert_eq!(app.batch(a.id).await.quantity, dec!(10));
    assert_eq!(app.batch(b.id).await.quantity, dec!(15));
}

#[tokio::test]
async fn unknown_feed_type_is_insufficient_stock() {
    let app = TestApp::new().await;
    let flock = app.seed_flock("North Barn Layers").await;

    let err = app
        .state
        .consumption_recorder
        .record_consumption(consumption(&app, flock.id, "Scratch Grains", dec!(1)))
        .await
        .unwrap_err();

    assert_matches!(
        err,
        ServiceError::InsufficientStock { available, .. } if available == Decimal::ZERO
    );
}

#[tokio::test]
async fn invalid_quantity_is_rejected_before_any_write() {
    let app = TestApp::new().await;
    let flock = app.seed_flock("North Barn Layers").await;
    let a = app
        .seed_batch("Layer Mash", dec!(30), date(2024, 12, 1), date(2025, 1, 10))
        .await;

    for quantity in [dec!(0), dec!(-5), dec!(1.2345)] {
        let err = app
            .state
            .consumption_recorder
            .record_consumption(consumption(&app, flock.id, "Layer Mash", quantity))
            .await
            .unwrap_err();
        assert_matches!(err, ServiceError::ValidationError(_));
    }

    assert_eq!(app.consumption_count().await, 0);
    assert_eq!(app.batch(a.id).await.quantity, dec!(30));
}

#[tokio::test]
async fn missing_flock_is_not_found() {
    let app = TestApp::new().await;
    app.seed_batch("Layer Mash", dec!(30), date(2024, 12, 1), date(2025, 1, 10))
        .await;

    let err = app
        .state
        .consumption_recorder
        .record_consumption(consumption(&app, 9_999, "Layer Mash", dec!(5)))
        .await
        .unwrap_err();

    assert_matches!(err, ServiceError::NotFound(_));
    assert_eq!(app.consumption_count().await, 0);
}

#[tokio::test]
async fn retired_flock_cannot_be_fed() {
    let app = TestApp::new().await;
    let flock = app.seed_flock("Spent Hens").await;
    let a = app
        .seed_batch("Layer Mash", dec!(30), date(2024, 12, 1), date(2025, 1, 10))
        .await;
    app.execute_sql(&format!(
        "UPDATE flocks SET status = 'retired' WHERE id = {}",
        flock.id
    ))
    .await;

    let err = app
        .state
        .consumption_recorder
        .record_consumption(consumption(&app, flock.id, "Layer Mash", dec!(5)))
        .await
        .unwrap_err();

    assert_matches!(err, ServiceError::ValidationError(_));
    assert_eq!(app.batch(a.id).await.quantity, dec!(30));
}

#[tokio::test]
async fn failure_mid_walk_rolls_back_everything() {
    let app = TestApp::new().await;
    let flock = app.seed_flock("North Barn Layers").await;
    let a = app
        .seed_batch("Layer Mash", dec!(10), date(2024, 12, 1), date(2025, 1, 10))
        .await;
    let b = app
        .seed_batch("Layer Mash", dec!(10), date(2024, 12, 1), date(2025, 1, 20))
        .await;
    let c = app
        .seed_batch("Layer Mash", dec!(10), date(2024, 12, 1), date(2025, 1, 30))
        .await;

    app.execute_sql(&format!(
        "CREATE TRIGGER fail_second_batch BEFORE UPDATE ON feed_inventory \
         WHEN OLD.id = {} BEGIN SELECT RAISE(ABORT, 'injected failure'); END;",
        b.id
    ))
    .await;

    let err = app
        .state
        .consumption_recorder
        .record_consumption(consumption(&app, flock.id, "Layer Mash", dec!(25)))
        .await
        .unwrap_err();

    assert_matches!(err, ServiceError::DatabaseError(_));
    assert_eq!(app.consumption_count().await, 0);
    assert_eq!(app.deduction_count().await, 0);
    for id in [a.id, b.id, c.id] {
        let batch = app.batch(id).await;
        assert_eq!(batch.quantity, dec!(10));
        assert_eq!(batch.status, FeedBatchStatus::InStock.to_string());
    }
}

#[tokio::test]
async fn recording_with_no_time_budget_persists_nothing() {
    let app = TestApp::new().await;
    let flock = app.seed_flock("North Barn Layers").await;
    let a = app
        .seed_batch("Layer Mash", dec!(30), date(2024, 12, 1), date(2025, 1, 10))
        .await;

    let recorder = app.recorder_with_timeout(Duration::ZERO);
    let err = recorder
        .record_consumption(consumption(&app, flock.id, "Layer Mash", dec!(5)))
        .await
        .unwrap_err();

    assert_matches!(err, ServiceError::Timeout(_));
    assert_eq!(app.consumption_count().await, 0);
    assert_eq!(app.batch(a.id).await.quantity, dec!(30));
}

#[tokio::test]
async fn recording_interrupted_mid_transaction_is_rolled_back() {
    let app = TestApp::new().await;
    let flock = app.seed_flock("North Barn Layers").await;
    let a = app
        .seed_batch("Layer Mash", dec!(30), date(2024, 12, 1), date(2025, 1, 10))
        .await;

    // Makes the consumption insert grind through a large cross join so the
    // deadline expires while the transaction is open.
    app.execute_sql("CREATE TABLE slow_rows (x INTEGER NOT NULL)").await;
    app.execute_sql(
        "WITH RECURSIVE seq(x) AS (SELECT 1 UNION ALL SELECT x + 1 FROM seq WHERE x < 350) \
         INSERT INTO slow_rows (x) SELECT x FROM seq",
    )
    .await;
    app.execute_sql(
        "CREATE TRIGGER slow_consumption_insert AFTER INSERT ON feed_consumption \
         BEGIN SELECT count(*) FROM slow_rows a, slow_rows b, slow_rows c; END;",
    )
    .await;

    let recorder = app.recorder_with_timeout(Duration::from_millis(100));
    let err = recorder
        .record_consumption(consumption(&app, flock.id, "Layer Mash", dec!(5)))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Timeout(_));

    // The dropped transaction is rolled back before the connection is reused.
    assert_eq!(app.consumption_count().await, 0);
    assert_eq!(app.deduction_count().await, 0);
    let batch = app.batch(a.id).await;
    assert_eq!(batch.quantity, dec!(30));
    assert_eq!(batch.status, FeedBatchStatus::InStock.to_string());
}

#[tokio::test]
async fn deductions_sum_to_recorded_quantity() {
    let app = TestApp::new().await;
    let flock = app.seed_flock("North Barn Layers").await;
    for (qty, expiry) in [
        (dec!(4), date(2025, 1, 1)),
        (dec!(6), date(2025, 1, 2)),
        (dec!(8), date(2025, 1, 3)),
    ] {
        app.seed_batch("Layer Mash", qty, date(2024, 12, 1), expiry)
            .await;
    }

    let recorded = app
        .state
        .consumption_recorder
        .record_consumption(consumption(&app, flock.id, "Layer Mash", dec!(15)))
        .await
        .expect("consumption recorded");

    let fetched = app
        .state
        .consumption_recorder
        .get_consumption(recorded.record.id)
        .await
        .expect("consumption detail");

    let total: Decimal = fetched.deductions.iter().map(|d| d.quantity).sum();
    assert_eq!(total, dec!(15));
    assert_eq!(fetched.deductions.len(), 3);
    assert_eq!(app.deduction_count().await, 3);
}

#[tokio::test]
async fn history_is_filtered_and_newest_first() {
    let app = TestApp::new().await;
    let north = app.seed_flock("North Barn Layers").await;
    let south = app.seed_flock("South Barn Broilers").await;
    app.seed_batch("Layer Mash", dec!(100), date(2024, 12, 1), date(2025, 6, 1))
        .await;

    for (flock_id, day) in [(north.id, 3), (south.id, 4), (north.id, 5)] {
        let mut request = consumption(&app, flock_id, "Layer Mash", dec!(2));
        request.feeding_date = date(2025, 1, day);
        app.state
            .consumption_recorder
            .record_consumption(request)
            .await
            .expect("consumption recorded");
    }

    let (records, total) = app
        .state
        .consumption_recorder
        .list_consumption(
            ConsumptionFilter {
                flock_id: Some(north.id),
                feed_type: None,
            },
            1,
            20,
        )
        .await
        .unwrap();

    assert_eq!(total, 2);
    assert_eq!(records[0].feeding_date, date(2025, 1, 5));
    assert_eq!(records[1].feeding_date, date(2025, 1, 3));

    let (page_two, total_all) = app
        .state
        .consumption_recorder
        .list_consumption(ConsumptionFilter::default(), 2, 2)
        .await
        .unwrap();
    assert_eq!(total_all, 3);
    assert_eq!(page_two.len(), 1);
    assert_eq!(page_two[0].feeding_date, date(2025, 1, 3));
}

#[tokio::test]
async fn committed_consumption_is_written_to_activity_log() {
    let app = TestApp::new().await;
    let flock = app.seed_flock("North Barn Layers").await;
    app.seed_batch("Layer Mash", dec!(30), date(2024, 12, 1), date(2025, 1, 10))
        .await;

    app.state
        .consumption_recorder
        .record_consumption(consumption(&app, flock.id, "Layer Mash", dec!(12)))
        .await
        .expect("consumption recorded");

    let expected = format!(
        "Recorded feed consumption of 12 kg Layer Mash for flock #{}",
        flock.id
    );
    let mut found = false;
    for _ in 0..50 {
        let entries = app.state.activity_log.recent(10).await.unwrap();
        if entries
            .iter()
            .any(|e| e.action == "feed_consumption" && e.description == expected)
        {
            found = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(found, "activity log entry not written");
}

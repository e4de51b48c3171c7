//! Transactional feed-consumption recording.
//!
//! A recording either commits the consumption row, one deduction row per batch
//! touched and every batch update together, or leaves the database untouched.

use crate::{
    db::DbPool,
    entities::{
        consumption_deduction::{self, Entity as ConsumptionDeduction},
        feed_batch,
        feed_consumption::{self, Entity as FeedConsumption},
        flock::Entity as Flock,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::feed_ledger::{self, validate_not_blank, validate_quantity},
};
use chrono::{NaiveDate, Utc};
use metrics::{counter, histogram};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseTransaction, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionError, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

/// A validated-on-entry consumption request.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewConsumption {
    #[validate(range(min = 1))]
    pub flock_id: i32,
    #[validate(length(min = 1, max = 100), custom = "validate_not_blank")]
    pub feed_type: String,
    #[validate(custom = "validate_quantity")]
    pub quantity: Decimal,
    pub feeding_date: NaiveDate,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
    pub recorded_by: Uuid,
}

/// One step of the deduction walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannedDeduction {
    /// Index into the batch slice the plan was built from.
    pub index: usize,
    pub batch_id: i32,
    pub amount: Decimal,
}

/// Splits `quantity` across `batches` in the order given, taking from each
/// batch until the request is covered.
///
/// Running out of batches with quantity still outstanding means the stock check
/// was stale and yields `StockAccountingError` with the uncovered remainder.
pub fn plan_deductions(
    feed_type: &str,
    batches: &[feed_batch::Model],
    quantity: Decimal,
) -> Result<Vec<PlannedDeduction>, ServiceError> {
    let mut remaining = quantity;
    let mut plan = Vec::new();

    for (index, batch) in batches.iter().enumerate() {
        if remaining <= Decimal::ZERO {
            break;
        }
        let amount = remaining.min(batch.quantity);
        if amount <= Decimal::ZERO {
            continue;
        }
        plan.push(PlannedDeduction {
            index,
            batch_id: batch.id,
            amount,
        });
        remaining -= amount;
    }

    if remaining > Decimal::ZERO {
        return Err(ServiceError::StockAccountingError {
            feed_type: feed_type.to_string(),
            shortfall: remaining,
        });
    }

    Ok(plan)
}

/// A committed consumption with its per-batch audit trail.
#[derive(Debug, Clone, Serialize)]
pub struct RecordedConsumption {
    pub record: feed_consumption::Model,
    pub deductions: Vec<consumption_deduction::Model>,
}

/// Filters for listing consumption history.
#[derive(Debug, Clone, Default)]
pub struct ConsumptionFilter {
    pub flock_id: Option<i32>,
    pub feed_type: Option<String>,
}

/// Records feed consumption against the ledger and serves consumption history.
#[derive(Clone)]
pub struct ConsumptionRecorder {
    db_pool: Arc<DbPool>,
    event_sender: EventSender,
    timeout: Duration,
}

impl ConsumptionRecorder {
    pub fn new(db_pool: Arc<DbPool>, event_sender: EventSender, timeout: Duration) -> Self {
        Self {
            db_pool,
            event_sender,
            timeout,
        }
    }

    /// Validates, checks stock and deducts FIFO-by-freshness in one transaction.
    #[instrument(
        skip(self, request),
        fields(
            flock_id = request.flock_id,
            feed_type = %request.feed_type,
            quantity = %request.quantity
        )
    )]
    pub async fn record_consumption(
        &self,
        request: NewConsumption,
    ) -> Result<RecordedConsumption, ServiceError> {
        if let Err(e) = request.validate() {
            counter!("feed_consumption.rejected", 1, "reason" => "validation");
            return Err(e.into());
        }

        let start = Instant::now();
        let work = self
            .db_pool
            .transaction::<_, RecordedConsumption, ServiceError>(move |txn| {
                Box::pin(async move { apply_consumption(txn, request).await })
            });

        // Dropping the transaction on timeout rolls it back and releases row locks.
        let result = match tokio::time::timeout(self.timeout, work).await {
            Ok(outcome) => outcome.map_err(|e| match e {
                TransactionError::Connection(db_err) => ServiceError::db_error(db_err),
                TransactionError::Transaction(service_err) => service_err,
            }),
            Err(_) => Err(ServiceError::Timeout(format!(
                "consumption recording exceeded {:?}",
                self.timeout
            ))),
        };

        histogram!(
            "feed_consumption.duration_seconds",
            start.elapsed().as_secs_f64()
        );

        match &result {
            Ok(recorded) => {
                counter!("feed_consumption.recorded", 1);
                info!(
                    consumption_id = recorded.record.id,
                    batches_touched = recorded.deductions.len(),
                    "Feed consumption recorded"
                );
                self.event_sender
                    .send_or_log(Event::FeedConsumed {
                        consumption_id: recorded.record.id,
                        flock_id: recorded.record.flock_id,
                        feed_type: recorded.record.feed_type.clone(),
                        quantity: recorded.record.quantity,
                        batches_touched: recorded.deductions.len(),
                        recorded_by: recorded.record.recorded_by,
                    });
            }
            Err(e) => log_rejection(e),
        }

        result
    }

    /// Consumption history, newest feeding first. Pages are 1-based.
    pub async fn list_consumption(
        &self,
        filter: ConsumptionFilter,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<feed_consumption::Model>, u64), ServiceError> {
        let mut query = FeedConsumption::find();
        if let Some(flock_id) = filter.flock_id {
            query = query.filter(feed_consumption::Column::FlockId.eq(flock_id));
        }
        if let Some(feed_type) = filter.feed_type {
            query = query.filter(feed_consumption::Column::FeedType.eq(feed_type));
        }

        let paginator = query
            .order_by_desc(feed_consumption::Column::FeedingDate)
            .order_by_desc(feed_consumption::Column::Id)
            .paginate(self.db_pool.as_ref(), per_page.max(1));

        let total = paginator.num_items().await.map_err(ServiceError::db_error)?;
        let records = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(ServiceError::db_error)?;

        Ok((records, total))
    }

    /// One consumption with the batches it drew from.
    pub async fn get_consumption(&self, id: i32) -> Result<RecordedConsumption, ServiceError> {
        let db = self.db_pool.as_ref();
        let record = FeedConsumption::find_by_id(id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Consumption record {} not found", id)))?;

        let deductions = ConsumptionDeduction::find()
            .filter(consumption_deduction::Column::ConsumptionId.eq(id))
            .order_by_asc(consumption_deduction::Column::Id)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        Ok(RecordedConsumption { record, deductions })
    }
}

async fn apply_consumption(
    txn: &DatabaseTransaction,
    request: NewConsumption,
) -> Result<RecordedConsumption, ServiceError> {
    let flock = Flock::find_by_id(request.flock_id)
        .one(txn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::NotFound(format!("Flock {} not found", request.flock_id)))?;
    if !flock.is_active() {
        return Err(ServiceError::ValidationError(format!(
            "Flock {} is {} and cannot be fed",
            flock.id, flock.status
        )));
    }

    let feed_type = request.feed_type.trim().to_string();

    // Locks the candidate rows (Postgres) before availability is computed.
    let batches = feed_ledger::batches_ordered_for_consumption(txn, &feed_type, true).await?;
    let available = feed_ledger::total_quantity(&batches);
    if request.quantity > available {
        return Err(ServiceError::InsufficientStock {
            requested: request.quantity,
            available,
        });
    }

    let now = Utc::now();
    let record = feed_consumption::ActiveModel {
        flock_id: Set(flock.id),
        feed_type: Set(feed_type.clone()),
        quantity: Set(request.quantity),
        feeding_date: Set(request.feeding_date),
        notes: Set(request.notes.filter(|n| !n.trim().is_empty())),
        recorded_by: Set(request.recorded_by),
        created_at: Set(now),
        ..Default::default()
    }
    .insert(txn)
    .await
    .map_err(ServiceError::db_error)?;

    let plan = plan_deductions(&feed_type, &batches, request.quantity)?;

    let mut deductions = Vec::with_capacity(plan.len());
    for step in plan {
        feed_ledger::deduct(txn, &batches[step.index], step.amount).await?;

        let deduction = consumption_deduction::ActiveModel {
            consumption_id: Set(record.id),
            batch_id: Set(step.batch_id),
            quantity: Set(step.amount),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(txn)
        .await
        .map_err(ServiceError::db_error)?;
        deductions.push(deduction);
    }

    Ok(RecordedConsumption { record, deductions })
}

fn log_rejection(err: &ServiceError) {
    match err {
        ServiceError::StockAccountingError {
            feed_type,
            shortfall,
        } => {
            counter!("feed_consumption.rejected", 1, "reason" => "stock_accounting");
            error!(
                target: "stock_accounting_error",
                feed_type = %feed_type,
                shortfall = %shortfall,
                "Stock accounting mismatch while recording consumption; transaction rolled back"
            );
        }
        ServiceError::InvalidDeduction { .. } => {
            counter!("feed_consumption.rejected", 1, "reason" => "invalid_deduction");
            error!(error = %err, "Consumption recording rolled back");
        }
        ServiceError::InsufficientStock {
            requested,
            available,
        } => {
            counter!("feed_consumption.rejected", 1, "reason" => "insufficient_stock");
            info!(requested = %requested, available = %available, "Insufficient feed stock");
        }
        ServiceError::Timeout(_) => {
            counter!("feed_consumption.rejected", 1, "reason" => "timeout");
            warn!(error = %err, "Consumption recording timed out; transaction rolled back");
        }
        ServiceError::NotFound(_) | ServiceError::ValidationError(_) => {
            counter!("feed_consumption.rejected", 1, "reason" => "validation");
        }
        _ => {
            counter!("feed_consumption.rejected", 1, "reason" => "internal");
            error!(error = %err, "Consumption recording failed; transaction rolled back");
        }
    }
}

//! Feed inventory ledger.
//!
//! The free functions take any [`ConnectionTrait`] so the consumption recorder
//! can run them inside its transaction; [`FeedInventoryService`] wraps them for
//! pool-level reads and inventory receipt.

use crate::{
    db::DbPool,
    entities::feed_batch::{self, Entity as FeedBatch, FeedBatchStatus},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, DbBackend, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// Quantities are stored with three decimal places.
pub const QUANTITY_SCALE: u32 = 3;

/// In-stock batches of `feed_type`, soonest expiry first, then oldest purchase, then id.
///
/// With `lock` set on Postgres the rows are selected `FOR UPDATE` and stay
/// locked until the surrounding transaction ends.
pub async fn batches_ordered_for_consumption<C: ConnectionTrait>(
    conn: &C,
    feed_type: &str,
    lock: bool,
) -> Result<Vec<feed_batch::Model>, ServiceError> {
    let mut query = FeedBatch::find()
        .filter(feed_batch::Column::FeedType.eq(feed_type))
        .filter(feed_batch::Column::Status.eq(FeedBatchStatus::InStock.as_ref()))
        .order_by_asc(feed_batch::Column::ExpiryDate)
        .order_by_asc(feed_batch::Column::PurchaseDate)
        .order_by_asc(feed_batch::Column::Id);

    if lock && conn.get_database_backend() == DbBackend::Postgres {
        query = query.lock_exclusive();
    }

    query.all(conn).await.map_err(ServiceError::db_error)
}

/// Sum of remaining quantity across in-stock batches of `feed_type`; zero when none exist.
pub async fn available_quantity<C: ConnectionTrait>(
    conn: &C,
    feed_type: &str,
) -> Result<Decimal, ServiceError> {
    let batches = batches_ordered_for_consumption(conn, feed_type, false).await?;
    Ok(total_quantity(&batches))
}

pub fn total_quantity(batches: &[feed_batch::Model]) -> Decimal {
    batches.iter().map(|b| b.quantity).sum()
}

/// Takes `amount` out of `batch`, flipping it to `depleted` when nothing remains.
///
/// The update only applies if the row still holds the quantity we read and is
/// still in stock; a lost race surfaces as `StockAccountingError`.
pub async fn deduct<C: ConnectionTrait>(
    conn: &C,
    batch: &feed_batch::Model,
    amount: Decimal,
) -> Result<feed_batch::Model, ServiceError> {
    if amount < Decimal::ZERO || amount > batch.quantity {
        error!(
            batch_id = batch.id,
            requested = %amount,
            remaining = %batch.quantity,
            "Invalid deduction against feed batch"
        );
        return Err(ServiceError::InvalidDeduction {
            batch_id: batch.id,
            requested: amount,
            remaining: batch.quantity,
        });
    }

    let new_quantity = batch.quantity - amount;
    let new_status = FeedBatchStatus::for_quantity(new_quantity);
    let now = Utc::now();

    let result = FeedBatch::update_many()
        .col_expr(feed_batch::Column::Quantity, Expr::value(new_quantity))
        .col_expr(feed_batch::Column::Status, Expr::value(new_status.as_ref()))
        .col_expr(feed_batch::Column::UpdatedAt, Expr::value(now))
        .filter(feed_batch::Column::Id.eq(batch.id))
        .filter(feed_batch::Column::Quantity.eq(batch.quantity))
        .filter(feed_batch::Column::Status.eq(FeedBatchStatus::InStock.as_ref()))
        .exec(conn)
        .await
        .map_err(ServiceError::db_error)?;

    if result.rows_affected == 0 {
        error!(
            target: "stock_accounting_error",
            batch_id = batch.id,
            feed_type = %batch.feed_type,
            expected_quantity = %batch.quantity,
            "Feed batch changed underneath a deduction"
        );
        return Err(ServiceError::StockAccountingError {
            feed_type: batch.feed_type.clone(),
            shortfall: amount,
        });
    }

    Ok(feed_batch::Model {
        quantity: new_quantity,
        status: new_status.to_string(),
        updated_at: now,
        ..batch.clone()
    })
}

/// Rejects quantities the ledger cannot store exactly.
pub fn validate_quantity(quantity: &Decimal) -> Result<(), ValidationError> {
    if *quantity <= Decimal::ZERO {
        let mut err = ValidationError::new("range");
        err.message = Some("must be greater than zero".into());
        return Err(err);
    }
    if quantity.normalize().scale() > QUANTITY_SCALE {
        let mut err = ValidationError::new("scale");
        err.message = Some(format!("supports at most {QUANTITY_SCALE} decimal places").into());
        return Err(err);
    }
    Ok(())
}

pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("cannot be blank".into());
        return Err(err);
    }
    Ok(())
}

fn validate_non_negative(value: &Decimal) -> Result<(), ValidationError> {
    if *value < Decimal::ZERO {
        let mut err = ValidationError::new("range");
        err.message = Some("cannot be negative".into());
        return Err(err);
    }
    Ok(())
}

fn validate_batch_dates(batch: &NewFeedBatch) -> Result<(), ValidationError> {
    if batch.expiry_date < batch.purchase_date {
        let mut err = ValidationError::new("expiry_date");
        err.message = Some("expiry_date cannot be before purchase_date".into());
        return Err(err);
    }
    Ok(())
}

/// A delivery of feed to be added to the ledger.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_batch_dates"))]
pub struct NewFeedBatch {
    #[validate(length(min = 1, max = 100), custom = "validate_not_blank")]
    pub feed_type: String,
    #[validate(custom = "validate_quantity")]
    pub quantity: Decimal,
    pub purchase_date: NaiveDate,
    pub expiry_date: NaiveDate,
    #[validate(length(max = 200))]
    pub supplier: Option<String>,
    #[validate(custom = "validate_non_negative")]
    pub unit_cost: Option<Decimal>,
}

/// Aggregate in-stock position for one feed type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FeedStockSummary {
    pub feed_type: String,
    pub total_quantity: Decimal,
    pub batch_count: usize,
    pub earliest_expiry: Option<NaiveDate>,
}

/// In-stock batches of one feed type in the order they will be consumed.
#[derive(Debug, Clone, Serialize)]
pub struct FeedTypeStock {
    pub feed_type: String,
    pub available_quantity: Decimal,
    pub batches: Vec<feed_batch::Model>,
}

/// Pool-level ledger operations: receipt and stock reads.
#[derive(Clone)]
pub struct FeedInventoryService {
    db_pool: Arc<DbPool>,
    event_sender: EventSender,
}

impl FeedInventoryService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: EventSender) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Records a delivery as a new in-stock batch.
    #[instrument(skip(self, batch), fields(feed_type = %batch.feed_type, quantity = %batch.quantity))]
    pub async fn receive_batch(
        &self,
        batch: NewFeedBatch,
        received_by: Uuid,
    ) -> Result<feed_batch::Model, ServiceError> {
        batch.validate()?;

        let now = Utc::now();
        let model = feed_batch::ActiveModel {
            feed_type: Set(batch.feed_type.trim().to_string()),
            quantity: Set(batch.quantity),
            purchase_date: Set(batch.purchase_date),
            expiry_date: Set(batch.expiry_date),
            status: Set(FeedBatchStatus::InStock.to_string()),
            supplier: Set(batch.supplier),
            unit_cost: Set(batch.unit_cost),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(self.db_pool.as_ref())
        .await
        .map_err(ServiceError::db_error)?;

        info!(batch_id = model.id, "Feed batch received");

        self.event_sender
            .send_or_log(Event::FeedBatchReceived {
                batch_id: model.id,
                feed_type: model.feed_type.clone(),
                quantity: model.quantity,
                received_by,
            });

        Ok(model)
    }

    pub async fn available_quantity(&self, feed_type: &str) -> Result<Decimal, ServiceError> {
        available_quantity(self.db_pool.as_ref(), feed_type).await
    }

    /// Current consumable stock of one feed type.
    pub async fn stock_for_type(&self, feed_type: &str) -> Result<FeedTypeStock, ServiceError> {
        let batches = batches_ordered_for_consumption(self.db_pool.as_ref(), feed_type, false).await?;
        Ok(FeedTypeStock {
            feed_type: feed_type.to_string(),
            available_quantity: total_quantity(&batches),
            batches,
        })
    }

    /// Per-type totals across every in-stock batch, sorted by feed type.
    pub async fn stock_summary(&self) -> Result<Vec<FeedStockSummary>, ServiceError> {
        let batches = FeedBatch::find()
            .filter(feed_batch::Column::Status.eq(FeedBatchStatus::InStock.as_ref()))
            .all(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)?;

        Ok(summarize(&batches))
    }
}

fn summarize(batches: &[feed_batch::Model]) -> Vec<FeedStockSummary> {
    let mut by_type: BTreeMap<&str, FeedStockSummary> = BTreeMap::new();
    for batch in batches {
        let entry = by_type
            .entry(batch.feed_type.as_str())
            .or_insert_with(|| FeedStockSummary {
                feed_type: batch.feed_type.clone(),
                total_quantity: Decimal::ZERO,
                batch_count: 0,
                earliest_expiry: None,
            });
        entry.total_quantity += batch.quantity;
        entry.batch_count += 1;
        entry.earliest_expiry = Some(match entry.earliest_expiry {
            Some(current) => current.min(batch.expiry_date),
            None => batch.expiry_date,
        });
    }
    by_type.into_values().collect()
}

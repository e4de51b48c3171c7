use crate::{
    auth::AuthUser,
    entities::{consumption_deduction, feed_batch, feed_consumption},
    errors::ServiceError,
    handlers::common::{json_payload, required, PaginationParams},
    services::{
        consumption_recorder::{ConsumptionFilter, NewConsumption, RecordedConsumption},
        feed_ledger::{FeedStockSummary, NewFeedBatch},
    },
    ApiResponse, AppState, PaginatedResponse,
};
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FeedBatchResponse {
    pub id: i32,
    pub feed_type: String,
    pub quantity: Decimal,
    pub purchase_date: NaiveDate,
    pub expiry_date: NaiveDate,
    pub status: String,
    pub supplier: Option<String>,
    pub unit_cost: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<feed_batch::Model> for FeedBatchResponse {
    fn from(model: feed_batch::Model) -> Self {
        Self {
            id: model.id,
            feed_type: model.feed_type,
            quantity: model.quantity,
            purchase_date: model.purchase_date,
            expiry_date: model.expiry_date,
            status: model.status,
            supplier: model.supplier,
            unit_cost: model.unit_cost,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// In-stock batches of one feed type, in consumption order.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FeedTypeStockResponse {
    pub feed_type: String,
    pub available_quantity: Decimal,
    pub batches: Vec<FeedBatchResponse>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ReceiveBatchRequest {
    pub feed_type: Option<String>,
    pub quantity: Option<Decimal>,
    pub purchase_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
    pub supplier: Option<String>,
    pub unit_cost: Option<Decimal>,
}

impl ReceiveBatchRequest {
    fn into_new_batch(self) -> Result<NewFeedBatch, ServiceError> {
        Ok(NewFeedBatch {
            feed_type: required("feed_type", self.feed_type)?,
            quantity: required("quantity", self.quantity)?,
            purchase_date: required("purchase_date", self.purchase_date)?,
            expiry_date: required("expiry_date", self.expiry_date)?,
            supplier: self.supplier,
            unit_cost: self.unit_cost,
        })
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RecordConsumptionRequest {
    pub flock_id: Option<i32>,
    pub feed_type: Option<String>,
    pub quantity: Option<Decimal>,
    pub feeding_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

impl RecordConsumptionRequest {
    fn into_new_consumption(self, recorded_by: Uuid) -> Result<NewConsumption, ServiceError> {
        Ok(NewConsumption {
            flock_id: required("flock_id", self.flock_id)?,
            feed_type: required("feed_type", self.feed_type)?,
            quantity: required("quantity", self.quantity)?,
            feeding_date: required("feeding_date", self.feeding_date)?,
            notes: self.notes,
            recorded_by,
        })
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ConsumptionResponse {
    pub id: i32,
    pub flock_id: i32,
    pub feed_type: String,
    pub quantity: Decimal,
    pub feeding_date: NaiveDate,
    pub notes: Option<String>,
    pub recorded_by: Uuid,
    pub created_at: DateTime<Utc>,
}

impl From<feed_consumption::Model> for ConsumptionResponse {
    fn from(model: feed_consumption::Model) -> Self {
        Self {
            id: model.id,
            flock_id: model.flock_id,
            feed_type: model.feed_type,
            quantity: model.quantity,
            feeding_date: model.feeding_date,
            notes: model.notes,
            recorded_by: model.recorded_by,
            created_at: model.created_at,
        }
    }
}

/// Quantity taken from one batch by a consumption.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DeductionResponse {
    pub batch_id: i32,
    pub quantity: Decimal,
}

impl From<consumption_deduction::Model> for DeductionResponse {
    fn from(model: consumption_deduction::Model) -> Self {
        Self {
            batch_id: model.batch_id,
            quantity: model.quantity,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ConsumptionDetailResponse {
    pub consumption: ConsumptionResponse,
    pub deductions: Vec<DeductionResponse>,
}

impl From<RecordedConsumption> for ConsumptionDetailResponse {
    fn from(recorded: RecordedConsumption) -> Self {
        Self {
            consumption: recorded.record.into(),
            deductions: recorded.deductions.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ConsumptionListQuery {
    pub flock_id: Option<i32>,
    pub feed_type: Option<String>,
    /// 1-based page number (default 1)
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

impl ConsumptionListQuery {
    fn pagination(&self) -> PaginationParams {
        PaginationParams {
            page: self.page,
            per_page: self.per_page,
        }
    }
}

/// Stock totals per feed type
#[utoipa::path(
    get,
    path = "/api/v1/feed/stock",
    responses(
        (status = 200, description = "Stock summary returned", body = crate::ApiResponse<Vec<FeedStockSummary>>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "feed"
)]
pub async fn stock_summary(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ServiceError> {
    let summary = state.feed_inventory.stock_summary().await?;
    Ok(Json(ApiResponse::success(summary)))
}

/// Consumable batches of one feed type, soonest expiry first
#[utoipa::path(
    get,
    path = "/api/v1/feed/stock/{feed_type}",
    params(("feed_type" = String, Path, description = "Feed type name")),
    responses(
        (status = 200, description = "Stock for the feed type returned", body = crate::ApiResponse<FeedTypeStockResponse>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "feed"
)]
pub async fn stock_for_type(
    State(state): State<AppState>,
    Path(feed_type): Path<String>,
) -> Result<impl IntoResponse, ServiceError> {
    let stock = state.feed_inventory.stock_for_type(&feed_type).await?;
    Ok(Json(ApiResponse::success(FeedTypeStockResponse {
        feed_type: stock.feed_type,
        available_quantity: stock.available_quantity,
        batches: stock.batches.into_iter().map(Into::into).collect(),
    })))
}

/// Receive a delivery of feed as a new batch
#[utoipa::path(
    post,
    path = "/api/v1/feed/batches",
    request_body = ReceiveBatchRequest,
    responses(
        (status = 201, description = "Batch received", body = crate::ApiResponse<FeedBatchResponse>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "feed"
)]
pub async fn receive_batch(
    State(state): State<AppState>,
    user: AuthUser,
    payload: Result<Json<ReceiveBatchRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ServiceError> {
    let batch = json_payload(payload)?.into_new_batch()?;
    let created = state
        .feed_inventory
        .receive_batch(batch, user.user_id)
        .await?;

    let message = format!(
        "Received {} kg of {}",
        created.quantity.normalize(),
        created.feed_type
    );
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(FeedBatchResponse::from(created)).with_message(message)),
    ))
}

/// Record feed consumed by a flock, deducting soonest-to-expire stock first
#[utoipa::path(
    post,
    path = "/api/v1/feed/consumption",
    request_body = RecordConsumptionRequest,
    responses(
        (status = 201, description = "Consumption recorded", body = crate::ApiResponse<ConsumptionDetailResponse>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Flock not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Stock changed while recording; nothing saved", body = crate::errors::ErrorResponse),
        (status = 422, description = "Insufficient stock", body = crate::errors::ErrorResponse),
        (status = 503, description = "Recording timed out", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "feed"
)]
pub async fn record_consumption(
    State(state): State<AppState>,
    user: AuthUser,
    payload: Result<Json<RecordConsumptionRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ServiceError> {
    let request = json_payload(payload)?.into_new_consumption(user.user_id)?;
    let recorded = state
        .consumption_recorder
        .record_consumption(request)
        .await?;

    let message = format!(
        "Feed consumption recorded successfully. {} batch(es) updated.",
        recorded.deductions.len()
    );
    Ok((
        StatusCode::CREATED,
        Json(
            ApiResponse::success(ConsumptionDetailResponse::from(recorded)).with_message(message),
        ),
    ))
}

/// Consumption history, newest feeding first
#[utoipa::path(
    get,
    path = "/api/v1/feed/consumption",
    params(ConsumptionListQuery),
    responses(
        (status = 200, description = "Consumption history returned", body = crate::ApiResponse<crate::PaginatedResponse<ConsumptionResponse>>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "feed"
)]
pub async fn list_consumption(
    State(state): State<AppState>,
    Query(query): Query<ConsumptionListQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let pagination = query.pagination();
    let page = pagination.page();
    let per_page = state.config.page_size(pagination.per_page);
    let filter = ConsumptionFilter {
        flock_id: query.flock_id,
        feed_type: query.feed_type,
    };

    let (records, total) = state
        .consumption_recorder
        .list_consumption(filter, page, per_page)
        .await?;

    let items = records.into_iter().map(ConsumptionResponse::from).collect();
    Ok(Json(ApiResponse::success(PaginatedResponse::new(
        items, total, page, per_page,
    ))))
}

/// One consumption record with the batches it drew from
#[utoipa::path(
    get,
    path = "/api/v1/feed/consumption/{id}",
    params(("id" = i32, Path, description = "Consumption record id")),
    responses(
        (status = 200, description = "Consumption record returned", body = crate::ApiResponse<ConsumptionDetailResponse>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "feed"
)]
pub async fn get_consumption(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ServiceError> {
    let recorded = state.consumption_recorder.get_consumption(id).await?;
    Ok(Json(ApiResponse::success(ConsumptionDetailResponse::from(
        recorded,
    ))))
}

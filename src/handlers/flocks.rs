use crate::{
    auth::AuthUser,
    entities::flock,
    errors::ServiceError,
    handlers::common::{json_payload, required, PaginationParams},
    services::flocks::NewFlock,
    ApiResponse, AppState, PaginatedResponse,
};
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FlockResponse {
    pub id: i32,
    pub name: String,
    pub breed: Option<String>,
    pub bird_count: i32,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<flock::Model> for FlockResponse {
    fn from(model: flock::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            breed: model.breed,
            bird_count: model.bird_count,
            status: model.status,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateFlockRequest {
    pub name: Option<String>,
    pub breed: Option<String>,
    pub bird_count: Option<i32>,
}

/// List flocks
#[utoipa::path(
    get,
    path = "/api/v1/flocks",
    params(PaginationParams),
    responses(
        (status = 200, description = "Flocks returned", body = crate::ApiResponse<crate::PaginatedResponse<FlockResponse>>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "flocks"
)]
pub async fn list_flocks(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let page = params.page();
    let per_page = state.config.page_size(params.per_page);
    let (flocks, total) = state.flocks.list_flocks(page, per_page).await?;

    let items = flocks.into_iter().map(FlockResponse::from).collect();
    Ok(Json(ApiResponse::success(PaginatedResponse::new(
        items, total, page, per_page,
    ))))
}

/// Get a flock by id
#[utoipa::path(
    get,
    path = "/api/v1/flocks/{id}",
    params(("id" = i32, Path, description = "Flock id")),
    responses(
        (status = 200, description = "Flock returned", body = crate::ApiResponse<FlockResponse>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "flocks"
)]
pub async fn get_flock(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ServiceError> {
    let flock = state.flocks.get_flock(id).await?;
    Ok(Json(ApiResponse::success(FlockResponse::from(flock))))
}

/// Register a flock
#[utoipa::path(
    post,
    path = "/api/v1/flocks",
    request_body = CreateFlockRequest,
    responses(
        (status = 201, description = "Flock created", body = crate::ApiResponse<FlockResponse>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "flocks"
)]
pub async fn create_flock(
    State(state): State<AppState>,
    user: AuthUser,
    payload: Result<Json<CreateFlockRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ServiceError> {
    let request = json_payload(payload)?;
    let new_flock = NewFlock {
        name: required("name", request.name)?,
        breed: request.breed,
        bird_count: required("bird_count", request.bird_count)?,
    };

    let created = state.flocks.create_flock(new_flock, user.user_id).await?;
    let message = format!("Flock '{}' registered", created.name);
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(FlockResponse::from(created)).with_message(message)),
    ))
}

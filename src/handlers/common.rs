use crate::errors::ServiceError;
use axum::{extract::rejection::JsonRejection, Json};
use serde::{Deserialize, Serialize};
use utoipa::IntoParams;

/// Pagination parameters for list operations
#[derive(Debug, Default, Deserialize, Serialize, IntoParams)]
pub struct PaginationParams {
    /// 1-based page number (default 1)
    pub page: Option<u64>,
    /// Items per page, clamped to the configured maximum
    pub per_page: Option<u64>,
}

impl PaginationParams {
    pub fn page(&self) -> u64 {
        self.page.unwrap_or(1).max(1)
    }
}

/// Unwraps a JSON body, turning malformed input into a 400.
pub fn json_payload<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ServiceError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| ServiceError::ValidationError(rejection.body_text()))
}

/// Fails with a field-named validation error when a required input is missing.
pub fn required<T>(field: &str, value: Option<T>) -> Result<T, ServiceError> {
    value.ok_or_else(|| ServiceError::ValidationError(format!("{field} is required")))
}

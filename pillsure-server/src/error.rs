//! Centralized error-to-response mapping: every handler returns
//! `Result<_, ApiError>` and the conversion below produces the HTTP status
//! and `{status:"error", error, ...}` envelope.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use pillsure_core::{ApiEnvelope, PillsureError};
use pillsure_store::StoreError;
use serde_json::Value;

pub struct ApiError(pub PillsureError);

pub type ApiResult<T> = std::result::Result<T, ApiError>;

impl From<PillsureError> for ApiError {
    fn from(err: PillsureError) -> Self {
        ApiError(err)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(message) => ApiError(PillsureError::Conflict(message)),
            other => ApiError(PillsureError::Storage(other.to_string())),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            tracing::error!("request failed: {}", self.0);
        }
        let body: ApiEnvelope<Value> = ApiEnvelope::error(self.0.to_string());
        (status, Json(body)).into_response()
    }
}

pub mod admin;
pub mod appointments;
pub mod auth;
pub mod medicines;
pub mod onboarding;
pub mod rag;
pub mod reviews;
pub mod specializations;
pub mod video;

use axum::{Json, http::StatusCode};
use pillsure_core::ApiEnvelope;
use pillsure_core::pagination::{DEFAULT_LIMIT, DEFAULT_PAGE};
use serde::Deserialize;
use serde_json::{Value, json};

/// Common list-endpoint query parameters.
#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub search: Option<String>,
}

impl PageQuery {
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(DEFAULT_PAGE)
    }

    pub fn limit(&self) -> u32 {
        self.limit.unwrap_or(DEFAULT_LIMIT)
    }
}

pub fn success<T: serde::Serialize>(data: T) -> (StatusCode, Json<ApiEnvelope<T>>) {
    (StatusCode::OK, Json(ApiEnvelope::success(data)))
}

pub fn success_with_message<T: serde::Serialize>(
    data: T,
    message: &str,
) -> (StatusCode, Json<ApiEnvelope<T>>) {
    (
        StatusCode::OK,
        Json(ApiEnvelope::success_with_message(data, message)),
    )
}

pub fn created<T: serde::Serialize>(data: T) -> (StatusCode, Json<ApiEnvelope<T>>) {
    (StatusCode::CREATED, Json(ApiEnvelope::success(data)))
}

/// Health check (GET /health)
pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "pillsure-server",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

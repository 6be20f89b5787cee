//! Storefront medicine endpoints (public).

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use pillsure_core::{ApiEnvelope, Pagination, PillsureError, model::Medicine, pagination};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::success;
use crate::AppState;
use crate::error::ApiResult;

const FEATURED_DEFAULT: u32 = 6;
const FEATURED_MAX: u32 = 24;

#[derive(Debug, Deserialize)]
pub struct FeaturedQuery {
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct MedicineList {
    pub medicines: Vec<Medicine>,
    pub pagination: Pagination,
}

/// Featured carousel (GET /api/medicines/featured): the newest in-stock
/// medicine of each drug category.
pub async fn featured(
    State(state): State<Arc<AppState>>,
    Query(query): Query<FeaturedQuery>,
) -> ApiResult<(StatusCode, Json<ApiEnvelope<Vec<Medicine>>>)> {
    let limit = query.limit.unwrap_or(FEATURED_DEFAULT).clamp(1, FEATURED_MAX);
    let medicines = state.db.featured_medicines(limit)?;
    Ok(success(medicines))
}

/// Name search (GET /api/medicines/search?q=)
pub async fn search(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<(StatusCode, Json<ApiEnvelope<MedicineList>>)> {
    let page = query.page.unwrap_or(pagination::DEFAULT_PAGE);
    let limit = query.limit.unwrap_or(pagination::DEFAULT_LIMIT);
    pagination::validate_paging(page, limit)?;

    let (medicines, total) =
        state
            .db
            .list_medicines(query.q.as_deref(), limit, pagination::offset(page, limit))?;
    Ok(success(MedicineList {
        medicines,
        pagination: Pagination::new(page, limit, total),
    }))
}

/// Detail page (GET /api/medicines/{id})
pub async fn get_by_id(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<(StatusCode, Json<ApiEnvelope<Medicine>>)> {
    let medicine = state
        .db
        .medicine_by_id(id)?
        .ok_or_else(|| PillsureError::NotFound("Medicine not found".to_string()))?;
    Ok(success(medicine))
}

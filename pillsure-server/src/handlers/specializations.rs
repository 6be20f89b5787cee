//! Specialization lookup (public).

use axum::{Json, extract::State, http::StatusCode};
use pillsure_core::{ApiEnvelope, model::Specialization};
use std::sync::Arc;

use super::success_with_message;
use crate::AppState;
use crate::error::ApiResult;

/// GET /api/specializations
pub async fn list(
    State(state): State<Arc<AppState>>,
) -> ApiResult<(StatusCode, Json<ApiEnvelope<Vec<Specialization>>>)> {
    let specializations = state.db.list_specializations()?;
    Ok(success_with_message(
        specializations,
        "Specializations retrieved successfully",
    ))
}

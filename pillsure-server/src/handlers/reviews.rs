//! Doctor reviews.

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use pillsure_core::{ApiEnvelope, Pagination, PillsureError, model::Review, pagination};
use pillsure_store::ReviewListing;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{created, success};
use crate::AppState;
use crate::auth::AuthUser;
use crate::error::ApiResult;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReviewRequest {
    pub doctor_id: String,
    pub rating: i64,
    pub comment: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReviewPageQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewPage {
    pub reviews: Vec<ReviewListing>,
    pub pagination: Pagination,
    pub average_rating: f64,
    pub total_reviews: u64,
}

/// Submit a review (POST /api/reviews); one per user per doctor.
pub async fn create(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(body): Json<CreateReviewRequest>,
) -> ApiResult<(StatusCode, Json<ApiEnvelope<ReviewListing>>)> {
    if !(1..=5).contains(&body.rating) {
        return Err(PillsureError::BadRequest("Rating must be between 1 and 5".to_string()).into());
    }
    if state.db.doctor_by_id(&body.doctor_id)?.is_none() {
        return Err(PillsureError::NotFound("Doctor not found".to_string()).into());
    }

    let review = Review {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: auth.user_id.clone(),
        doctor_id: body.doctor_id.clone(),
        rating: body.rating,
        comment: body.comment.filter(|c| !c.trim().is_empty()),
        created_at: Utc::now(),
    };
    state.db.insert_review(&review)?;

    // Keep the doctor's aggregate in sync; a failure here must not undo the
    // review itself.
    match state.db.average_rating(&body.doctor_id) {
        Ok(Some(average)) => {
            if let Err(e) = state.db.update_doctor_satisfaction(
                &body.doctor_id,
                &format!("{:.2}", average),
                Utc::now(),
            ) {
                tracing::warn!(doctor_id = %body.doctor_id, "failed to update satisfaction rate: {}", e);
            }
        }
        Ok(None) => {}
        Err(e) => {
            tracing::warn!(doctor_id = %body.doctor_id, "failed to compute average rating: {}", e)
        }
    }

    let listing = state
        .db
        .review_listing_by_id(&review.id)?
        .ok_or_else(|| PillsureError::NotFound("Review not found".to_string()))?;
    Ok(created(listing))
}

/// Reviews for a doctor (GET /api/reviews/doctor/{doctor_id}, public).
pub async fn for_doctor(
    State(state): State<Arc<AppState>>,
    Path(doctor_id): Path<String>,
    Query(query): Query<ReviewPageQuery>,
) -> ApiResult<(StatusCode, Json<ApiEnvelope<ReviewPage>>)> {
    let page = query.page.unwrap_or(pagination::DEFAULT_PAGE);
    let limit = query.limit.unwrap_or(pagination::DEFAULT_LIMIT);
    pagination::validate_paging(page, limit)?;

    let (reviews, total) =
        state
            .db
            .reviews_for_doctor(&doctor_id, limit, pagination::offset(page, limit))?;
    let average = state.db.average_rating(&doctor_id)?.unwrap_or(0.0);

    Ok(success(ReviewPage {
        reviews,
        pagination: Pagination::new(page, limit, total),
        average_rating: (average * 100.0).round() / 100.0,
        total_reviews: total,
    }))
}

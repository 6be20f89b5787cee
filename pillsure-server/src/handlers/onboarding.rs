//! Onboarding endpoints: the merge-and-gate saves for all three roles,
//! plus profile reads, the explicit step update, and the status probe.
//!
//! Every save follows the same contract: load the existing profile row,
//! merge the payload over it, validate the step-1 required set over the
//! merged state, then write the profile and the user's step/completion
//! flags in one transaction so the two can never diverge.

use axum::{Extension, Json, extract::State, http::StatusCode};
use chrono::Utc;
use pillsure_core::{
    ApiEnvelope, PillsureError,
    model::{
        DoctorProfile, HospitalProfile, ONBOARDING_STEP_COMPLETE, ONBOARDING_STEP_NONE,
        PatientProfile, User,
    },
    onboarding::{
        self, DoctorPayload, HospitalPayload, OnboardingStatus, PatientPayload,
    },
};
use serde::Deserialize;
use std::sync::Arc;

use super::success;
use crate::AppState;
use crate::auth::AuthUser;
use crate::error::ApiResult;

fn load_user(state: &AppState, user_id: &str) -> Result<User, PillsureError> {
    state
        .db
        .user_by_id(user_id)
        .map_err(|e| PillsureError::Storage(e.to_string()))?
        .ok_or_else(|| PillsureError::NotFound("User not found".to_string()))
}

/// Patient save (POST /api/onboarding/patient)
pub async fn save_patient(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(payload): Json<PatientPayload>,
) -> ApiResult<(StatusCode, Json<ApiEnvelope<OnboardingStatus>>)> {
    let user = load_user(&state, &auth.user_id)?;
    let now = Utc::now();

    let base = state
        .db
        .patient_by_user(&user.id)?
        .unwrap_or_else(|| PatientProfile::new(uuid::Uuid::new_v4().to_string(), &user.id, now));

    let merged = onboarding::merge_patient(base, &payload, now);
    onboarding::validate_patient_step_one(&merged)?;

    let status = OnboardingStatus::from_gate(onboarding::patient_is_complete(&merged));
    state.db.in_transaction(|tx| {
        tx.upsert_patient(&merged)?;
        tx.set_onboarding(&user.id, status, now)?;
        Ok(())
    })?;

    tracing::info!(user_id = %user.id, step = status.onboarding_step, "patient onboarding saved");
    Ok(success(status))
}

/// Doctor save (POST /api/onboarding/doctor)
pub async fn save_doctor(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(payload): Json<DoctorPayload>,
) -> ApiResult<(StatusCode, Json<ApiEnvelope<OnboardingStatus>>)> {
    let user = load_user(&state, &auth.user_id)?;
    let now = Utc::now();

    let base = state
        .db
        .doctor_by_user(&user.id)?
        .unwrap_or_else(|| DoctorProfile::new(uuid::Uuid::new_v4().to_string(), &user.id, now));

    let merged = onboarding::merge_doctor(base, &payload, now);
    onboarding::validate_doctor_step_one(&merged)?;

    let status = OnboardingStatus::from_gate(onboarding::doctor_is_complete(&merged));
    state.db.in_transaction(|tx| {
        tx.upsert_doctor(&merged)?;
        tx.set_onboarding(&user.id, status, now)?;
        Ok(())
    })?;

    tracing::info!(user_id = %user.id, step = status.onboarding_step, "doctor onboarding saved");
    Ok(success(status))
}

/// Hospital save (POST /api/onboarding/hospital)
pub async fn save_hospital(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(payload): Json<HospitalPayload>,
) -> ApiResult<(StatusCode, Json<ApiEnvelope<OnboardingStatus>>)> {
    let user = load_user(&state, &auth.user_id)?;
    let now = Utc::now();

    let base = state
        .db
        .hospital_by_user(&user.id)?
        .unwrap_or_else(|| HospitalProfile::new(uuid::Uuid::new_v4().to_string(), &user.id, now));

    let merged = onboarding::merge_hospital(base, &payload, now);
    onboarding::validate_hospital_step_one(&merged)?;

    // The hospital email must not belong to another user's hospital.
    if let Some(email) = &merged.hospital_email
        && let Some(existing) = state.db.hospital_by_email(email)?
        && existing.user_id != user.id
    {
        return Err(
            PillsureError::Conflict("Hospital with this email already exists".to_string()).into(),
        );
    }

    let status = OnboardingStatus::from_gate(onboarding::hospital_is_complete(&merged));
    state.db.in_transaction(|tx| {
        tx.upsert_hospital(&merged)?;
        tx.set_onboarding(&user.id, status, now)?;
        Ok(())
    })?;

    tracing::info!(user_id = %user.id, step = status.onboarding_step, "hospital onboarding saved");
    Ok(success(status))
}

/// Saved patient profile (GET /api/onboarding/patient)
pub async fn get_patient(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<(StatusCode, Json<ApiEnvelope<PatientProfile>>)> {
    let profile = state
        .db
        .patient_by_user(&auth.user_id)?
        .ok_or_else(|| PillsureError::NotFound("Patient profile not found".to_string()))?;
    Ok(success(profile))
}

/// Saved doctor profile (GET /api/onboarding/doctor)
pub async fn get_doctor(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<(StatusCode, Json<ApiEnvelope<DoctorProfile>>)> {
    let profile = state
        .db
        .doctor_by_user(&auth.user_id)?
        .ok_or_else(|| PillsureError::NotFound("Doctor profile not found".to_string()))?;
    Ok(success(profile))
}

/// Saved hospital profile (GET /api/onboarding/hospital)
pub async fn get_hospital(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<(StatusCode, Json<ApiEnvelope<HospitalProfile>>)> {
    let profile = state
        .db
        .hospital_by_user(&auth.user_id)?
        .ok_or_else(|| PillsureError::NotFound("Hospital profile not found".to_string()))?;
    Ok(success(profile))
}

#[derive(Debug, Deserialize)]
pub struct StepRequest {
    pub step: i64,
}

/// Explicit step update (PUT /api/onboarding/step). Used by the frontend
/// wizard to remember where the user left off; completion stays untouched.
pub async fn update_step(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(body): Json<StepRequest>,
) -> ApiResult<(StatusCode, Json<ApiEnvelope<serde_json::Value>>)> {
    if body.step < ONBOARDING_STEP_NONE || body.step > ONBOARDING_STEP_COMPLETE {
        return Err(PillsureError::BadRequest(
            "Invalid step number. Must be between 0 and 3".to_string(),
        )
        .into());
    }

    let updated = state
        .db
        .set_onboarding_step(&auth.user_id, body.step, Utc::now())?;
    if !updated {
        return Err(PillsureError::NotFound("User not found".to_string()).into());
    }

    Ok(success(serde_json::json!({ "onboardingStep": body.step })))
}

/// Status probe (GET /api/onboarding/status)
pub async fn status(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<(StatusCode, Json<ApiEnvelope<OnboardingStatus>>)> {
    let user = load_user(&state, &auth.user_id)?;
    Ok(success(OnboardingStatus {
        onboarding_step: user.onboarding_step,
        is_onboarding_complete: user.is_onboarding_complete,
    }))
}

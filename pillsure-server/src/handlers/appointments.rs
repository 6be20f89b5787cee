//! Appointment booking and management.

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use pillsure_core::{
    ApiEnvelope, PillsureError,
    model::{Appointment, AppointmentStatus, DoctorProfile},
};
use pillsure_store::{DoctorAppointment, PatientAppointment, StoreError};
use serde::Deserialize;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;

use super::{created, success};
use crate::AppState;
use crate::auth::AuthUser;
use crate::error::ApiResult;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAppointmentRequest {
    pub doctor_id: String,
    pub appointment_date: String,
    pub appointment_time: String,
    pub consultation_mode: String,
    pub patient_notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusFilter {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdateRequest {
    pub status: String,
    pub reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotesUpdateRequest {
    pub doctor_notes: Option<String>,
    pub prescription: Option<String>,
    pub diagnosis: Option<String>,
}

fn parse_status(raw: &str) -> Result<AppointmentStatus, PillsureError> {
    AppointmentStatus::parse(raw)
        .ok_or_else(|| PillsureError::BadRequest(format!("Invalid status: {}", raw)))
}

fn parse_status_filter(filter: &StatusFilter) -> Result<Option<AppointmentStatus>, PillsureError> {
    filter.status.as_deref().map(parse_status).transpose()
}

/// The calling user's doctor profile, when they have one.
fn doctor_profile_of(state: &AppState, user_id: &str) -> Result<Option<DoctorProfile>, StoreError> {
    state.db.doctor_by_user(user_id)
}

/// Book (POST /api/appointments). The slot conflict check is an exact
/// (doctor, date, time) existence test over live bookings; the partial
/// unique index turns a concurrent duplicate into the same 400.
pub async fn create(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(body): Json<CreateAppointmentRequest>,
) -> ApiResult<(StatusCode, Json<ApiEnvelope<Appointment>>)> {
    if body.doctor_id.trim().is_empty()
        || body.appointment_date.trim().is_empty()
        || body.appointment_time.trim().is_empty()
        || body.consultation_mode.trim().is_empty()
    {
        return Err(PillsureError::BadRequest("Missing required fields".to_string()).into());
    }

    if state.db.doctor_by_id(&body.doctor_id)?.is_none() {
        return Err(PillsureError::NotFound("Doctor not found".to_string()).into());
    }

    if state
        .db
        .slot_taken(&body.doctor_id, &body.appointment_date, &body.appointment_time)?
    {
        return Err(
            PillsureError::BadRequest("This time slot is already booked".to_string()).into(),
        );
    }

    let now = Utc::now();
    let appointment = Appointment {
        id: uuid::Uuid::new_v4().to_string(),
        patient_id: auth.user_id.clone(),
        doctor_id: body.doctor_id,
        appointment_date: body.appointment_date,
        appointment_time: body.appointment_time,
        status: AppointmentStatus::Pending,
        consultation_mode: body.consultation_mode,
        patient_notes: body.patient_notes,
        doctor_notes: None,
        prescription: None,
        diagnosis: None,
        cancellation_reason: None,
        is_active: true,
        created_at: now,
        updated_at: now,
    };

    match state.db.insert_appointment(&appointment) {
        Ok(()) => {}
        // Lost the race between the check and the insert.
        Err(StoreError::Conflict(message)) => {
            return Err(PillsureError::BadRequest(message).into());
        }
        Err(e) => return Err(e.into()),
    }

    tracing::info!(appointment_id = %appointment.id, doctor_id = %appointment.doctor_id, "appointment booked");
    Ok(created(appointment))
}

/// Caller's bookings (GET /api/appointments/patient)
pub async fn for_patient(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Query(filter): Query<StatusFilter>,
) -> ApiResult<(StatusCode, Json<ApiEnvelope<Vec<PatientAppointment>>>)> {
    let status = parse_status_filter(&filter)?;
    let appointments = state.db.appointments_for_patient(&auth.user_id, status)?;
    Ok(success(appointments))
}

/// Calling doctor's schedule (GET /api/appointments/doctor)
pub async fn for_doctor(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Query(filter): Query<StatusFilter>,
) -> ApiResult<(StatusCode, Json<ApiEnvelope<Vec<DoctorAppointment>>>)> {
    let status = parse_status_filter(&filter)?;
    let doctor = doctor_profile_of(&state, &auth.user_id)?
        .ok_or_else(|| PillsureError::NotFound("Doctor profile not found".to_string()))?;
    let appointments = state.db.appointments_for_doctor(&doctor.id, status)?;
    Ok(success(appointments))
}

/// Calling doctor's counts by status (GET /api/appointments/doctor/stats)
pub async fn doctor_stats(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<(StatusCode, Json<ApiEnvelope<Value>>)> {
    let doctor = doctor_profile_of(&state, &auth.user_id)?
        .ok_or_else(|| PillsureError::NotFound("Doctor profile not found".to_string()))?;
    let by_status: HashMap<String, u64> = state
        .db
        .appointment_counts_by_status(Some(&doctor.id))?
        .into_iter()
        .collect();
    let total: u64 = by_status.values().sum();
    Ok(success(json!({ "total": total, "byStatus": by_status })))
}

/// Occupied slots for a doctor and date (GET
/// /api/appointments/booked-slots/{doctor_id}/{date}, public).
pub async fn booked_slots(
    State(state): State<Arc<AppState>>,
    Path((doctor_id, date)): Path<(String, String)>,
) -> ApiResult<(StatusCode, Json<ApiEnvelope<Vec<String>>>)> {
    let slots = state.db.booked_slots(&doctor_id, &date)?;
    Ok(success(slots))
}

fn visible_appointment(
    state: &AppState,
    id: &str,
    auth: &AuthUser,
) -> Result<Appointment, PillsureError> {
    let doctor_id = doctor_profile_of(state, &auth.user_id)
        .map_err(|e| PillsureError::Storage(e.to_string()))?
        .map(|d| d.id);
    state
        .db
        .appointment_visible_to(id, &auth.user_id, doctor_id.as_deref())
        .map_err(|e| PillsureError::Storage(e.to_string()))?
        .ok_or_else(|| PillsureError::NotFound("Appointment not found".to_string()))
}

/// Single appointment (GET /api/appointments/{id}); visible only to the
/// booking patient and the target doctor.
pub async fn get_by_id(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<(StatusCode, Json<ApiEnvelope<Appointment>>)> {
    let appointment = visible_appointment(&state, &id, &auth)?;
    Ok(success(appointment))
}

/// Status transition (PUT /api/appointments/{id}/status)
pub async fn update_status(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(body): Json<StatusUpdateRequest>,
) -> ApiResult<(StatusCode, Json<ApiEnvelope<Value>>)> {
    let status = parse_status(&body.status)?;
    visible_appointment(&state, &id, &auth)?;

    let reason = body
        .reason
        .as_deref()
        .filter(|_| status == AppointmentStatus::Cancelled);
    state
        .db
        .update_appointment_status(&id, status, reason, Utc::now())?;
    Ok(success(json!({ "status": status.as_str() })))
}

/// Doctor notes / prescription / diagnosis (PUT /api/appointments/{id}/notes).
/// Merge-style: omitted fields keep their stored value.
pub async fn update_notes(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(body): Json<NotesUpdateRequest>,
) -> ApiResult<(StatusCode, Json<ApiEnvelope<Appointment>>)> {
    let doctor = doctor_profile_of(&state, &auth.user_id)?
        .ok_or_else(|| PillsureError::NotFound("Doctor profile not found".to_string()))?;

    let appointment = visible_appointment(&state, &id, &auth)?;
    if appointment.doctor_id != doctor.id {
        return Err(
            PillsureError::NotFound("Appointment not found or unauthorized".to_string()).into(),
        );
    }

    state.db.update_appointment_notes(
        &id,
        body.doctor_notes.as_deref(),
        body.prescription.as_deref(),
        body.diagnosis.as_deref(),
        Utc::now(),
    )?;
    let updated = visible_appointment(&state, &id, &auth)?;
    Ok(success(updated))
}

/// Soft delete (DELETE /api/appointments/{id})
pub async fn delete(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<(StatusCode, Json<ApiEnvelope<Value>>)> {
    visible_appointment(&state, &id, &auth)?;
    state.db.soft_delete_appointment(&id, Utc::now())?;
    Ok(success(json!({ "deleted": true })))
}

//! Admin console endpoints: dashboard stats, paginated listings, and the
//! medicine editor (JSON metadata updates and multipart image updates).

use axum::{
    Extension, Json,
    extract::{FromRequest, Multipart, Path, Query, Request, State},
    http::{StatusCode, header},
};
use pillsure_core::{
    ApiEnvelope, Pagination, PillsureError,
    model::{Medicine, MedicineUpdate, UserRole},
    pagination,
};
use pillsure_store::{DoctorListing, HospitalListing};
use serde::Serialize;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;

use super::{PageQuery, success};
use crate::AppState;
use crate::auth::{AuthUser, require_role};
use crate::error::{ApiError, ApiResult};
use crate::media::StoredObject;

const MEDICINE_IMAGE_FOLDER: &str = "medicines";

/// Dashboard stats (GET /api/admin/stats)
pub async fn stats(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<(StatusCode, Json<ApiEnvelope<Value>>)> {
    require_role(&auth, &[UserRole::Admin])?;

    let (users_total, users_active) = state.db.count_users()?;
    let by_role: HashMap<String, u64> = state.db.user_counts_by_role()?.into_iter().collect();
    let (medicines_total, in_stock) = state.db.count_medicines()?;
    let (doctors_total, doctors_active) = state.db.count_doctors()?;
    let (hospitals_total, hospitals_active) = state.db.count_hospitals()?;
    let appointments_total = state.db.count_appointments()?;
    let appointments_by_status: HashMap<String, u64> = state
        .db
        .appointment_counts_by_status(None)?
        .into_iter()
        .collect();

    Ok(success(json!({
        "users": { "total": users_total, "active": users_active, "byRole": by_role },
        "medicines": { "total": medicines_total, "inStock": in_stock },
        "doctors": { "total": doctors_total, "active": doctors_active },
        "hospitals": { "total": hospitals_total, "active": hospitals_active },
        "appointments": { "total": appointments_total, "byStatus": appointments_by_status },
    })))
}

#[derive(Debug, Serialize)]
pub struct DoctorPage {
    pub doctors: Vec<DoctorListing>,
    pub pagination: Pagination,
}

/// Paginated doctors (GET /api/admin/doctors)
pub async fn doctors(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Query(query): Query<PageQuery>,
) -> ApiResult<(StatusCode, Json<ApiEnvelope<DoctorPage>>)> {
    require_role(&auth, &[UserRole::Admin])?;
    let (page, limit) = (query.page(), query.limit());
    pagination::validate_paging(page, limit)?;

    let (doctors, total) =
        state
            .db
            .list_doctors(query.search.as_deref(), limit, pagination::offset(page, limit))?;
    Ok(success(DoctorPage {
        doctors,
        pagination: Pagination::new(page, limit, total),
    }))
}

#[derive(Debug, Serialize)]
pub struct HospitalPage {
    pub hospitals: Vec<HospitalListing>,
    pub pagination: Pagination,
}

/// Paginated hospitals (GET /api/admin/hospitals)
pub async fn hospitals(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Query(query): Query<PageQuery>,
) -> ApiResult<(StatusCode, Json<ApiEnvelope<HospitalPage>>)> {
    require_role(&auth, &[UserRole::Admin])?;
    let (page, limit) = (query.page(), query.limit());
    pagination::validate_paging(page, limit)?;

    let (hospitals, total) =
        state
            .db
            .list_hospitals(query.search.as_deref(), limit, pagination::offset(page, limit))?;
    Ok(success(HospitalPage {
        hospitals,
        pagination: Pagination::new(page, limit, total),
    }))
}

#[derive(Debug, Serialize)]
pub struct MedicinePage {
    pub medicines: Vec<Medicine>,
    pub pagination: Pagination,
}

/// Paginated medicines (GET /api/admin/medicines)
pub async fn medicines(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Query(query): Query<PageQuery>,
) -> ApiResult<(StatusCode, Json<ApiEnvelope<MedicinePage>>)> {
    require_role(&auth, &[UserRole::Admin])?;
    let (page, limit) = (query.page(), query.limit());
    pagination::validate_paging(page, limit)?;

    let (medicines, total) =
        state
            .db
            .list_medicines(query.search.as_deref(), limit, pagination::offset(page, limit))?;
    Ok(success(MedicinePage {
        medicines,
        pagination: Pagination::new(page, limit, total),
    }))
}

/// Medicine editor (PUT /api/admin/medicines/{id}).
///
/// A JSON body is a partial metadata update. A multipart body is an image
/// update: `existingImages` carries the URLs to keep (JSON array or repeated
/// fields) and `images` the new files.
pub async fn update_medicine(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<i64>,
    request: Request,
) -> ApiResult<(StatusCode, Json<ApiEnvelope<Medicine>>)> {
    require_role(&auth, &[UserRole::Admin])?;

    let content_type = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if content_type.starts_with("multipart/form-data") {
        let multipart = Multipart::from_request(request, &())
            .await
            .map_err(|e| PillsureError::BadRequest(e.to_string()))?;
        let medicine = update_images(&state, id, multipart).await?;
        Ok(success(medicine))
    } else {
        let Json(update) = Json::<MedicineUpdate>::from_request(request, &())
            .await
            .map_err(|e| PillsureError::BadRequest(e.to_string()))?;
        let medicine = state
            .db
            .update_medicine(id, &update)?
            .ok_or_else(|| PillsureError::NotFound("Medicine not found".to_string()))?;
        Ok(success(medicine))
    }
}

struct Upload {
    file_name: String,
    content_type: String,
    bytes: Vec<u8>,
}

/// The image-diff update:
/// 1. validate the total count,
/// 2. upload the new files,
/// 3. write the kept + new URL list to the database,
/// 4. only then best-effort delete the orphaned objects.
/// Any failure before the database write deletes the fresh uploads again so
/// storage holds no objects the database does not reference.
async fn update_images(
    state: &AppState,
    id: i64,
    mut multipart: Multipart,
) -> Result<Medicine, ApiError> {
    let medicine = state
        .db
        .medicine_by_id(id)?
        .ok_or_else(|| PillsureError::NotFound("Medicine not found".to_string()))?;

    let mut keep: Vec<String> = Vec::new();
    let mut uploads: Vec<Upload> = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| PillsureError::BadRequest(e.to_string()))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "existingImages" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| PillsureError::BadRequest(e.to_string()))?;
                let text = text.trim().to_string();
                if text.starts_with('[') {
                    keep = serde_json::from_str(&text).map_err(|e| {
                        PillsureError::BadRequest(format!("Invalid existingImages: {}", e))
                    })?;
                } else if !text.is_empty() {
                    keep.push(text);
                }
            }
            "images" => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| PillsureError::BadRequest(e.to_string()))?
                    .to_vec();
                uploads.push(Upload {
                    file_name,
                    content_type,
                    bytes,
                });
            }
            _ => {}
        }
    }

    let total = keep.len() + uploads.len();
    let max = state.config.media.max_images;
    if total > max {
        return Err(PillsureError::BadRequest(format!(
            "Maximum {} images allowed. You are trying to keep or upload {} images",
            max, total
        ))
        .into());
    }

    let mut stored: Vec<StoredObject> = Vec::new();
    for upload in &uploads {
        match state.media.put(
            MEDICINE_IMAGE_FOLDER,
            &upload.file_name,
            &upload.content_type,
            &upload.bytes,
        ) {
            Ok(object) => stored.push(object),
            Err(e) => {
                rollback_uploads(state, &stored);
                return Err(e.into());
            }
        }
    }

    // Stored images the keep-list no longer references.
    let orphans: Vec<String> = medicine
        .images
        .iter()
        .filter(|url| !keep.contains(url))
        .cloned()
        .collect();

    let mut updated_images = keep;
    updated_images.extend(stored.iter().map(|object| object.url.clone()));

    if let Err(e) = state.db.set_medicine_images(id, &updated_images) {
        rollback_uploads(state, &stored);
        return Err(e.into());
    }

    // The database is the source of truth now; orphan deletion is
    // best-effort and failures are only logged.
    for url in &orphans {
        match state.media.key_for_url(url) {
            Some(key) => {
                if let Err(e) = state.media.delete(&key) {
                    tracing::warn!(url = %url, "failed to delete orphaned image: {}", e);
                }
            }
            None => tracing::debug!(url = %url, "skipping foreign image URL"),
        }
    }

    state
        .db
        .medicine_by_id(id)?
        .ok_or_else(|| PillsureError::NotFound("Medicine not found".to_string()).into())
}

fn rollback_uploads(state: &AppState, stored: &[StoredObject]) {
    for object in stored {
        if let Err(e) = state.media.delete(&object.key) {
            tracing::warn!(key = %object.key, "failed to roll back upload: {}", e);
        }
    }
}

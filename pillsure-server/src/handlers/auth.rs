//! Registration, login, and profile endpoints.

use axum::{
    Extension, Json,
    extract::{Query, State},
    http::StatusCode,
};
use chrono::Utc;
use pillsure_core::{
    ApiEnvelope, Pagination, PillsureError,
    model::{User, UserRole},
    pagination,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{PageQuery, created, success};
use crate::auth::{AuthUser, hash_password, issue_token, require_role, verify_password};
use crate::error::ApiResult;
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Option<UserRole>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthData {
    pub token: String,
    pub user: User,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Register (POST /api/auth/register)
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<ApiEnvelope<AuthData>>)> {
    let email = body.email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(PillsureError::BadRequest("A valid email is required".to_string()).into());
    }
    if body.password.is_empty() {
        return Err(PillsureError::BadRequest("Password is required".to_string()).into());
    }
    if body.first_name.trim().is_empty() || body.last_name.trim().is_empty() {
        return Err(PillsureError::BadRequest("First and last name are required".to_string()).into());
    }

    let now = Utc::now();
    let user = User {
        id: uuid::Uuid::new_v4().to_string(),
        email,
        password_hash: Some(hash_password(&body.password)?),
        first_name: body.first_name.trim().to_string(),
        last_name: body.last_name.trim().to_string(),
        role: body.role.unwrap_or(UserRole::Patient),
        is_active: true,
        is_email_verified: false,
        onboarding_step: 0,
        is_onboarding_complete: false,
        created_at: now,
        updated_at: now,
    };
    state.db.insert_user(&user)?;

    tracing::info!(user_id = %user.id, role = user.role.as_str(), "registered new user");

    let token = issue_token(&state.config.auth, &user)?;
    Ok(created(AuthData { token, user }))
}

/// Login (POST /api/auth/login)
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LoginRequest>,
) -> ApiResult<(StatusCode, Json<ApiEnvelope<AuthData>>)> {
    let invalid = || PillsureError::Unauthorized("Invalid email or password".to_string());

    let email = body.email.trim().to_lowercase();
    let user = state.db.user_by_email(&email)?.ok_or_else(invalid)?;

    if !user.is_active {
        return Err(PillsureError::Unauthorized("Account is deactivated".to_string()).into());
    }

    let hash = user.password_hash.as_deref().ok_or_else(invalid)?;
    if !verify_password(hash, &body.password) {
        return Err(invalid().into());
    }

    let token = issue_token(&state.config.auth, &user)?;
    Ok(success(AuthData { token, user }))
}

/// Current user (GET /api/auth/profile)
pub async fn profile(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<(StatusCode, Json<ApiEnvelope<User>>)> {
    let user = state
        .db
        .user_by_id(&auth.user_id)?
        .ok_or_else(|| PillsureError::NotFound("User not found".to_string()))?;
    Ok(success(user))
}

/// Update names (PUT /api/auth/profile). Email, password and role are not
/// updatable through this endpoint.
pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(body): Json<UpdateProfileRequest>,
) -> ApiResult<(StatusCode, Json<ApiEnvelope<User>>)> {
    let updated = state.db.update_user_names(
        &auth.user_id,
        body.first_name.as_deref().map(str::trim),
        body.last_name.as_deref().map(str::trim),
        Utc::now(),
    )?;
    if !updated {
        return Err(PillsureError::NotFound("User not found".to_string()).into());
    }

    let user = state
        .db
        .user_by_id(&auth.user_id)?
        .ok_or_else(|| PillsureError::NotFound("User not found".to_string()))?;
    Ok(success(user))
}

#[derive(Debug, Serialize)]
pub struct UserList {
    pub users: Vec<User>,
    pub pagination: Pagination,
}

/// Admin user listing (GET /api/auth/users)
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Query(query): Query<PageQuery>,
) -> ApiResult<(StatusCode, Json<ApiEnvelope<UserList>>)> {
    require_role(&auth, &[UserRole::Admin])?;

    let (page, limit) = (query.page(), query.limit());
    pagination::validate_paging(page, limit)?;

    let (users, total) =
        state
            .db
            .list_users(query.search.as_deref(), limit, pagination::offset(page, limit))?;
    Ok(success(UserList {
        users,
        pagination: Pagination::new(page, limit, total),
    }))
}

//! Video consultation token endpoints.

use axum::{
    Extension, Json,
    extract::{Query, State},
    http::StatusCode,
};
use pillsure_core::{ApiEnvelope, PillsureError, model::User};
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;

use super::success;
use crate::AppState;
use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::video::{Participant, jitsi_token, livekit_token};

#[derive(Debug, Deserialize)]
pub struct TokenQuery {
    pub room: Option<String>,
    pub moderator: Option<bool>,
}

fn load_participant(state: &AppState, auth: &AuthUser) -> Result<User, PillsureError> {
    state
        .db
        .user_by_id(&auth.user_id)
        .map_err(|e| PillsureError::Storage(e.to_string()))?
        .ok_or_else(|| PillsureError::NotFound("User not found".to_string()))
}

/// GET /api/video/livekit/token
pub async fn livekit(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Query(query): Query<TokenQuery>,
) -> ApiResult<(StatusCode, Json<ApiEnvelope<Value>>)> {
    let user = load_participant(&state, &auth)?;
    let participant = Participant {
        user_id: &user.id,
        email: &user.email,
        first_name: &user.first_name,
        last_name: &user.last_name,
    };
    let token = livekit_token(
        &state.config.livekit,
        &participant,
        query.room.as_deref().unwrap_or(""),
        query.moderator.unwrap_or(false),
    )?;
    Ok(success(json!({ "token": token })))
}

/// GET /api/video/jitsi/token
pub async fn jitsi(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Query(query): Query<TokenQuery>,
) -> ApiResult<(StatusCode, Json<ApiEnvelope<Value>>)> {
    let user = load_participant(&state, &auth)?;
    let participant = Participant {
        user_id: &user.id,
        email: &user.email,
        first_name: &user.first_name,
        last_name: &user.last_name,
    };
    let token = jitsi_token(
        &state.config.jitsi,
        &participant,
        query.room.as_deref().unwrap_or("*"),
        query.moderator.unwrap_or(false),
    )?;
    Ok(success(json!({ "token": token })))
}

use axum::{
    Json,
    body::Body,
    extract::{Request, State},
    http::{StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, TokenData, Validation};
use pbkdf2::{
    Pbkdf2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use pillsure_core::{
    ApiEnvelope, PillsureError,
    model::{User, UserRole},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::{AppState, config::AuthSettings};

/// Authenticated caller, inserted into request extensions by the middleware.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
    pub email: String,
    pub role: UserRole,
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: String,
    pub email: String,
    pub role: String,
    pub iat: i64,
    pub exp: i64,
}

/// Issue an HS256 bearer token for a user.
pub fn issue_token(settings: &AuthSettings, user: &User) -> Result<String, PillsureError> {
    let now = chrono::Utc::now();
    let claims = JwtClaims {
        sub: user.id.clone(),
        email: user.email.clone(),
        role: user.role.as_str().to_string(),
        iat: now.timestamp(),
        exp: (now + chrono::Duration::hours(settings.token_ttl_hours)).timestamp(),
    };
    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(settings.jwt_secret.as_bytes()),
    )
    .map_err(|e| PillsureError::Storage(format!("Failed to sign token: {}", e)))
}

fn decode_token(settings: &AuthSettings, token: &str) -> Result<AuthUser, PillsureError> {
    let validation = Validation::new(Algorithm::HS256);
    let token_data: TokenData<JwtClaims> = jsonwebtoken::decode(
        token,
        &DecodingKey::from_secret(settings.jwt_secret.as_bytes()),
        &validation,
    )
    .map_err(|_| PillsureError::Unauthorized("Invalid or expired token".to_string()))?;

    let role = UserRole::parse(&token_data.claims.role)
        .ok_or_else(|| PillsureError::Unauthorized("Invalid or expired token".to_string()))?;

    Ok(AuthUser {
        user_id: token_data.claims.sub,
        email: token_data.claims.email,
        role,
    })
}

/// Paths reachable without a token: the storefront reads, registration and
/// login, public review/slot listings, and locally served media.
fn is_public(path: &str) -> bool {
    path == "/health"
        || path == "/api/auth/register"
        || path == "/api/auth/login"
        || path == "/api/rag/recommend"
        || path == "/api/specializations"
        || path.starts_with("/api/medicines")
        || path.starts_with("/api/appointments/booked-slots/")
        || path.starts_with("/api/reviews/doctor/")
        || path.starts_with("/media/")
}

/// Pull the bearer token from the Authorization header, falling back to the
/// `?token=` query parameter (used by browser-driven media and SSE-style
/// consumers that cannot set headers).
fn extract_token(request: &Request<Body>) -> Option<String> {
    let from_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string());
    if from_header.is_some() {
        return from_header;
    }

    request.uri().query().and_then(|query| {
        query
            .split('&')
            .find_map(|pair| pair.strip_prefix("token="))
            .filter(|t| !t.is_empty())
            .map(|t| t.to_string())
    })
}

fn unauthorized(message: &str) -> Response {
    let body: ApiEnvelope<Value> = ApiEnvelope::error(message);
    (StatusCode::UNAUTHORIZED, Json(body)).into_response()
}

/// Authentication middleware
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, Response> {
    if is_public(request.uri().path()) {
        return Ok(next.run(request).await);
    }

    let Some(token) = extract_token(&request) else {
        return Err(unauthorized("Access token is required"));
    };

    let auth_user = match decode_token(&state.config.auth, &token) {
        Ok(user) => user,
        Err(e) => return Err(unauthorized(&e.to_string())),
    };

    tracing::debug!(user_id = %auth_user.user_id, "authenticated request");
    request.extensions_mut().insert(auth_user);

    Ok(next.run(request).await)
}

/// Role guard used by handlers that are restricted to certain roles.
pub fn require_role(user: &AuthUser, roles: &[UserRole]) -> Result<(), PillsureError> {
    if roles.contains(&user.role) {
        Ok(())
    } else {
        Err(PillsureError::Forbidden(
            "Insufficient permissions".to_string(),
        ))
    }
}

pub fn hash_password(password: &str) -> Result<String, PillsureError> {
    let salt = SaltString::generate(&mut OsRng);
    Pbkdf2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PillsureError::Storage(format!("Failed to hash password: {}", e)))
}

pub fn verify_password(hash: &str, password: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| {
            Pbkdf2
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn test_settings() -> AuthSettings {
        AuthSettings {
            jwt_secret: "unit-test-secret-0123456789".to_string(),
            token_ttl_hours: 24,
        }
    }

    fn test_user(role: UserRole) -> User {
        let now = Utc::now();
        User {
            id: "u1".to_string(),
            email: "a@b.c".to_string(),
            password_hash: None,
            first_name: "A".to_string(),
            last_name: "B".to_string(),
            role,
            is_active: true,
            is_email_verified: false,
            onboarding_step: 0,
            is_onboarding_complete: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_token_round_trip() {
        let settings = test_settings();
        let token = issue_token(&settings, &test_user(UserRole::Doctor)).unwrap();
        let auth_user = decode_token(&settings, &token).unwrap();
        assert_eq!(auth_user.user_id, "u1");
        assert_eq!(auth_user.email, "a@b.c");
        assert_eq!(auth_user.role, UserRole::Doctor);
    }

    #[test]
    fn test_token_rejected_with_wrong_secret() {
        let token = issue_token(&test_settings(), &test_user(UserRole::Patient)).unwrap();
        let other = AuthSettings {
            jwt_secret: "a-different-secret-entirely".to_string(),
            token_ttl_hours: 24,
        };
        assert!(decode_token(&other, &token).is_err());
    }

    #[test]
    fn test_garbage_token_rejected() {
        assert!(decode_token(&test_settings(), "not-a-jwt").is_err());
    }

    #[test]
    fn test_require_role() {
        let user = AuthUser {
            user_id: "u1".to_string(),
            email: "a@b.c".to_string(),
            role: UserRole::Patient,
        };
        assert!(require_role(&user, &[UserRole::Patient, UserRole::Admin]).is_ok());
        assert!(require_role(&user, &[UserRole::Admin]).is_err());
    }

    #[test]
    fn test_password_hash_and_verify() {
        let hash = hash_password("hunter22").unwrap();
        assert_ne!(hash, "hunter22");
        assert!(verify_password(&hash, "hunter22"));
        assert!(!verify_password(&hash, "hunter2"));
        assert!(!verify_password("not-a-phc-string", "hunter22"));
    }

    #[test]
    fn test_public_paths() {
        assert!(is_public("/health"));
        assert!(is_public("/api/auth/login"));
        assert!(is_public("/api/medicines/featured"));
        assert!(is_public("/api/appointments/booked-slots/d1/2026-09-01"));
        assert!(is_public("/media/medicines/a.png"));
        assert!(!is_public("/api/onboarding/patient"));
        assert!(!is_public("/api/admin/stats"));
        assert!(!is_public("/api/appointments"));
    }

    #[test]
    fn test_extract_token_header_and_query() {
        let request = Request::builder()
            .uri("/api/onboarding/status")
            .header(header::AUTHORIZATION, "Bearer abc123")
            .body(Body::empty())
            .unwrap();
        assert_eq!(extract_token(&request).as_deref(), Some("abc123"));

        let request = Request::builder()
            .uri("/api/onboarding/status?token=xyz789&foo=bar")
            .body(Body::empty())
            .unwrap();
        assert_eq!(extract_token(&request).as_deref(), Some("xyz789"));

        let request = Request::builder()
            .uri("/api/onboarding/status")
            .body(Body::empty())
            .unwrap();
        assert!(extract_token(&request).is_none());
    }
}

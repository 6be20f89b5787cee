//! pillsure-server - HTTP API for the PillSure healthcare marketplace:
//! authentication and onboarding, appointment booking, the medicine
//! catalog, the admin console, and the recommendation/video integrations.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod media;
pub mod rag;
pub mod video;

use axum::{
    Router,
    http::Method,
    routing::{get, post, put},
};
use pillsure_store::Db;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    services::ServeDir,
    trace::TraceLayer,
};

use crate::media::MediaStore;
use crate::rag::RagClient;

/// Application state
pub struct AppState {
    pub db: Db,
    pub config: config::ServerConfig,
    pub media: Arc<dyn MediaStore>,
    pub rag: RagClient,
}

/// Build the application router with all routes and middleware
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any);

    let media_dir = state.config.media.dir.clone();

    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Auth
        .route("/api/auth/register", post(handlers::auth::register))
        .route("/api/auth/login", post(handlers::auth::login))
        .route(
            "/api/auth/profile",
            get(handlers::auth::profile).put(handlers::auth::update_profile),
        )
        .route("/api/auth/users", get(handlers::auth::list_users))
        // Onboarding
        .route(
            "/api/onboarding/patient",
            post(handlers::onboarding::save_patient).get(handlers::onboarding::get_patient),
        )
        .route(
            "/api/onboarding/doctor",
            post(handlers::onboarding::save_doctor).get(handlers::onboarding::get_doctor),
        )
        .route(
            "/api/onboarding/hospital",
            post(handlers::onboarding::save_hospital).get(handlers::onboarding::get_hospital),
        )
        .route("/api/onboarding/step", put(handlers::onboarding::update_step))
        .route("/api/onboarding/status", get(handlers::onboarding::status))
        // Appointments (static segments before /{id})
        .route("/api/appointments", post(handlers::appointments::create))
        .route(
            "/api/appointments/patient",
            get(handlers::appointments::for_patient),
        )
        .route(
            "/api/appointments/doctor",
            get(handlers::appointments::for_doctor),
        )
        .route(
            "/api/appointments/doctor/stats",
            get(handlers::appointments::doctor_stats),
        )
        .route(
            "/api/appointments/booked-slots/{doctor_id}/{date}",
            get(handlers::appointments::booked_slots),
        )
        .route(
            "/api/appointments/{id}",
            get(handlers::appointments::get_by_id).delete(handlers::appointments::delete),
        )
        .route(
            "/api/appointments/{id}/status",
            put(handlers::appointments::update_status),
        )
        .route(
            "/api/appointments/{id}/notes",
            put(handlers::appointments::update_notes),
        )
        // Medicines (storefront)
        .route("/api/medicines/featured", get(handlers::medicines::featured))
        .route("/api/medicines/search", get(handlers::medicines::search))
        .route("/api/medicines/{id}", get(handlers::medicines::get_by_id))
        // Admin
        .route("/api/admin/stats", get(handlers::admin::stats))
        .route("/api/admin/doctors", get(handlers::admin::doctors))
        .route("/api/admin/hospitals", get(handlers::admin::hospitals))
        .route("/api/admin/medicines", get(handlers::admin::medicines))
        .route(
            "/api/admin/medicines/{id}",
            put(handlers::admin::update_medicine),
        )
        // Reviews
        .route("/api/reviews", post(handlers::reviews::create))
        .route(
            "/api/reviews/doctor/{doctor_id}",
            get(handlers::reviews::for_doctor),
        )
        // Specializations
        .route("/api/specializations", get(handlers::specializations::list))
        // RAG recommendation
        .route("/api/rag/recommend", post(handlers::rag::recommend))
        // Video consultation tokens
        .route("/api/video/livekit/token", get(handlers::video::livekit))
        .route("/api/video/jitsi/token", get(handlers::video::jitsi))
        // Locally stored images
        .nest_service("/media", ServeDir::new(media_dir))
        // Middleware
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth::auth_middleware,
        ))
        .layer(RequestBodyLimitLayer::new(16 * 1024 * 1024)) // 16MB
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

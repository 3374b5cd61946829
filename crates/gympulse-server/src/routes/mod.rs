//! HTTP route handlers.

pub mod session;
pub mod ws;

use crate::state::AppState;
use axum::{
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use gympulse_core::PlayerError;
use serde::Serialize;
use std::sync::Arc;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Routes mounted under `/api`.
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health))
        .route("/session", get(session::get))
        .route("/workouts/{id}/play", post(session::play))
        .route("/session/begin", post(session::begin))
        .route("/session/complete", post(session::complete))
        .route("/session/skip-rest", post(session::skip_rest))
        .route("/session/end", post(session::end))
}

/// Routes mounted under `/ws`.
pub fn ws_routes() -> Router<Arc<AppState>> {
    Router::new().route("/session", get(ws::upgrade))
}

/// Map a player error to an HTTP status and message.
pub fn error_response(e: PlayerError) -> (StatusCode, String) {
    let status = match &e {
        PlayerError::WorkoutNotFound(_) | PlayerError::NoActiveSession => StatusCode::NOT_FOUND,
        PlayerError::WorkoutNotPlayable(_) => StatusCode::UNPROCESSABLE_ENTITY,
        PlayerError::InvalidTransition { .. } => StatusCode::CONFLICT,
        PlayerError::WorkoutFetch(_) | PlayerError::Http(_) => StatusCode::BAD_GATEWAY,
        PlayerError::InvalidBackendUrl(_) | PlayerError::Io(_) | PlayerError::Json(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, e.to_string())
}

//! Session player routes.

use super::error_response;
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use gympulse_core::StartOutcome;
use gympulse_types::SessionSnapshot;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

type ApiResult<T> = Result<Json<T>, (StatusCode, String)>;

pub async fn get(State(state): State<Arc<AppState>>) -> Json<SessionSnapshot> {
    Json(state.player.snapshot().await)
}

#[derive(Deserialize)]
pub struct PlayQuery {
    /// Exercise to start from; out-of-range values start at the first.
    #[serde(default)]
    pub start: usize,
}

#[derive(Serialize)]
pub struct PlayResponse {
    /// True when an in-progress session was rebound instead of started.
    pub resumed: bool,
    pub ws_url: &'static str,
    #[serde(flatten)]
    pub snapshot: SessionSnapshot,
}

/// Start a session for a workout, or resume the one in progress.
pub async fn play(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<PlayQuery>,
) -> ApiResult<PlayResponse> {
    let (outcome, snapshot) = state
        .player
        .start_session(&id, query.start)
        .await
        .map_err(error_response)?;

    let resumed = outcome == StartOutcome::Resumed;
    info!(
        target: "gympulse::api",
        "Workout {} {} at exercise {}",
        id,
        if resumed { "resumed" } else { "started" },
        snapshot.state.current_exercise_index
    );

    Ok(Json(PlayResponse {
        resumed,
        ws_url: "/ws/session",
        snapshot,
    }))
}

pub async fn begin(State(state): State<Arc<AppState>>) -> ApiResult<SessionSnapshot> {
    state.player.begin_work().await.map(Json).map_err(error_response)
}

pub async fn complete(State(state): State<Arc<AppState>>) -> ApiResult<SessionSnapshot> {
    state
        .player
        .complete_current_interval()
        .await
        .map(Json)
        .map_err(error_response)
}

pub async fn skip_rest(State(state): State<Arc<AppState>>) -> ApiResult<SessionSnapshot> {
    state.player.skip_rest().await.map(Json).map_err(error_response)
}

pub async fn end(State(state): State<Arc<AppState>>) -> ApiResult<SessionSnapshot> {
    let snapshot = state.player.end_session().await.map_err(error_response)?;
    info!(
        target: "gympulse::api",
        "Session ended by user after {}s",
        snapshot.state.total_elapsed_seconds
    );
    Ok(Json(snapshot))
}

//! Error types for GymPulse.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlayerError {
    #[error("Workout not found: {0}")]
    WorkoutNotFound(String),

    #[error("Workout {0} is not playable: it has no exercises")]
    WorkoutNotPlayable(String),

    #[error("Failed to fetch workout: {0}")]
    WorkoutFetch(String),

    #[error("Invalid backend URL: {0}")]
    InvalidBackendUrl(String),

    #[error("No session has been started")]
    NoActiveSession,

    #[error("Invalid session state: expected {expected}, got {actual}")]
    InvalidTransition { expected: String, actual: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PlayerError {
    /// Short machine-readable code for renderers.
    pub fn code(&self) -> &'static str {
        match self {
            PlayerError::WorkoutNotFound(_) => "workout_not_found",
            PlayerError::WorkoutNotPlayable(_) => "not_playable",
            PlayerError::WorkoutFetch(_) | PlayerError::Http(_) => "fetch_failed",
            PlayerError::NoActiveSession => "no_session",
            PlayerError::InvalidTransition { .. } => "invalid_transition",
            PlayerError::InvalidBackendUrl(_) | PlayerError::Io(_) | PlayerError::Json(_) => "internal",
        }
    }
}

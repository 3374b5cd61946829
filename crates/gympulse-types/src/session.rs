//! Session types and the display view derived from them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::WorkoutDefinition;

/// Player phase in the session lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// Session started, waiting for the athlete to begin.
    Ready,
    /// A set is in progress.
    Working,
    /// Between sets or exercises.
    Resting,
    /// Terminal: completed or ended early.
    Finished,
}

impl SessionPhase {
    pub fn label(self) -> &'static str {
        match self {
            SessionPhase::Ready => "READY",
            SessionPhase::Working => "WORKING",
            SessionPhase::Resting => "RESTING",
            SessionPhase::Finished => "FINISHED",
        }
    }
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Which boundary a rest interval sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RestKind {
    BetweenSets,
    BetweenExercises,
}

/// Authoritative state of the single player session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    /// Workout being played; `None` when no session was ever started.
    pub workout_id: Option<String>,
    /// Identifies one attempt; unchanged when a session is resumed.
    pub session_id: Option<Uuid>,
    pub phase: SessionPhase,
    pub current_exercise_index: usize,
    /// One-based.
    pub current_set: u32,
    pub total_elapsed_seconds: u64,
    pub rest_remaining_seconds: u32,
    /// Work countdown for time-based exercises, `None` for rep-based work.
    pub work_remaining_seconds: Option<u32>,
    pub rest_kind: Option<RestKind>,
    pub is_active: bool,
    pub last_updated: DateTime<Utc>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            workout_id: None,
            session_id: None,
            phase: SessionPhase::Ready,
            current_exercise_index: 0,
            current_set: 1,
            total_elapsed_seconds: 0,
            rest_remaining_seconds: 0,
            work_remaining_seconds: None,
            rest_kind: None,
            is_active: false,
            last_updated: Utc::now(),
        }
    }
}

impl SessionState {
    /// Whether the per-second clock should be running for this state.
    pub fn clock_running(&self) -> bool {
        self.is_active && matches!(self.phase, SessionPhase::Working | SessionPhase::Resting)
    }

    /// Whether this state is an in-progress session for `workout_id`.
    pub fn is_resumable_for(&self, workout_id: &str) -> bool {
        self.is_active && self.workout_id.as_deref() == Some(workout_id)
    }
}

/// State plus the derived view, as handed to renderers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub state: SessionState,
    /// `None` when no workout is loaded.
    pub view: Option<PlayerView>,
}

/// What the main display shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlayerDisplay {
    Countdown { seconds: u32 },
    Reps { reps: Option<u32> },
    Summary { duration: String },
}

/// The one action the renderer offers in the current phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerAction {
    Begin,
    StopTimer,
    SetComplete,
    SkipRest,
}

/// Display values derived from a [`SessionState`] and its workout.
///
/// Renderers show this verbatim; it carries no timing state of its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerView {
    pub phase_label: String,
    pub workout_title: String,
    pub exercise_title: Option<String>,
    pub current_set: u32,
    pub total_sets: u32,
    pub display: PlayerDisplay,
    pub action: Option<PlayerAction>,
    /// Title of what comes after the current rest.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_up: Option<String>,
    pub elapsed: String,
    /// Recorded duration, only once finished.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<u64>,
}

/// Label shown for "next up" after the last exercise.
pub const NEXT_UP_DONE: &str = "Finished";

impl PlayerView {
    pub fn derive(state: &SessionState, workout: &WorkoutDefinition) -> Self {
        let exercise = workout.exercise(state.current_exercise_index);
        let total_sets = exercise.map(|e| e.effective_sets()).unwrap_or(1);
        let finished = state.phase == SessionPhase::Finished;

        let display = match state.phase {
            SessionPhase::Finished => PlayerDisplay::Summary {
                duration: format_clock(state.total_elapsed_seconds),
            },
            SessionPhase::Resting => PlayerDisplay::Countdown {
                seconds: state.rest_remaining_seconds,
            },
            SessionPhase::Working if state.work_remaining_seconds.is_some() => {
                PlayerDisplay::Countdown {
                    seconds: state.work_remaining_seconds.unwrap_or(0),
                }
            }
            _ => match exercise.and_then(|e| e.work_seconds()) {
                Some(seconds) => PlayerDisplay::Countdown { seconds },
                None => PlayerDisplay::Reps {
                    reps: exercise.and_then(|e| e.reps),
                },
            },
        };

        let action = match state.phase {
            SessionPhase::Ready if workout.is_playable() => Some(PlayerAction::Begin),
            SessionPhase::Working if exercise.is_some_and(|e| e.is_time_based()) => {
                Some(PlayerAction::StopTimer)
            }
            SessionPhase::Working => Some(PlayerAction::SetComplete),
            SessionPhase::Resting => Some(PlayerAction::SkipRest),
            _ => None,
        };

        let next_up = match (state.phase, state.rest_kind) {
            (SessionPhase::Resting, Some(RestKind::BetweenSets)) => exercise.map(|e| e.title.clone()),
            (SessionPhase::Resting, _) => Some(
                workout
                    .exercise(state.current_exercise_index + 1)
                    .map(|e| e.title.clone())
                    .unwrap_or_else(|| NEXT_UP_DONE.to_string()),
            ),
            _ => None,
        };

        Self {
            phase_label: state.phase.label().to_string(),
            workout_title: workout.title.clone(),
            exercise_title: exercise.map(|e| e.title.clone()),
            current_set: state.current_set,
            total_sets,
            display,
            action,
            next_up,
            elapsed: format_clock(state.total_elapsed_seconds),
            duration_seconds: finished.then_some(state.total_elapsed_seconds),
        }
    }
}

/// Format seconds as `m:ss`.
pub fn format_clock(seconds: u64) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

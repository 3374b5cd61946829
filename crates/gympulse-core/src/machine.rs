//! Workout session state machine.
//!
//! Owns the authoritative [`SessionState`] and every transition of it:
//! user intents (begin, complete, skip, end) and per-second clock ticks.
//! The machine is synchronous; serialisation of intents and ticks is the
//! caller's job (see [`crate::SessionPlayer`]).

use crate::{PlayerError, Result};
use chrono::Utc;
use gympulse_types::{ExerciseSpec, RestKind, SessionPhase, SessionState, WorkoutDefinition};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Result of [`SessionStateMachine::start_session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// A fresh session replaced whatever was there.
    Started,
    /// An active session for the same workout was kept as-is.
    Resumed,
}

/// Result of one clock tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Clock is gated off; nothing changed.
    Idle,
    /// Time advanced without a phase change.
    Counted,
    /// Rest countdown hit zero; back to work.
    RestElapsed,
    /// Work countdown hit zero; the set was completed.
    WorkElapsed,
}

/// Recorded end of a session, taken once by the owner for broadcasting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinishRecord {
    pub session_id: Uuid,
    pub workout_id: String,
    pub duration_seconds: u64,
    /// False when the athlete ended the session early.
    pub completed: bool,
}

#[derive(Debug, Default)]
pub struct SessionStateMachine {
    state: SessionState,
    workout: Option<Arc<WorkoutDefinition>>,
    finish: Option<FinishRecord>,
}

impl SessionStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn workout(&self) -> Option<&Arc<WorkoutDefinition>> {
        self.workout.as_ref()
    }

    pub fn current_exercise(&self) -> Option<&ExerciseSpec> {
        self.workout
            .as_ref()
            .and_then(|w| w.exercise(self.state.current_exercise_index))
    }

    /// Take the pending finish record, if the last mutation ended the session.
    pub fn take_finish(&mut self) -> Option<FinishRecord> {
        self.finish.take()
    }

    /// Start a session for `workout` at `start_index`.
    ///
    /// An active session for the same workout id is resumed untouched.
    /// Out-of-range start indices clamp to the first exercise.
    pub fn start_session(&mut self, workout: Arc<WorkoutDefinition>, start_index: usize) -> StartOutcome {
        if self.state.is_resumable_for(&workout.id) {
            info!(
                target: "gympulse::session",
                "Resuming session for workout {} at exercise {} set {} ({})",
                workout.id,
                self.state.current_exercise_index,
                self.state.current_set,
                self.state.phase
            );
            return StartOutcome::Resumed;
        }

        let index = if start_index < workout.len() {
            start_index
        } else {
            if start_index != 0 {
                warn!(
                    target: "gympulse::session",
                    "Start index {} out of range for workout {} ({} exercises), using 0",
                    start_index,
                    workout.id,
                    workout.len()
                );
            }
            0
        };

        if self.state.is_active {
            info!(
                target: "gympulse::session",
                "Replacing active session for workout {:?}",
                self.state.workout_id
            );
        }

        let session_id = Uuid::new_v4();
        self.state = SessionState {
            workout_id: Some(workout.id.clone()),
            session_id: Some(session_id),
            phase: SessionPhase::Ready,
            current_exercise_index: index,
            current_set: 1,
            total_elapsed_seconds: 0,
            rest_remaining_seconds: 0,
            work_remaining_seconds: None,
            rest_kind: None,
            is_active: true,
            last_updated: Utc::now(),
        };
        self.finish = None;

        info!(
            target: "gympulse::session",
            "Session {} started for workout {} at exercise {}",
            session_id,
            workout.id,
            index
        );
        self.workout = Some(workout);
        StartOutcome::Started
    }

    /// READY -> WORKING.
    pub fn begin_work(&mut self) -> Result<()> {
        self.expect_phase(SessionPhase::Ready)?;

        let work_seconds = match self.current_exercise() {
            Some(exercise) => exercise.work_seconds(),
            None => {
                let id = self.state.workout_id.clone().unwrap_or_default();
                warn!(target: "gympulse::session", "Refusing to begin workout {}: no exercises", id);
                return Err(PlayerError::WorkoutNotPlayable(id));
            }
        };

        self.state.phase = SessionPhase::Working;
        self.state.work_remaining_seconds = work_seconds;
        self.touch();
        debug!(
            target: "gympulse::session",
            "Work started: exercise {} set {}",
            self.state.current_exercise_index,
            self.state.current_set
        );
        Ok(())
    }

    /// The current set is done. Enters rest, or finishes after the last set.
    pub fn complete_current_interval(&mut self) -> Result<()> {
        self.expect_phase(SessionPhase::Working)?;
        self.rest_or_finish();
        self.touch();
        Ok(())
    }

    /// Rest is over: advance to the next set or exercise and resume work.
    pub fn rest_elapsed(&mut self) -> Result<()> {
        self.expect_phase(SessionPhase::Resting)?;
        self.advance_after_rest();
        self.touch();
        Ok(())
    }

    /// Cut the current rest short.
    ///
    /// Returns `false` without changing anything when no rest is running,
    /// e.g. when a tick already expired it.
    pub fn skip_rest(&mut self) -> Result<bool> {
        self.expect_session()?;
        if self.state.phase != SessionPhase::Resting {
            debug!(
                target: "gympulse::session",
                "Skip rest ignored in phase {}",
                self.state.phase
            );
            return Ok(false);
        }

        debug!(
            target: "gympulse::session",
            "Skipping rest with {}s remaining",
            self.state.rest_remaining_seconds
        );
        self.state.rest_remaining_seconds = 0;
        self.rest_elapsed()?;
        Ok(true)
    }

    /// Natural completion after the last set.
    pub fn finish_session(&mut self) -> Result<()> {
        self.expect_session()?;
        if self.state.phase != SessionPhase::Finished {
            self.finish(true);
            self.touch();
        }
        Ok(())
    }

    /// Early termination from any non-terminal phase.
    ///
    /// Returns `false` when the session had already finished.
    pub fn end_session(&mut self) -> Result<bool> {
        self.expect_session()?;
        if self.state.phase == SessionPhase::Finished {
            return Ok(false);
        }
        self.finish(false);
        self.touch();
        Ok(true)
    }

    /// Advance time by one second.
    pub fn tick(&mut self) -> TickOutcome {
        if !self.state.clock_running() {
            return TickOutcome::Idle;
        }

        self.state.total_elapsed_seconds += 1;

        let outcome = match self.state.phase {
            SessionPhase::Resting => {
                // A zero-length rest still spends this one tick in RESTING.
                self.state.rest_remaining_seconds = self.state.rest_remaining_seconds.saturating_sub(1);
                if self.state.rest_remaining_seconds == 0 {
                    self.advance_after_rest();
                    TickOutcome::RestElapsed
                } else {
                    TickOutcome::Counted
                }
            }
            SessionPhase::Working => match self.state.work_remaining_seconds {
                Some(remaining) if remaining > 0 => {
                    let remaining = remaining - 1;
                    self.state.work_remaining_seconds = Some(remaining);
                    if remaining == 0 {
                        self.rest_or_finish();
                        TickOutcome::WorkElapsed
                    } else {
                        TickOutcome::Counted
                    }
                }
                _ => TickOutcome::Counted,
            },
            SessionPhase::Ready | SessionPhase::Finished => TickOutcome::Idle,
        };

        self.touch();
        outcome
    }

    fn rest_or_finish(&mut self) {
        let Some(workout) = self.workout.clone() else {
            self.finish(true);
            return;
        };
        let index = self.state.current_exercise_index;
        let Some(exercise) = workout.exercise(index) else {
            self.finish(true);
            return;
        };

        let kind = if self.state.current_set < exercise.effective_sets() {
            RestKind::BetweenSets
        } else if index + 1 < workout.len() {
            RestKind::BetweenExercises
        } else {
            info!(
                target: "gympulse::session",
                "Last set of workout {} completed",
                workout.id
            );
            self.finish(true);
            return;
        };

        self.state.phase = SessionPhase::Resting;
        self.state.rest_remaining_seconds = exercise.rest_seconds;
        self.state.rest_kind = Some(kind);
        self.state.work_remaining_seconds = None;
        debug!(
            target: "gympulse::session",
            "Rest {:?} for {}s after exercise {} set {}",
            kind,
            exercise.rest_seconds,
            index,
            self.state.current_set
        );
    }

    fn advance_after_rest(&mut self) {
        let Some(workout) = self.workout.clone() else {
            self.finish(true);
            return;
        };
        let sets = self.current_exercise().map(|e| e.effective_sets()).unwrap_or(1);

        if self.state.current_set < sets {
            self.state.current_set += 1;
        } else if self.state.current_exercise_index + 1 < workout.len() {
            self.state.current_exercise_index += 1;
            self.state.current_set = 1;
        } else {
            self.finish(true);
            return;
        }

        self.state.phase = SessionPhase::Working;
        self.state.rest_remaining_seconds = 0;
        self.state.rest_kind = None;
        self.state.work_remaining_seconds = self.current_exercise().and_then(|e| e.work_seconds());
        debug!(
            target: "gympulse::session",
            "Work resumed: exercise {} set {}",
            self.state.current_exercise_index,
            self.state.current_set
        );
    }

    fn finish(&mut self, completed: bool) {
        self.state.phase = SessionPhase::Finished;
        self.state.is_active = false;
        self.state.rest_remaining_seconds = 0;
        self.state.work_remaining_seconds = None;
        self.state.rest_kind = None;

        if let (Some(session_id), Some(workout_id)) = (self.state.session_id, self.state.workout_id.clone()) {
            info!(
                target: "gympulse::session",
                "Session {} {} after {}s",
                session_id,
                if completed { "completed" } else { "ended early" },
                self.state.total_elapsed_seconds
            );
            self.finish = Some(FinishRecord {
                session_id,
                workout_id,
                duration_seconds: self.state.total_elapsed_seconds,
                completed,
            });
        }
    }

    fn touch(&mut self) {
        self.state.last_updated = Utc::now();
    }

    fn expect_session(&self) -> Result<()> {
        if self.state.workout_id.is_none() {
            return Err(PlayerError::NoActiveSession);
        }
        Ok(())
    }

    fn expect_phase(&self, expected: SessionPhase) -> Result<()> {
        self.expect_session()?;
        if self.state.phase != expected {
            return Err(PlayerError::InvalidTransition {
                expected: expected.to_string(),
                actual: self.state.phase.to_string(),
            });
        }
        Ok(())
    }
}

//! Core session player for GymPulse: state machine, clock and workout sources.

mod clock;
mod error;
mod machine;
mod player;
mod source;

pub use clock::TICK_PERIOD;
pub use error::PlayerError;
pub use machine::{FinishRecord, SessionStateMachine, StartOutcome, TickOutcome};
pub use player::{PlayerConfig, PlayerEvent, SessionPlayer};
pub use source::{CatalogWorkoutSource, HttpWorkoutSource, WorkoutSource};

/// Result type for GymPulse operations.
pub type Result<T> = std::result::Result<T, PlayerError>;

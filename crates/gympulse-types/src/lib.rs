//! Shared types for the GymPulse session player.

mod session;
mod workout;
mod ws;

pub use session::*;
pub use workout::*;
pub use ws::*;

//! Shared application state.

use crate::config::Config;
use gympulse_core::{
    CatalogWorkoutSource, HttpWorkoutSource, PlayerConfig, SessionPlayer, WorkoutSource,
};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub player: Arc<SessionPlayer>,
    pub config: Config,
}

impl AppState {
    /// Build state with the workout source named by the config.
    pub fn new(config: Config) -> gympulse_core::Result<Self> {
        let source: Arc<dyn WorkoutSource> = match &config.catalog_path {
            Some(path) => Arc::new(CatalogWorkoutSource::load(path)?),
            None => Arc::new(HttpWorkoutSource::new(
                config.backend_url.clone(),
                config.api_token.clone(),
                config.request_timeout(),
            )?),
        };
        Ok(Self::with_source(config, source))
    }

    pub fn with_source(config: Config, source: Arc<dyn WorkoutSource>) -> Self {
        let player_config = PlayerConfig {
            event_capacity: config.event_capacity,
            ..PlayerConfig::default()
        };
        Self {
            player: Arc::new(SessionPlayer::new(source, player_config)),
            config,
        }
    }
}

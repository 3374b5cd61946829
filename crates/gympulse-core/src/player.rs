//! The session player: one owned session shared by the clock and renderers.

use crate::clock::{SessionClock, TICK_PERIOD};
use crate::machine::{FinishRecord, SessionStateMachine, StartOutcome, TickOutcome};
use crate::{PlayerError, Result, WorkoutSource};
use gympulse_types::{PlayerView, SessionPhase, SessionSnapshot, SessionState};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

/// Configuration for the session player.
#[derive(Debug, Clone)]
pub struct PlayerConfig {
    /// Capacity of the event broadcast channel.
    pub event_capacity: usize,
    pub tick_period: Duration,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            event_capacity: 256,
            tick_period: TICK_PERIOD,
        }
    }
}

/// Events broadcast to renderers.
#[derive(Debug, Clone)]
pub enum PlayerEvent {
    /// Emitted after every mutation, by intent or by the clock.
    StateChanged(SessionSnapshot),
    /// Emitted once when a session ends.
    Finished(FinishRecord),
}

/// State guarded by the player's single lock.
pub(crate) struct PlayerCore {
    pub(crate) machine: SessionStateMachine,
    pub(crate) clock: Option<SessionClock>,
    next_clock_id: u64,
}

impl PlayerCore {
    pub(crate) fn clock_id(&self) -> Option<u64> {
        self.clock.as_ref().map(|c| c.id())
    }

    /// Apply up to `count` ticks, stopping once the clock gates off.
    pub(crate) fn apply_ticks(&mut self, count: u32) -> u32 {
        let mut applied = 0;
        for _ in 0..count {
            if self.machine.tick() == TickOutcome::Idle {
                break;
            }
            applied += 1;
        }
        applied
    }

    pub(crate) fn snapshot(&self) -> SessionSnapshot {
        let state = self.machine.state().clone();
        let view = self.machine.workout().map(|w| PlayerView::derive(&state, w));
        SessionSnapshot { state, view }
    }

    /// Restart the running clock's period, if any.
    fn rearm_clock(&mut self) {
        if let Some(clock) = self.clock.as_mut() {
            clock.rearm();
        }
    }

    /// Broadcast the current snapshot, plus the finish record if one is pending.
    pub(crate) fn publish(&mut self, events: &broadcast::Sender<PlayerEvent>) {
        let _ = events.send(PlayerEvent::StateChanged(self.snapshot()));
        if let Some(record) = self.machine.take_finish() {
            let _ = events.send(PlayerEvent::Finished(record));
        }
    }
}

/// Owns the single workout session.
///
/// All intents and clock ticks go through one async mutex, so state
/// mutations never interleave. The clock's lifetime follows the session,
/// not any connected renderer: renderers come and go, the clock keeps
/// running while the session is active.
pub struct SessionPlayer {
    core: Arc<Mutex<PlayerCore>>,
    source: Arc<dyn WorkoutSource>,
    event_tx: broadcast::Sender<PlayerEvent>,
    config: PlayerConfig,
}

impl SessionPlayer {
    pub fn new(source: Arc<dyn WorkoutSource>, config: PlayerConfig) -> Self {
        let (event_tx, _) = broadcast::channel(config.event_capacity.max(1));
        Self {
            core: Arc::new(Mutex::new(PlayerCore {
                machine: SessionStateMachine::new(),
                clock: None,
                next_clock_id: 0,
            })),
            source,
            event_tx,
            config,
        }
    }

    /// Subscribe to player events.
    pub fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.event_tx.subscribe()
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        self.core.lock().await.snapshot()
    }

    pub async fn state(&self) -> SessionState {
        self.core.lock().await.machine.state().clone()
    }

    /// Whether a clock task is currently scheduled.
    pub async fn clock_scheduled(&self) -> bool {
        self.core.lock().await.clock.is_some()
    }

    /// Start a session for `workout_id`, or rebind to the active one.
    ///
    /// The workout is fetched only when a new session actually starts.
    pub async fn start_session(&self, workout_id: &str, start_index: usize) -> Result<(StartOutcome, SessionSnapshot)> {
        {
            let mut core = self.core.lock().await;
            if core.machine.state().is_resumable_for(workout_id) {
                let workout = core.machine.workout().cloned().ok_or(PlayerError::NoActiveSession)?;
                let outcome = core.machine.start_session(workout, start_index);
                self.sync_clock(&mut core);
                return Ok((outcome, core.snapshot()));
            }
        }

        let mut workout = self.source.fetch_workout(workout_id).await.map_err(|e| {
            warn!(target: "gympulse::session", "Failed to fetch workout {}: {}", workout_id, e);
            e
        })?;
        if !workout.is_playable() {
            warn!(target: "gympulse::session", "Workout {} has no exercises", workout_id);
            return Err(PlayerError::WorkoutNotPlayable(workout_id.to_string()));
        }
        if workout.id != workout_id {
            debug!(
                target: "gympulse::session",
                "Workout id {} served for request {}, keying session by request",
                workout.id,
                workout_id
            );
            workout.id = workout_id.to_string();
        }

        let mut core = self.core.lock().await;
        let outcome = core.machine.start_session(Arc::new(workout), start_index);
        Ok((outcome, self.commit(&mut core)))
    }

    pub async fn begin_work(&self) -> Result<SessionSnapshot> {
        let mut core = self.core.lock().await;
        core.machine.begin_work()?;
        Ok(self.commit(&mut core))
    }

    pub async fn complete_current_interval(&self) -> Result<SessionSnapshot> {
        let mut core = self.core.lock().await;
        core.machine.complete_current_interval()?;
        // A fresh rest starts a full period from now.
        if core.machine.state().phase == SessionPhase::Resting {
            core.rearm_clock();
        }
        Ok(self.commit(&mut core))
    }

    /// Skip the running rest. A no-op when no rest is running.
    pub async fn skip_rest(&self) -> Result<SessionSnapshot> {
        let mut core = self.core.lock().await;
        if !core.machine.skip_rest()? {
            return Ok(core.snapshot());
        }
        core.rearm_clock();
        Ok(self.commit(&mut core))
    }

    pub async fn end_session(&self) -> Result<SessionSnapshot> {
        let mut core = self.core.lock().await;
        if !core.machine.end_session()? {
            return Ok(core.snapshot());
        }
        Ok(self.commit(&mut core))
    }

    /// Reconcile the clock, broadcast, and return the new snapshot.
    fn commit(&self, core: &mut PlayerCore) -> SessionSnapshot {
        self.sync_clock(core);
        core.publish(&self.event_tx);
        core.snapshot()
    }

    /// Ensure exactly one clock runs iff the session needs one.
    fn sync_clock(&self, core: &mut PlayerCore) {
        let should_run = core.machine.state().clock_running();
        match (should_run, core.clock.is_some()) {
            (true, false) => {
                core.next_clock_id += 1;
                core.clock = Some(SessionClock::spawn(
                    core.next_clock_id,
                    self.config.tick_period,
                    self.core.clone(),
                    self.event_tx.clone(),
                ));
            }
            (false, true) => {
                if let Some(clock) = core.clock.take() {
                    clock.stop();
                }
                info!(target: "gympulse::clock", "Clock stopped in phase {}", core.machine.state().phase);
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CatalogWorkoutSource;
    use gympulse_types::{ExerciseSpec, SessionPhase, WorkoutDefinition};

    fn player() -> SessionPlayer {
        let source = CatalogWorkoutSource::from_workouts(vec![
            WorkoutDefinition {
                id: "w1".into(),
                title: "Squats".into(),
                exercises: vec![ExerciseSpec::reps("Squat", 2, 10).with_rest(30)],
            },
            WorkoutDefinition {
                id: "w2".into(),
                title: "Pair".into(),
                exercises: vec![
                    ExerciseSpec::reps("Push-up", 1, 10).with_rest(10),
                    ExerciseSpec::timed("Plank", 1, 20),
                ],
            },
            WorkoutDefinition {
                id: "empty".into(),
                title: "Nothing".into(),
                exercises: vec![],
            },
        ]);
        SessionPlayer::new(Arc::new(source), PlayerConfig::default())
    }

    async fn advance(seconds: u64) {
        tokio::time::sleep(Duration::from_secs(seconds) + Duration::from_millis(10)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_rest_elapses_on_clock() {
        let player = player();
        let (outcome, snap) = player.start_session("w1", 0).await.unwrap();
        assert_eq!(outcome, StartOutcome::Started);
        assert_eq!(snap.state.phase, SessionPhase::Ready);
        assert!(!player.clock_scheduled().await);

        player.begin_work().await.unwrap();
        assert!(player.clock_scheduled().await);

        let snap = player.complete_current_interval().await.unwrap();
        assert_eq!(snap.state.phase, SessionPhase::Resting);
        assert_eq!(snap.state.rest_remaining_seconds, 30);

        advance(30).await;
        let state = player.state().await;
        assert_eq!(state.phase, SessionPhase::Working);
        assert_eq!(state.current_set, 2);
        assert_eq!(state.total_elapsed_seconds, 30);

        let snap = player.complete_current_interval().await.unwrap();
        assert_eq!(snap.state.phase, SessionPhase::Finished);
        assert!(!player.clock_scheduled().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_elapsed_frozen_after_end() {
        let player = player();
        player.start_session("w1", 0).await.unwrap();
        player.begin_work().await.unwrap();
        advance(5).await;

        let snap = player.end_session().await.unwrap();
        assert_eq!(snap.state.phase, SessionPhase::Finished);
        assert_eq!(snap.state.total_elapsed_seconds, 5);
        assert!(!player.clock_scheduled().await);

        advance(10).await;
        assert_eq!(player.state().await.total_elapsed_seconds, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resume_keeps_progress_and_single_clock() {
        let player = player();
        player.start_session("w1", 0).await.unwrap();
        player.begin_work().await.unwrap();
        advance(4).await;

        let (outcome, snap) = player.start_session("w1", 0).await.unwrap();
        assert_eq!(outcome, StartOutcome::Resumed);
        assert_eq!(snap.state.phase, SessionPhase::Working);
        assert_eq!(snap.state.total_elapsed_seconds, 4);

        // A duplicate clock would count twice as fast.
        advance(3).await;
        assert_eq!(player.state().await.total_elapsed_seconds, 7);
    }

    #[tokio::test(start_paused = true)]
    async fn test_skip_rest_stops_rest_countdown() {
        let player = player();
        player.start_session("w2", 0).await.unwrap();
        player.begin_work().await.unwrap();
        player.complete_current_interval().await.unwrap();

        let snap = player.skip_rest().await.unwrap();
        assert_eq!(snap.state.phase, SessionPhase::Working);
        assert_eq!(snap.state.rest_remaining_seconds, 0);
        assert_eq!(snap.state.current_exercise_index, 1);
        assert_eq!(snap.state.work_remaining_seconds, Some(20));

        advance(5).await;
        let state = player.state().await;
        assert_eq!(state.work_remaining_seconds, Some(15));

        // Skipping again outside rest changes nothing.
        let snap = player.skip_rest().await.unwrap();
        assert_eq!(snap.state.current_exercise_index, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timed_last_exercise_finishes_on_clock() {
        let player = player();
        let mut events = player.subscribe();
        player.start_session("w2", 1).await.unwrap();
        player.begin_work().await.unwrap();

        advance(20).await;
        let state = player.state().await;
        assert_eq!(state.phase, SessionPhase::Finished);
        assert_eq!(state.total_elapsed_seconds, 20);
        assert!(!player.clock_scheduled().await);

        let mut finished = None;
        while let Ok(event) = events.try_recv() {
            if let PlayerEvent::Finished(record) = event {
                finished = Some(record);
            }
        }
        let record = finished.expect("finish event");
        assert!(record.completed);
        assert_eq!(record.duration_seconds, 20);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rest_gets_full_period_after_mid_second_completion() {
        let player = player();
        player.start_session("w1", 0).await.unwrap();
        player.begin_work().await.unwrap();
        tokio::time::sleep(Duration::from_millis(1900)).await;

        let snap = player.complete_current_interval().await.unwrap();
        assert_eq!(snap.state.rest_remaining_seconds, 30);

        // The 0.9s already spent on this second belongs to the work interval.
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(player.state().await.rest_remaining_seconds, 30);

        tokio::time::sleep(Duration::from_millis(29_800)).await;
        let state = player.state().await;
        assert_eq!(state.phase, SessionPhase::Resting);
        assert_eq!(state.rest_remaining_seconds, 1);

        tokio::time::sleep(Duration::from_millis(100)).await;
        let state = player.state().await;
        assert_eq!(state.phase, SessionPhase::Working);
        assert_eq!(state.current_set, 2);
        assert_eq!(state.total_elapsed_seconds, 31);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_clock_catches_up_across_rest() {
        let player = player();
        player.start_session("w2", 0).await.unwrap();
        player.begin_work().await.unwrap();
        player.complete_current_interval().await.unwrap();

        // Hold the lock over 13 periods, as a suspended host would.
        tokio::time::sleep(Duration::from_millis(500)).await;
        {
            let _stalled = player.core.lock().await;
            tokio::time::sleep(Duration::from_secs(13)).await;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;

        // 10s of rest, then 3s into the timed plank.
        let state = player.state().await;
        assert_eq!(state.total_elapsed_seconds, 13);
        assert_eq!(state.phase, SessionPhase::Working);
        assert_eq!(state.current_exercise_index, 1);
        assert_eq!(state.work_remaining_seconds, Some(17));
        assert!(player.clock_scheduled().await);

        // Back on schedule: the next tick lands on the next whole second.
        tokio::time::sleep(Duration::from_millis(540)).await;
        let state = player.state().await;
        assert_eq!(state.total_elapsed_seconds, 14);
        assert_eq!(state.work_remaining_seconds, Some(16));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stall_past_the_end_freezes_at_finish() {
        let player = player();
        player.start_session("w2", 0).await.unwrap();
        player.begin_work().await.unwrap();
        player.complete_current_interval().await.unwrap();

        {
            let _stalled = player.core.lock().await;
            tokio::time::sleep(Duration::from_secs(45)).await;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;

        // 10s rest + 20s plank; the remaining stalled time is not counted.
        let state = player.state().await;
        assert_eq!(state.phase, SessionPhase::Finished);
        assert_eq!(state.total_elapsed_seconds, 30);
        assert!(!state.is_active);
        assert!(!player.clock_scheduled().await);
    }

    #[tokio::test]
    async fn test_empty_workout_refused() {
        let player = player();
        let err = player.start_session("empty", 0).await.unwrap_err();
        assert!(matches!(err, PlayerError::WorkoutNotPlayable(_)));
        assert!(player.state().await.workout_id.is_none());
    }

    #[tokio::test]
    async fn test_unknown_workout() {
        let player = player();
        assert!(matches!(
            player.start_session("missing", 0).await,
            Err(PlayerError::WorkoutNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_intents_emit_snapshots() {
        let player = player();
        let mut events = player.subscribe();
        player.start_session("w1", 0).await.unwrap();
        player.begin_work().await.unwrap();

        match events.recv().await.unwrap() {
            PlayerEvent::StateChanged(snap) => assert_eq!(snap.state.phase, SessionPhase::Ready),
            other => panic!("unexpected event: {:?}", other),
        }
        match events.recv().await.unwrap() {
            PlayerEvent::StateChanged(snap) => {
                assert_eq!(snap.state.phase, SessionPhase::Working);
                assert_eq!(snap.view.unwrap().exercise_title.as_deref(), Some("Squat"));
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }
}

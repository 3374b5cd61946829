//! Per-second session clock.
//!
//! One background task per running session. The anchor (instant of the last
//! applied tick) lives in the clock handle, under the player lock. On every
//! wake-up the task works out how many whole periods passed since the
//! anchor and applies that many ticks, so a host that suspended the task
//! (sleep, backgrounding) catches up on resume instead of losing time.

use crate::player::{PlayerCore, PlayerEvent};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex, Notify};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, trace};

/// Tick period used by the player.
pub const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Handle to the running clock task.
pub(crate) struct SessionClock {
    id: u64,
    last_tick: Instant,
    handle: JoinHandle<()>,
    rearm: Arc<Notify>,
}

impl SessionClock {
    pub(crate) fn spawn(
        id: u64,
        period: Duration,
        core: Arc<Mutex<PlayerCore>>,
        events: broadcast::Sender<PlayerEvent>,
    ) -> Self {
        let period = period.max(Duration::from_millis(1));
        let start = Instant::now();
        let rearm = Arc::new(Notify::new());
        let handle = tokio::spawn(run(id, period, start, core, events, rearm.clone()));
        debug!(target: "gympulse::clock", "Clock {} started", id);
        Self {
            id,
            last_tick: start,
            handle,
            rearm,
        }
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    /// Restart the period from now, dropping any partially elapsed second.
    ///
    /// Must be called with the player lock held, so a tick already waiting
    /// on the lock sees the new anchor and applies nothing.
    pub(crate) fn rearm(&mut self) {
        self.last_tick = Instant::now();
        self.rearm.notify_one();
    }

    pub(crate) fn stop(self) {
        self.handle.abort();
        debug!(target: "gympulse::clock", "Clock {} stopped", self.id);
    }
}

async fn run(
    id: u64,
    period: Duration,
    start: Instant,
    core: Arc<Mutex<PlayerCore>>,
    events: broadcast::Sender<PlayerEvent>,
    rearm: Arc<Notify>,
) {
    let mut deadline = start + period;

    loop {
        tokio::select! {
            _ = tokio::time::sleep_until(deadline) => {}
            _ = rearm.notified() => {
                trace!(target: "gympulse::clock::tick", "Clock {} re-armed", id);
            }
        }

        let mut core = core.lock().await;
        let Some(last_tick) = core.clock.as_ref().filter(|c| c.id == id).map(|c| c.last_tick) else {
            // Superseded while waiting for the lock.
            break;
        };

        let due = due_ticks(Instant::now().saturating_duration_since(last_tick), period);
        if due == 0 {
            deadline = last_tick + period;
            continue;
        }
        if due > 1 {
            debug!(target: "gympulse::clock", "Clock {} catching up {} ticks", id, due);
        }

        let anchor = last_tick + period * due;
        if let Some(clock) = core.clock.as_mut() {
            clock.last_tick = anchor;
        }
        deadline = anchor + period;

        let applied = core.apply_ticks(due);
        trace!(
            target: "gympulse::clock::tick",
            "Clock {} applied {} ticks, elapsed {}s",
            id,
            applied,
            core.machine.state().total_elapsed_seconds
        );
        core.publish(&events);

        if !core.machine.state().clock_running() {
            core.clock = None;
            debug!(target: "gympulse::clock", "Clock {} finished with session", id);
            break;
        }
    }
}

/// Whole periods contained in `elapsed`.
fn due_ticks(elapsed: Duration, period: Duration) -> u32 {
    if period.is_zero() {
        return 0;
    }
    u32::try_from(elapsed.as_nanos() / period.as_nanos()).unwrap_or(u32::MAX)
}

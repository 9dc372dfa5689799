//! The scheduler: ownership of the one price-update timer.
//!
//! Exactly one timer task may be alive per session. Both `arm` and `disarm`
//! unconditionally abort whatever handle is currently held before doing
//! anything else, so no transition sequence can leave two timers running.
//! Only lifecycle transitions call in here.

use std::sync::Mutex;
use std::time::Duration;

use actibourse_types::session::Mode;
use rand::Rng;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::debug;

use crate::session::Session;

pub struct Scheduler {
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            handle: Mutex::new(None),
        }
    }

    /// Clear any existing timer and arm a fresh one for the given mode.
    pub fn arm(&self, session: Session, mode: Mode) {
        let mut slot = self.handle.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(previous) = slot.take() {
            previous.abort();
        }
        debug!(?mode, "arming update timer");
        *slot = Some(match mode {
            Mode::Test => tokio::spawn(run_fixed_timer(session)),
            Mode::Game => tokio::spawn(run_random_timer(session)),
        });
    }

    /// Clear the timer if one is armed. Idempotent.
    pub fn disarm(&self) {
        let mut slot = self.handle.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(task) = slot.take() {
            debug!("disarming update timer");
            task.abort();
        }
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

/// Test mode: a repeating fixed interval.
async fn run_fixed_timer(session: Session) {
    let period = Duration::from_millis(session.config().test_update_interval_ms);
    let mut ticker = time::interval_at(time::Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        if !session.tick(Mode::Test) {
            break;
        }
    }
}

/// Game mode: a self-perpetuating chain of one-shots, each with a freshly
/// drawn random delay.
async fn run_random_timer(session: Session) {
    loop {
        let delay = {
            let config = session.config();
            let mut rng = rand::thread_rng();
            Duration::from_millis(
                rng.gen_range(config.game_min_interval_ms..=config.game_max_interval_ms),
            )
        };
        debug!(?delay, "next update scheduled");
        time::sleep(delay).await;
        if !session.tick(Mode::Game) {
            break;
        }
    }
}

//! Lifecycle transitions: the state-flag side of start/pause/reset.
//!
//! Arming and disarming the actual timer is the scheduler's job; these
//! functions only flip the session flags and keep the activity feed honest.

use actibourse_types::config::Config;
use actibourse_types::history::HistoryKind;
use actibourse_types::session::{Mode, SessionState};

/// Mark the session running in the given mode and stamp the start time.
/// Also used for a mode switch while already running.
pub fn start(state: &mut SessionState, mode: Mode, now: u64) {
    state.is_running = true;
    state.mode = mode;
    state.start_time = Some(now);
    state.record(now, "Simulation started", HistoryKind::System);
}

/// Suspend the session. Idempotent: pausing an already-paused session does
/// nothing and records nothing. Returns whether the state changed.
pub fn pause(state: &mut SessionState, now: u64) -> bool {
    if !state.is_running {
        return false;
    }
    state.is_running = false;
    state.record(now, "Simulation paused", HistoryKind::System);
    true
}

/// Rebuild the session from its configuration: fresh stocks, fresh balances,
/// cleared accumulators and feed, stopped.
pub fn reset(state: &mut SessionState, config: &Config, now: u64) {
    *state = SessionState::new(config);
    state.record(now, "Session reset", HistoryKind::System);
}

#[cfg(test)]
mod tests {
    use super::*;
    use actibourse_types::api::Action;

    #[test]
    fn test_start_stamps_time_and_mode() {
        let config = Config::default();
        let mut state = SessionState::new(&config);
        start(&mut state, Mode::Game, 1_000);
        assert!(state.is_running);
        assert_eq!(state.mode, Mode::Game);
        assert_eq!(state.start_time, Some(1_000));
        assert_eq!(state.history.len(), 1);

        // A mode switch while running re-stamps the start time.
        start(&mut state, Mode::Test, 2_000);
        assert_eq!(state.mode, Mode::Test);
        assert_eq!(state.start_time, Some(2_000));
    }

    #[test]
    fn test_pause_is_idempotent() {
        let config = Config::default();
        let mut state = SessionState::new(&config);
        start(&mut state, Mode::Test, 1_000);

        assert!(pause(&mut state, 2_000));
        assert!(!state.is_running);
        let entries = state.history.len();

        assert!(!pause(&mut state, 3_000));
        assert_eq!(state.history.len(), entries);
        // Pause keeps the start time so elapsed-time displays survive.
        assert_eq!(state.start_time, Some(1_000));
    }

    #[test]
    fn test_reset_rebuilds_everything() {
        let config = Config::default();
        let mut state = SessionState::new(&config);
        start(&mut state, Mode::Game, 1_000);
        crate::transaction::execute(&mut state, "panda", "benco", Action::Buy, 5, 2).unwrap();
        state.stocks.get_mut("benco").unwrap().record_price(75.0);

        reset(&mut state, &config, 3_000);
        assert!(!state.is_running);
        assert_eq!(state.start_time, None);
        assert_eq!(state.teams["panda"].points, config.initial_points);
        assert_eq!(state.teams["panda"].portfolio["benco"], 0);
        assert_eq!(state.investments["benco"], 0);
        assert_eq!(state.stocks["benco"].price, 50.0);
        // Only the reset notice survives in the feed.
        assert_eq!(state.history.len(), 1);
        assert_eq!(state.history[0].message, "Session reset");
    }
}

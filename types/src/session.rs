use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::history::{HistoryEntry, HistoryKind, HISTORY_LIMIT};
use crate::market::{Stock, Team};

/// Price-update cadence of a running session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Fast fixed-interval updates, for demonstration and rehearsal.
    Test,
    /// Slow randomized-interval updates, for the real activity.
    Game,
}

/// The full shared state of one session.
///
/// Exactly one mutable instance exists per session; the server owns it and
/// observers receive read-only snapshots. All mutation goes through the
/// functions in `actibourse-engine` so no partial update is ever visible.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub stocks: BTreeMap<String, Stock>,
    pub teams: BTreeMap<String, Team>,
    /// Net outstanding bought quantity per stock, feeding price drift.
    pub investments: BTreeMap<String, u32>,
    /// Activity feed, newest first, capped at [`HISTORY_LIMIT`].
    pub history: Vec<HistoryEntry>,
    pub is_running: bool,
    pub mode: Mode,
    /// Unix millis of the last start; kept across pause, cleared on reset.
    pub start_time: Option<u64>,
}

impl SessionState {
    /// Build the initial state for a configuration: all stocks at their
    /// initial price, all teams at the starting balance, empty feed.
    pub fn new(config: &Config) -> Self {
        Self {
            stocks: config
                .stocks
                .iter()
                .map(|s| (s.id.clone(), Stock::new(s)))
                .collect(),
            teams: config
                .teams
                .iter()
                .map(|t| (t.id.clone(), Team::new(t, config.initial_points, &config.stocks)))
                .collect(),
            investments: config.stocks.iter().map(|s| (s.id.clone(), 0)).collect(),
            history: Vec::new(),
            is_running: false,
            mode: Mode::Test,
            start_time: None,
        }
    }

    /// Append to the activity feed, evicting the oldest entry past the cap.
    pub fn record(&mut self, time: u64, message: impl Into<String>, kind: HistoryKind) {
        self.history.insert(
            0,
            HistoryEntry {
                time,
                message: message.into(),
                kind,
            },
        );
        self.history.truncate(HISTORY_LIMIT);
    }
}

use serde::{Deserialize, Serialize};

/// Number of history entries retained per session, newest first.
pub const HISTORY_LIMIT: usize = 50;

/// Category of a history entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryKind {
    Buy,
    Sell,
    System,
}

/// One line of the session activity feed. Purely observational: nothing in
/// the engine ever reads it back.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Unix timestamp in milliseconds.
    pub time: u64,
    pub message: String,
    pub kind: HistoryKind,
}

//! JSON protocol between the server and its observers.
//!
//! Observers send [`Command`]s (over the WebSocket or `POST /command`) and
//! receive [`Update`]s. All command sources are treated identically; there is
//! no per-observer authorization.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::market::Stock;
use crate::session::{Mode, SessionState};

/// Direction of a trade.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Buy,
    Sell,
}

/// Inbound command from any observer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    /// Start (or, while running, switch the cadence of) the session.
    Start { mode: Mode },
    Pause,
    Reset,
    /// Run the price engine once, regardless of the running state.
    ForceUpdate,
    Transaction {
        team_id: String,
        stock_id: String,
        action: Action,
        quantity: u32,
    },
    /// Manual balance correction by the organizers.
    AdjustPoints { team_id: String, delta: i64 },
    /// Ask for a fresh full-state snapshot.
    RequestState,
}

/// Outbound message to observers.
///
/// Price ticks carry only the stock table; everything else that mutates state
/// is followed by a full snapshot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Update {
    State { state: SessionState },
    Stocks { stocks: BTreeMap<String, Stock> },
    Started { start_time: u64 },
    Paused,
    Reset,
    /// Sent only to the observer whose command was rejected.
    Rejected { message: String },
}

/// Typed rejection of a transaction or adjustment. All variants are locally
/// recoverable: the command performs no mutation and the session carries on.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum TransactionError {
    #[error("unknown team: {0}")]
    UnknownTeam(String),
    #[error("unknown stock: {0}")]
    UnknownStock(String),
    #[error("invalid quantity: {0}")]
    InvalidQuantity(u32),
    #[error("insufficient funds: cost {cost:.2}, available {available:.2}")]
    InsufficientFunds { cost: f64, available: f64 },
    #[error("insufficient holdings: requested {requested}, held {held}")]
    InsufficientHoldings { requested: u32, held: u32 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_json_shape() {
        let command: Command = serde_json::from_str(
            r#"{"type":"transaction","team_id":"panda","stock_id":"benco","action":"buy","quantity":3}"#,
        )
        .unwrap();
        assert_eq!(
            command,
            Command::Transaction {
                team_id: "panda".to_string(),
                stock_id: "benco".to_string(),
                action: Action::Buy,
                quantity: 3,
            }
        );

        let start: Command = serde_json::from_str(r#"{"type":"start","mode":"game"}"#).unwrap();
        assert_eq!(start, Command::Start { mode: Mode::Game });
    }

    #[test]
    fn test_update_round_trip() {
        let update = Update::Started { start_time: 1234 };
        let text = serde_json::to_string(&update).unwrap();
        assert_eq!(text, r#"{"type":"started","start_time":1234}"#);
        let back: Update = serde_json::from_str(&text).unwrap();
        assert_eq!(back, update);
    }

    #[test]
    fn test_error_messages_name_the_cause() {
        let err = TransactionError::InsufficientFunds {
            cost: 5000.0,
            available: 500.0,
        };
        assert_eq!(
            err.to_string(),
            "insufficient funds: cost 5000.00, available 500.00"
        );
    }
}

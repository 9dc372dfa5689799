//! Shared data model and wire API for an actibourse session.
//!
//! A session is a simulated stock market for a camp activity: teams hold
//! point balances and trade fictional stocks whose prices drift on a timer.
//! This crate holds the plain data types (stocks, teams, session state,
//! history), the configuration surface, and the JSON command/update protocol
//! spoken between the server and its browser observers. All mutation logic
//! lives in `actibourse-engine`.

pub mod api;
pub mod config;
pub mod history;
pub mod market;
pub mod session;

pub use api::{Action, Command, TransactionError, Update};
pub use config::{Config, PriceConfig, StockConfig, TeamConfig};
pub use history::{HistoryEntry, HistoryKind};
pub use market::{Stock, Team};
pub use session::{Mode, SessionState};

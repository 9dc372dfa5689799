//! The transaction processor: validated buy/sell execution and manual point
//! adjustments.
//!
//! Validation happens before any mutation, so a rejected command leaves the
//! state exactly as it was.

use actibourse_types::api::{Action, TransactionError};
use actibourse_types::history::HistoryKind;
use actibourse_types::session::SessionState;

use crate::round_cents;

/// Receipt for a successful transaction.
#[derive(Clone, Debug, PartialEq)]
pub struct Executed {
    pub team_id: String,
    pub stock_id: String,
    pub action: Action,
    pub quantity: u32,
    /// Points moved, at the price in effect when the order ran.
    pub total_cost: f64,
}

/// Execute a buy or sell order against a team's balance and portfolio.
///
/// Validation order: team exists, stock exists, quantity is positive, then
/// funds (buy) or holdings (sell) suffice. The cost is the current price
/// times quantity, rounded to cents; balances stay cents-quantized so an
/// immediate opposite order at the same price restores them exactly.
pub fn execute(
    state: &mut SessionState,
    team_id: &str,
    stock_id: &str,
    action: Action,
    quantity: u32,
    now: u64,
) -> Result<Executed, TransactionError> {
    let team = state
        .teams
        .get_mut(team_id)
        .ok_or_else(|| TransactionError::UnknownTeam(team_id.to_string()))?;
    let stock = state
        .stocks
        .get(stock_id)
        .ok_or_else(|| TransactionError::UnknownStock(stock_id.to_string()))?;
    if quantity == 0 {
        return Err(TransactionError::InvalidQuantity(quantity));
    }

    let total_cost = round_cents(stock.price * f64::from(quantity));
    let (message, kind) = match action {
        Action::Buy => {
            if team.points < total_cost {
                return Err(TransactionError::InsufficientFunds {
                    cost: total_cost,
                    available: team.points,
                });
            }
            team.points = round_cents(team.points - total_cost);
            *team.portfolio.entry(stock_id.to_string()).or_insert(0) += quantity;
            *state.investments.entry(stock_id.to_string()).or_insert(0) += quantity;
            (
                format!(
                    "{} bought {} {} for {:.2} pts",
                    team.name, quantity, stock.name, total_cost
                ),
                HistoryKind::Buy,
            )
        }
        Action::Sell => {
            let held = team.portfolio.get(stock_id).copied().unwrap_or(0);
            if held < quantity {
                return Err(TransactionError::InsufficientHoldings {
                    requested: quantity,
                    held,
                });
            }
            team.points = round_cents(team.points + total_cost);
            *team.portfolio.entry(stock_id.to_string()).or_insert(0) -= quantity;
            let invested = state.investments.entry(stock_id.to_string()).or_insert(0);
            *invested = invested.saturating_sub(quantity);
            (
                format!(
                    "{} sold {} {} for {:.2} pts",
                    team.name, quantity, stock.name, total_cost
                ),
                HistoryKind::Sell,
            )
        }
    };
    state.record(now, message, kind);

    Ok(Executed {
        team_id: team_id.to_string(),
        stock_id: stock_id.to_string(),
        action,
        quantity,
        total_cost,
    })
}

/// Apply a manual point correction, flooring the balance at zero.
pub fn adjust_points(
    state: &mut SessionState,
    team_id: &str,
    delta: i64,
    now: u64,
) -> Result<f64, TransactionError> {
    let team = state
        .teams
        .get_mut(team_id)
        .ok_or_else(|| TransactionError::UnknownTeam(team_id.to_string()))?;
    team.points = (team.points + delta as f64).max(0.0);
    let points = team.points;
    let sign = if delta > 0 { "+" } else { "" };
    let message = format!("{}: {}{} points", team.name, sign, delta);
    state.record(now, message, HistoryKind::System);
    Ok(points)
}

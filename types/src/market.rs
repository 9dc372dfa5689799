use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::{StockConfig, TeamConfig};

/// Number of recent prices retained per stock for the observer boards.
pub const PRICE_HISTORY_LIMIT: usize = 100;

/// A tradable stock.
///
/// `initial_price` is fixed at creation and anchors the clamp bounds of the
/// price engine; everything else is derived bookkeeping updated on each tick.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Stock {
    pub id: String,
    pub name: String,
    pub initial_price: f64,
    pub price: f64,
    pub previous_price: f64,
    pub change: f64,
    pub change_percent: f64,
    /// Recent price series, seeded with the initial price.
    pub history: Vec<f64>,
}

impl Stock {
    pub fn new(config: &StockConfig) -> Self {
        Self {
            id: config.id.clone(),
            name: config.name.clone(),
            initial_price: config.initial_price,
            price: config.initial_price,
            previous_price: config.initial_price,
            change: 0.0,
            change_percent: 0.0,
            history: vec![config.initial_price],
        }
    }

    /// Record a freshly computed price, rolling the change bookkeeping and
    /// the price series forward.
    pub fn record_price(&mut self, new_price: f64) {
        self.previous_price = self.price;
        self.price = new_price;
        self.change = self.price - self.previous_price;
        self.change_percent = if self.previous_price == 0.0 {
            0.0
        } else {
            self.change / self.previous_price * 100.0
        };
        self.history.push(new_price);
        if self.history.len() > PRICE_HISTORY_LIMIT {
            let excess = self.history.len() - PRICE_HISTORY_LIMIT;
            self.history.drain(..excess);
        }
    }
}

/// A participating team: a point balance plus a portfolio of stock holdings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub id: String,
    pub name: String,
    pub emoji: String,
    pub color: String,
    pub points: f64,
    /// Stock id to quantity owned. Seeded with zero for every known stock.
    pub portfolio: BTreeMap<String, u32>,
}

impl Team {
    pub fn new(config: &TeamConfig, initial_points: f64, stocks: &[StockConfig]) -> Self {
        Self {
            id: config.id.clone(),
            name: config.name.clone(),
            emoji: config.emoji.clone(),
            color: config.color.clone(),
            points: initial_points,
            portfolio: stocks.iter().map(|s| (s.id.clone(), 0)).collect(),
        }
    }

    /// Points plus holdings valued at current prices. Display-only ranking
    /// metric; unknown holdings are ignored.
    pub fn total_value(&self, stocks: &BTreeMap<String, Stock>) -> f64 {
        let holdings: f64 = self
            .portfolio
            .iter()
            .filter_map(|(id, quantity)| {
                stocks.get(id).map(|stock| stock.price * f64::from(*quantity))
            })
            .sum();
        self.points + holdings
    }
}

//! The price engine: one pure function from current state and randomness to
//! the next price of each stock.
//!
//! The policy, per tick and per stock:
//! - a uniform noise draw in `±(random_span / 2)`
//! - minus a crowding penalty proportional to accumulated net buys (capped)
//! - plus a restoring term once the price has drifted far from its origin
//! - plus a recovery bias once the price has crashed below tiered floors
//!
//! The resulting price is clamped into `[initial * min_ratio, initial *
//! max_ratio]` and rounded to cents, so the engine can never fail and never
//! produces a degenerate zero price.

use actibourse_types::config::PriceConfig;
use actibourse_types::market::Stock;
use actibourse_types::session::SessionState;
use rand::Rng;

use crate::round_cents;

/// Crowding penalty from accumulated net buys across all teams.
fn investment_influence(invested: u32, config: &PriceConfig) -> f64 {
    (f64::from(invested) / config.influence_divisor).min(config.influence_cap)
}

/// Restoring term pulling a runaway price back toward its initial value.
fn mean_reversion(stock: &Stock, config: &PriceConfig) -> f64 {
    if stock.initial_price == 0.0 {
        return 0.0;
    }
    let deviation = stock.price / stock.initial_price - 1.0;
    if deviation.abs() > config.reversion_threshold {
        -deviation * config.reversion_strength
    } else {
        0.0
    }
}

/// Tiered upward bias once a stock has fallen far below its initial price.
fn crash_protection(stock: &Stock, config: &PriceConfig) -> f64 {
    if stock.price < stock.initial_price * config.severe_crash_ratio {
        config.severe_crash_bias
    } else if stock.price < stock.initial_price * config.mild_crash_ratio {
        config.mild_crash_bias
    } else {
        0.0
    }
}

/// Total relative variation applied on one tick.
pub fn variation(
    stock: &Stock,
    invested: u32,
    config: &PriceConfig,
    rng: &mut impl Rng,
) -> f64 {
    let noise = (rng.gen::<f64>() - 0.5) * config.random_span;
    noise - investment_influence(invested, config)
        + mean_reversion(stock, config)
        + crash_protection(stock, config)
}

/// Compute the next price of a stock, clamped and cents-rounded.
pub fn next_price(
    stock: &Stock,
    invested: u32,
    config: &PriceConfig,
    rng: &mut impl Rng,
) -> f64 {
    let raw = stock.price * (1.0 + variation(stock, invested, config, rng));
    let clamped = raw.clamp(
        stock.initial_price * config.min_ratio,
        stock.initial_price * config.max_ratio,
    );
    round_cents(clamped)
}

/// Advance every stock one tick, rolling the change bookkeeping forward.
pub fn update_all(state: &mut SessionState, config: &PriceConfig, rng: &mut impl Rng) {
    for (id, stock) in state.stocks.iter_mut() {
        let invested = state.investments.get(id).copied().unwrap_or(0);
        let next = next_price(stock, invested, config, rng);
        stock.record_price(next);
    }
}

use serde::{Deserialize, Serialize};

/// Starting point balance for every team.
pub const DEFAULT_INITIAL_POINTS: f64 = 500.0;

/// Price-update cadence in test mode (fast, for demos and rehearsal).
pub const DEFAULT_TEST_UPDATE_INTERVAL_MS: u64 = 10_000;

/// Shortest delay between price updates in game mode (5 minutes).
pub const DEFAULT_GAME_MIN_INTERVAL_MS: u64 = 300_000;

/// Longest delay between price updates in game mode (90 minutes).
pub const DEFAULT_GAME_MAX_INTERVAL_MS: u64 = 5_400_000;

/// Divisor turning accumulated buy quantity into a price penalty.
pub const DEFAULT_INFLUENCE_DIVISOR: f64 = 100.0;

/// Ceiling on the investment penalty per update.
pub const DEFAULT_INFLUENCE_CAP: f64 = 0.15;

/// Width of the uniform noise term (0.4 means a draw in ±20%).
pub const DEFAULT_RANDOM_SPAN: f64 = 0.4;

/// Lower price clamp as a fraction of the initial price.
pub const DEFAULT_MIN_RATIO: f64 = 0.2;

/// Upper price clamp as a multiple of the initial price.
pub const DEFAULT_MAX_RATIO: f64 = 4.0;

/// Relative deviation from the initial price before mean reversion kicks in.
pub const DEFAULT_REVERSION_THRESHOLD: f64 = 0.5;

/// Fraction of the deviation pulled back per update once reversion is active.
pub const DEFAULT_REVERSION_STRENGTH: f64 = 0.1;

/// Below this fraction of the initial price the strong recovery bias applies.
pub const DEFAULT_SEVERE_CRASH_RATIO: f64 = 0.3;

/// Upward bias applied to severely crashed stocks.
pub const DEFAULT_SEVERE_CRASH_BIAS: f64 = 0.15;

/// Below this fraction of the initial price the mild recovery bias applies.
pub const DEFAULT_MILD_CRASH_RATIO: f64 = 0.5;

/// Upward bias applied to mildly crashed stocks.
pub const DEFAULT_MILD_CRASH_BIAS: f64 = 0.05;

/// A team definition: identity plus the display metadata the boards use.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamConfig {
    pub id: String,
    pub name: String,
    pub emoji: String,
    pub color: String,
}

/// A stock definition. The initial price is fixed for the whole session and
/// anchors the clamp bounds of the price engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StockConfig {
    pub id: String,
    pub name: String,
    pub initial_price: f64,
}

/// Constants of the price model. All values are positive; the ratio pair must
/// satisfy `min_ratio <= max_ratio` and the interval pair `min <= max`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriceConfig {
    pub influence_divisor: f64,
    pub influence_cap: f64,
    pub random_span: f64,
    pub min_ratio: f64,
    pub max_ratio: f64,
    pub reversion_threshold: f64,
    pub reversion_strength: f64,
    pub severe_crash_ratio: f64,
    pub severe_crash_bias: f64,
    pub mild_crash_ratio: f64,
    pub mild_crash_bias: f64,
}

impl Default for PriceConfig {
    fn default() -> Self {
        Self {
            influence_divisor: DEFAULT_INFLUENCE_DIVISOR,
            influence_cap: DEFAULT_INFLUENCE_CAP,
            random_span: DEFAULT_RANDOM_SPAN,
            min_ratio: DEFAULT_MIN_RATIO,
            max_ratio: DEFAULT_MAX_RATIO,
            reversion_threshold: DEFAULT_REVERSION_THRESHOLD,
            reversion_strength: DEFAULT_REVERSION_STRENGTH,
            severe_crash_ratio: DEFAULT_SEVERE_CRASH_RATIO,
            severe_crash_bias: DEFAULT_SEVERE_CRASH_BIAS,
            mild_crash_ratio: DEFAULT_MILD_CRASH_RATIO,
            mild_crash_bias: DEFAULT_MILD_CRASH_BIAS,
        }
    }
}

/// Full configuration surface of a session.
///
/// Every field has a default covering the standard activity, so a server can
/// run with no configuration file at all and partial files only override the
/// fields they name.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub initial_points: f64,
    pub test_update_interval_ms: u64,
    pub game_min_interval_ms: u64,
    pub game_max_interval_ms: u64,
    pub teams: Vec<TeamConfig>,
    pub stocks: Vec<StockConfig>,
    pub price: PriceConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            initial_points: DEFAULT_INITIAL_POINTS,
            test_update_interval_ms: DEFAULT_TEST_UPDATE_INTERVAL_MS,
            game_min_interval_ms: DEFAULT_GAME_MIN_INTERVAL_MS,
            game_max_interval_ms: DEFAULT_GAME_MAX_INTERVAL_MS,
            teams: default_teams(),
            stocks: default_stocks(),
            price: PriceConfig::default(),
        }
    }
}

fn team(id: &str, name: &str, emoji: &str, color: &str) -> TeamConfig {
    TeamConfig {
        id: id.to_string(),
        name: name.to_string(),
        emoji: emoji.to_string(),
        color: color.to_string(),
    }
}

fn stock(id: &str, name: &str, initial_price: f64) -> StockConfig {
    StockConfig {
        id: id.to_string(),
        name: name.to_string(),
        initial_price,
    }
}

/// The five standard teams of the activity.
pub fn default_teams() -> Vec<TeamConfig> {
    vec![
        team("alouettes", "Alouettes", "🦅", "#3498db"),
        team("canard", "Canard", "🦆", "#f39c12"),
        team("panda", "Panda", "🐼", "#2ecc71"),
        team("panthere", "Panthère", "🐆", "#9b59b6"),
        team("phaco", "Phaco", "🦏", "#e74c3c"),
    ]
}

/// The eight standard stocks, all opening at 50 points.
pub fn default_stocks() -> Vec<StockConfig> {
    vec![
        stock("montblanc", "Mont Blanc", 50.0),
        stock("monster", "Monster", 50.0),
        stock("benco", "Benco", 50.0),
        stock("opinel", "Opinel", 50.0),
        stock("quechua", "Quechua", 50.0),
        stock("redbull", "Red Bull", 50.0),
        stock("patagonia", "Patagonia", 50.0),
        stock("salomon", "Salomon", 50.0),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_cover_standard_activity() {
        let config = Config::default();
        assert_eq!(config.initial_points, 500.0);
        assert_eq!(config.test_update_interval_ms, 10_000);
        assert_eq!(config.game_min_interval_ms, 300_000);
        assert_eq!(config.game_max_interval_ms, 5_400_000);
        assert_eq!(config.teams.len(), 5);
        assert_eq!(config.stocks.len(), 8);
        assert!(config.stocks.iter().all(|s| s.initial_price == 50.0));
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config: Config = serde_yaml::from_str(
            "initial_points: 100.0\n\
             test_update_interval_ms: 2000\n",
        )
        .unwrap();
        assert_eq!(config.initial_points, 100.0);
        assert_eq!(config.test_update_interval_ms, 2_000);
        // Untouched fields fall back to the standard activity.
        assert_eq!(config.game_max_interval_ms, 5_400_000);
        assert_eq!(config.teams.len(), 5);
        assert_eq!(config.price, PriceConfig::default());
    }

    #[test]
    fn test_price_overrides_merge() {
        let config: Config = serde_yaml::from_str(
            "price:\n  influence_cap: 0.3\n",
        )
        .unwrap();
        assert_eq!(config.price.influence_cap, 0.3);
        assert_eq!(config.price.influence_divisor, DEFAULT_INFLUENCE_DIVISOR);
    }
}

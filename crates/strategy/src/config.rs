use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use common::{ConfigurationError, Result};

/// Top-level bot config file (TOML).
///
/// Example `config/strategies.toml`:
/// ```toml
/// [[bot]]
/// id = "btc-rsi"
/// symbol = "BTC/USDT"
/// timeframe = "1h"
/// strategy = "rsi"
///
/// [bot.settings]
/// quantity = 0.001
/// periods = 14
/// low = 30.0
/// high = 70.0
/// persistence = 2
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StrategyFileConfig {
    #[serde(rename = "bot")]
    pub bots: Vec<BotConfig>,
}

impl StrategyFileConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: Self = toml::from_str(content)?;
        let mut seen = HashSet::new();
        for bot in &file.bots {
            if !seen.insert(bot.id.as_str()) {
                return Err(ConfigurationError::new(&bot.id, "id", "duplicate bot id").into());
            }
        }
        Ok(file)
    }

    /// Distinct symbols watched by the configured bots, in file order.
    pub fn symbols(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.bots
            .iter()
            .filter(|b| seen.insert(b.symbol.as_str()))
            .map(|b| b.symbol.clone())
            .collect()
    }
}

/// Strategy variant identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    Rsi,
    Cbbc,
}

/// One bot instance as written in the config file.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BotConfig {
    pub id: String,
    /// Trading pair, e.g. "BTC/USDT".
    pub symbol: String,
    #[serde(default = "default_timeframe")]
    pub timeframe: String,
    pub strategy: StrategyKind,
    /// Strategy-specific settings, decoded by [`BotConfig::settings`].
    #[serde(default)]
    pub settings: toml::Table,
}

fn default_timeframe() -> String {
    "1h".to_string()
}

impl BotConfig {
    /// Decode and validate the settings table for this bot's strategy.
    pub fn settings(&self) -> Result<StrategySettings, ConfigurationError> {
        let table = toml::Value::Table(self.settings.clone());
        let decode_err = |e: toml::de::Error| ConfigurationError::new(&self.id, "settings", e.message());
        let settings = match self.strategy {
            StrategyKind::Rsi => StrategySettings::Rsi(table.try_into().map_err(decode_err)?),
            StrategyKind::Cbbc => StrategySettings::Cbbc(table.try_into().map_err(decode_err)?),
        };
        settings.validate(&self.id)?;
        Ok(settings)
    }
}

/// Typed settings for each strategy variant. Immutable for a bot run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", content = "settings", rename_all = "lowercase")]
pub enum StrategySettings {
    Rsi(RsiSettings),
    Cbbc(CbbcSettings),
}

impl StrategySettings {
    pub fn validate(&self, bot: &str) -> Result<(), ConfigurationError> {
        match self {
            StrategySettings::Rsi(s) => s.validate(bot),
            StrategySettings::Cbbc(s) => s.validate(bot),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RsiSettings {
    /// Quantity to buy/sell.
    pub quantity: f64,
    /// RSI period.
    #[serde(default = "default_periods")]
    pub periods: usize,
    /// Buy when RSI is below this value.
    #[serde(default = "default_low")]
    pub low: f64,
    /// Sell when RSI is above this value.
    #[serde(default = "default_high")]
    pub high: f64,
    /// Candles to persist in a trend before buying/selling.
    #[serde(default = "default_persistence")]
    pub persistence: u32,
}

impl RsiSettings {
    pub fn new(quantity: f64) -> Self {
        Self {
            quantity,
            periods: default_periods(),
            low: default_low(),
            high: default_high(),
            persistence: default_persistence(),
        }
    }

    pub fn validate(&self, bot: &str) -> Result<(), ConfigurationError> {
        check_quantity(bot, self.quantity)?;
        if self.periods == 0 {
            return Err(ConfigurationError::new(bot, "periods", "must be > 0"));
        }
        if self.persistence == 0 {
            return Err(ConfigurationError::new(bot, "persistence", "must be > 0"));
        }
        check_percent(bot, "low", self.low)?;
        check_percent(bot, "high", self.high)?;
        if self.low > self.high {
            return Err(ConfigurationError::new(
                bot,
                "low",
                format!("{} is above high ({})", self.low, self.high),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CbbcSettings {
    /// Entry order quantity.
    pub quantity: f64,
    /// Take profit percentage.
    #[serde(default = "default_tp_percent", alias = "tpPercent", alias = "takeProfit")]
    pub tp_percent: f64,
    /// Number of consecutive candles for the run detector.
    #[serde(
        default = "default_consecutive_candles",
        alias = "consecutiveCandles",
        alias = "cbbcConsecutiveCandles"
    )]
    pub consecutive_candles: usize,
}

impl CbbcSettings {
    pub fn new(quantity: f64) -> Self {
        Self {
            quantity,
            tp_percent: default_tp_percent(),
            consecutive_candles: default_consecutive_candles(),
        }
    }

    /// Take profit as a fraction of the entry price.
    pub fn take_profit_fraction(&self) -> f64 {
        self.tp_percent / 100.0
    }

    pub fn validate(&self, bot: &str) -> Result<(), ConfigurationError> {
        check_quantity(bot, self.quantity)?;
        if !self.tp_percent.is_finite() {
            return Err(ConfigurationError::new(bot, "tp_percent", "must be a finite number"));
        }
        if self.consecutive_candles == 0 {
            return Err(ConfigurationError::new(bot, "consecutive_candles", "must be > 0"));
        }
        Ok(())
    }
}

fn check_quantity(bot: &str, quantity: f64) -> Result<(), ConfigurationError> {
    if quantity.is_finite() && quantity > 0.0 {
        Ok(())
    } else {
        Err(ConfigurationError::new(bot, "quantity", format!("must be > 0, got {quantity}")))
    }
}

fn check_percent(bot: &str, field: &'static str, value: f64) -> Result<(), ConfigurationError> {
    if (0.0..=100.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigurationError::new(bot, field, format!("must be within 0-100, got {value}")))
    }
}

fn default_periods() -> usize {
    14
}

fn default_low() -> f64 {
    30.0
}

fn default_high() -> f64 {
    70.0
}

fn default_persistence() -> u32 {
    1
}

fn default_tp_percent() -> f64 {
    2.0
}

fn default_consecutive_candles() -> usize {
    3
}

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::{Error, Result};

/// Host configuration loaded from environment variables at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Bot definitions (TOML).
    pub strategy_config_path: PathBuf,
    /// Candle file replayed through the bots (JSON array).
    pub candles_path: PathBuf,
    /// Symbol the candle file belongs to. Defaults to the first bot's symbol.
    pub candles_symbol: Option<String>,
    /// Per-symbol candle window kept by the engine.
    pub history_limit: usize,
    /// Delay between replayed candles; unset replays as fast as possible.
    pub replay_pace: Option<Duration>,

    // Paper host
    pub paper_balance_usd: f64,
    pub paper_slippage_bps: f64,
}

impl Config {
    /// Load all configuration from environment variables.
    /// Loads `.env` if present.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv(); // ignore error if .env not present

        Ok(Config {
            strategy_config_path: optional_env("STRATEGY_CONFIG_PATH")
                .unwrap_or_else(|| "config/strategies.toml".to_string())
                .into(),
            candles_path: required_env("CANDLES_PATH")?.into(),
            candles_symbol: optional_env("CANDLES_SYMBOL"),
            history_limit: parsed_env("HISTORY_LIMIT", 500)?,
            replay_pace: match parsed_env("REPLAY_PACE_MS", 0u64)? {
                0 => None,
                ms => Some(Duration::from_millis(ms)),
            },
            paper_balance_usd: parsed_env("PAPER_BALANCE_USD", 10_000.0)?,
            paper_slippage_bps: parsed_env("PAPER_SLIPPAGE_BPS", 10.0)?,
        })
    }
}

fn required_env(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| {
        Error::Config(format!(
            "required environment variable '{key}' is not set. Check your .env file."
        ))
    })
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

fn parsed_env<T: FromStr>(key: &str, default: T) -> Result<T> {
    match optional_env(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| Error::Config(format!("{key} has an unparseable value: '{raw}'"))),
        None => Ok(default),
    }
}

use std::path::Path;
use std::time::Duration;

use tracing::{info, warn};

use common::{Candle, MarketEvent, Result};

use crate::lifecycle::EngineHandle;

/// Replays a recorded candle series for one symbol into the engine.
///
/// Stands in for a live kline stream: each candle is published as a closed
/// candle, oldest first, optionally paced.
pub struct CandleFeed {
    symbol: String,
    candles: Vec<Candle>,
    pace: Option<Duration>,
}

impl CandleFeed {
    pub fn new(symbol: impl Into<String>, mut candles: Vec<Candle>) -> Self {
        candles.sort_by_key(|c| c.timestamp);
        Self {
            symbol: symbol.into(),
            candles,
            pace: None,
        }
    }

    /// Load a JSON array of candles.
    pub fn from_json_file(symbol: impl Into<String>, path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let candles: Vec<Candle> = serde_json::from_str(&content)?;
        Ok(Self::new(symbol, candles))
    }

    /// Sleep between candles.
    pub fn with_pace(mut self, pace: Duration) -> Self {
        self.pace = Some(pace);
        self
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    /// Publish every candle. Returns how many were delivered.
    pub async fn run(self, engine: EngineHandle) -> usize {
        info!(symbol = %self.symbol, candles = self.candles.len(), "Replaying candles");
        let mut sent = 0;
        for candle in self.candles {
            let event = MarketEvent {
                symbol: self.symbol.clone(),
                candle,
            };
            if !engine.publish(event).await {
                warn!(symbol = %self.symbol, sent, "Engine stopped, replay cut short");
                break;
            }
            sent += 1;
            if let Some(pace) = self.pace {
                tokio::time::sleep(pace).await;
            }
        }
        info!(symbol = %self.symbol, sent, "Replay finished");
        sent
    }
}

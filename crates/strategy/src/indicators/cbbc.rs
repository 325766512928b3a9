use serde::{Deserialize, Serialize};

use common::Candle;

/// Consecutive-Bullish-Bearish-Candles classification of the latest run.
///
/// The flags are mutually exclusive by construction. Both false means the
/// window was mixed, contained a doji, or there was not enough history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RunClassification {
    pub bullish: bool,
    pub bearish: bool,
}

impl RunClassification {
    pub fn is_neutral(&self) -> bool {
        !self.bullish && !self.bearish
    }
}

/// Classify the last `n` candles. Fewer than `n` candles, or `n == 0`, is neutral.
pub fn consecutive_candles(candles: &[Candle], n: usize) -> RunClassification {
    if n == 0 || candles.len() < n {
        return RunClassification::default();
    }

    let window = &candles[candles.len() - n..];
    RunClassification {
        bullish: window.iter().all(Candle::is_bullish),
        bearish: window.iter().all(Candle::is_bearish),
    }
}

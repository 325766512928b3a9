pub mod cbbc;
pub mod rsi;

pub use cbbc::{consecutive_candles, RunClassification};
pub use rsi::RsiIndicator;

use common::Candle;

/// Derived signals the strategy core reads on each tick.
///
/// Hosts may plug in their own source of indicator values; the controller
/// only ever goes through this trait.
pub trait IndicatorProvider: Send + Sync {
    /// Latest RSI over `candles`, or `None` while the indicator is warming up.
    fn rsi(&self, candles: &[Candle], periods: usize) -> Option<f64>;

    /// Consecutive-candle classification of the last `n` candles.
    fn consecutive_candles(&self, candles: &[Candle], n: usize) -> RunClassification;
}

/// Indicators computed locally from the supplied history.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardIndicators;

impl IndicatorProvider for StandardIndicators {
    fn rsi(&self, candles: &[Candle], periods: usize) -> Option<f64> {
        RsiIndicator::new(periods).compute_candles(candles)
    }

    fn consecutive_candles(&self, candles: &[Candle], n: usize) -> RunClassification {
        consecutive_candles(candles, n)
    }
}

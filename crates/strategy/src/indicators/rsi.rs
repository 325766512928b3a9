use common::Candle;

/// RSI (Relative Strength Index) over candle closes.
///
/// Uses Wilder's smoothed moving average (same as TradingView / standard RSI).
/// Returns `None` until at least `period + 1` closes are available.
#[derive(Debug, Clone, Copy)]
pub struct RsiIndicator {
    pub period: usize,
}

impl RsiIndicator {
    pub fn new(period: usize) -> Self {
        Self { period }
    }

    /// Candles needed before `compute` yields a value.
    pub fn warm_up(&self) -> usize {
        self.period + 1
    }

    pub fn compute_candles(&self, candles: &[Candle]) -> Option<f64> {
        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        self.compute(&closes)
    }

    /// Compute RSI from a slice of close prices (oldest first).
    pub fn compute(&self, closes: &[f64]) -> Option<f64> {
        if self.period == 0 || closes.len() < self.warm_up() {
            return None;
        }

        let changes: Vec<f64> = closes.windows(2).map(|w| w[1] - w[0]).collect();
        let initial = &changes[..self.period];
        let period = self.period as f64;

        let mut avg_gain = initial.iter().filter(|&&c| c > 0.0).sum::<f64>() / period;
        let mut avg_loss = initial.iter().filter(|&&c| c < 0.0).map(|c| c.abs()).sum::<f64>() / period;

        // Wilder smoothing over remaining changes
        for &change in &changes[self.period..] {
            let gain = change.max(0.0);
            let loss = (-change).max(0.0);
            avg_gain = (avg_gain * (period - 1.0) + gain) / period;
            avg_loss = (avg_loss * (period - 1.0) + loss) / period;
        }

        if avg_loss == 0.0 {
            return Some(100.0);
        }

        let rs = avg_gain / avg_loss;
        Some(100.0 - 100.0 / (1.0 + rs))
    }
}

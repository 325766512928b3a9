use std::collections::HashMap;

use common::Candle;

/// Per-symbol rolling window of closed candles, oldest first.
#[derive(Debug, Clone)]
pub struct CandleHistory {
    limit: usize,
    by_symbol: HashMap<String, Vec<Candle>>,
}

impl CandleHistory {
    pub const DEFAULT_LIMIT: usize = 500;

    pub fn new(limit: usize) -> Self {
        Self {
            limit: limit.max(1),
            by_symbol: HashMap::new(),
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Append a closed candle and return the updated window.
    pub fn push(&mut self, symbol: &str, candle: Candle) -> &[Candle] {
        let window = self.by_symbol.entry(symbol.to_string()).or_default();
        window.push(candle);
        if window.len() > self.limit {
            let excess = window.len() - self.limit;
            window.drain(..excess);
        }
        window
    }

    /// Current window for a symbol; empty if nothing has closed yet.
    pub fn get(&self, symbol: &str) -> &[Candle] {
        self.by_symbol.get(symbol).map(Vec::as_slice).unwrap_or(&[])
    }
}

impl Default for CandleHistory {
    fn default() -> Self {
        Self::new(Self::DEFAULT_LIMIT)
    }
}

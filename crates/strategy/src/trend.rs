use serde::{Deserialize, Serialize};
use tracing::debug;

/// Which side of the thresholds the oscillator is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    #[default]
    None,
    High,
    Low,
}

/// Trend bookkeeping carried between ticks for one bot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TrendState {
    pub direction: TrendDirection,
    /// Consecutive ticks spent in `direction`.
    pub duration: u32,
    /// `duration` has reached the configured persistence.
    pub persisted: bool,
    /// The action for this trend run has already been signalled.
    pub advised: bool,
}

impl TrendState {
    fn reset(direction: TrendDirection) -> Self {
        Self {
            direction,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendAction {
    None,
    /// Persisted above `high`.
    EnterHigh,
    /// Persisted below `low`.
    EnterLow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrendReading {
    /// Classification of this tick's value, not the stored direction.
    pub direction: TrendDirection,
    pub action: TrendAction,
}

/// Turns per-tick oscillator readings into at most one action per trend run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendTracker {
    pub low: f64,
    pub high: f64,
    /// Ticks a trend must last before it is acted on.
    pub persistence: u32,
}

impl TrendTracker {
    pub fn new(low: f64, high: f64, persistence: u32) -> Self {
        Self { low, high, persistence }
    }

    pub fn classify(&self, value: f64) -> TrendDirection {
        if value > self.high {
            TrendDirection::High
        } else if value < self.low {
            TrendDirection::Low
        } else {
            TrendDirection::None
        }
    }

    /// Feed one reading, mutating the caller-owned `state`.
    ///
    /// A neutral reading leaves `state` untouched: the tracker stays parked on
    /// the last trend until the next high/low classification.
    pub fn advance(&self, state: &mut TrendState, value: f64) -> TrendReading {
        let direction = self.classify(value);
        if direction == TrendDirection::None {
            debug!(value, "No trend");
            return TrendReading {
                direction,
                action: TrendAction::None,
            };
        }

        if state.direction != direction {
            *state = TrendState::reset(direction);
        }

        state.duration = state.duration.saturating_add(1);
        debug!(value, ?direction, duration = state.duration, "In trend");

        if state.duration >= self.persistence {
            state.persisted = true;
        }

        let action = if state.persisted && !state.advised {
            state.advised = true;
            match direction {
                TrendDirection::High => TrendAction::EnterHigh,
                TrendDirection::Low => TrendAction::EnterLow,
                TrendDirection::None => TrendAction::None,
            }
        } else {
            TrendAction::None
        };

        TrendReading { direction, action }
    }
}

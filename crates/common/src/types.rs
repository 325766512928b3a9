use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One OHLC candle. Histories are ordered oldest first.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    /// Candle open time, serialized as epoch milliseconds.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

impl Candle {
    /// Close strictly above open.
    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    /// Close strictly below open.
    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }
}

/// A closed candle published for one symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketEvent {
    pub symbol: String,
    pub candle: Candle,
}

/// Side of a trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl std::fmt::Display for OrderSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "BUY"),
            OrderSide::Sell => write!(f, "SELL"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum OrderType {
    #[default]
    Market,
    Limit,
}

/// Extra DCA leg placed below the entry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SafetyOrder {
    pub quantity: f64,
    /// Distance from the entry price as a fraction, e.g. `0.01` = 1% below.
    pub price_deviation: f64,
}

/// An instruction the strategy core hands to the execution host.
///
/// Effects carry no identity; the host consumes each one at most once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Effect {
    PlaceEntryOrder {
        side: OrderSide,
        quantity: f64,
        order_type: OrderType,
    },
    PlaceDcaOrder {
        quantity: f64,
        /// Take profit as a fraction of the entry price (`0.02` = 2%).
        take_profit_fraction: f64,
        safety_orders: Vec<SafetyOrder>,
    },
    CancelActiveTrade,
}

/// An effect tagged with the bot that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectRequest {
    pub bot_id: String,
    pub symbol: String,
    pub effect: Effect,
}

/// Confirmation that an entry effect was filled by the host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fill {
    pub order_id: String,
    pub bot_id: String,
    pub symbol: String,
    pub side: OrderSide,
    pub fill_price: f64,
    pub quantity: f64,
    pub timestamp: DateTime<Utc>,
}

/// What caused a tick invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    CandleClosed,
    OrderFilled,
}

/// Signal the host passes to a bot on each invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BotSignal {
    Start,
    Stop,
    Tick(Trigger),
}

/// Scheduling triggers a strategy wants to be invoked on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RunPolicy {
    pub on_candle_closed: bool,
    pub on_order_filled: bool,
}

impl RunPolicy {
    pub fn accepts(&self, trigger: Trigger) -> bool {
        match trigger {
            Trigger::CandleClosed => self.on_candle_closed,
            Trigger::OrderFilled => self.on_order_filled,
        }
    }
}

/// Lifecycle phase of a single bot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LifecyclePhase {
    #[default]
    Stopped,
    Starting,
    Running,
    Stopping,
}

impl std::fmt::Display for LifecyclePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LifecyclePhase::Stopped => write!(f, "stopped"),
            LifecyclePhase::Starting => write!(f, "starting"),
            LifecyclePhase::Running => write!(f, "running"),
            LifecyclePhase::Stopping => write!(f, "stopping"),
        }
    }
}

/// Commands sent to the engine via the command channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCommand {
    /// Start every registered bot.
    Start,
    /// Stop every registered bot.
    Stop,
    StartBot(String),
    StopBot(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candle(open: f64, close: f64) -> Candle {
        Candle {
            open,
            high: open.max(close),
            low: open.min(close),
            close,
            timestamp: DateTime::<Utc>::UNIX_EPOCH,
        }
    }

    #[test]
    fn doji_is_neither_bullish_nor_bearish() {
        let c = candle(10.0, 10.0);
        assert!(!c.is_bullish());
        assert!(!c.is_bearish());
    }

    #[test]
    fn candle_timestamp_reads_epoch_millis() {
        let json = r#"{"open":1.0,"high":2.0,"low":0.5,"close":1.5,"timestamp":1700000000000}"#;
        let c: Candle = serde_json::from_str(json).unwrap();
        assert_eq!(c.timestamp.timestamp_millis(), 1_700_000_000_000);
        assert!(c.is_bullish());
    }

    #[test]
    fn run_policy_accepts_only_declared_triggers() {
        let policy = RunPolicy {
            on_candle_closed: true,
            on_order_filled: false,
        };
        assert!(policy.accepts(Trigger::CandleClosed));
        assert!(!policy.accepts(Trigger::OrderFilled));
    }
}

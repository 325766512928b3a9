pub mod config;
pub mod controller;
pub mod indicators;
pub mod registry;
pub mod state;
pub mod strategies;
pub mod trend;

pub use config::{BotConfig, CbbcSettings, RsiSettings, StrategyFileConfig, StrategyKind, StrategySettings};
pub use controller::{BotIdentity, StrategyController};
pub use indicators::{IndicatorProvider, RunClassification, StandardIndicators};
pub use registry::StrategyRegistry;
pub use state::BotState;
pub use trend::{TrendAction, TrendDirection, TrendReading, TrendState, TrendTracker};

use common::{Candle, Effect, RunPolicy};

/// What a strategy sees on an evaluated tick.
pub struct TickContext<'a> {
    pub bot: &'a BotIdentity,
    /// History for the bot's symbol, oldest first. Never shorter than
    /// [`Strategy::required_history`].
    pub candles: &'a [Candle],
    pub indicators: &'a dyn IndicatorProvider,
}

/// All strategy variants must satisfy this trait.
///
/// The metadata methods are read by the host without invoking the bot; only
/// `evaluate` runs per tick.
pub trait Strategy: Send + Sync {
    fn display_name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    /// Minimum candle history before a tick is evaluated.
    fn required_history(&self) -> usize;

    /// Scheduling triggers this strategy wants ticks for.
    fn run_policy(&self) -> RunPolicy;

    /// Symbol whose candles the host should stream to this bot.
    fn watch_candles<'a>(&self, bot: &'a BotIdentity) -> &'a str {
        &bot.symbol
    }

    /// Candle timeframe the host should aggregate for this bot.
    fn timeframe<'a>(&self, bot: &'a BotIdentity) -> &'a str {
        &bot.timeframe
    }

    fn settings(&self) -> StrategySettings;

    /// Evaluate one tick. Returns at most one effect.
    fn evaluate(&self, ctx: &TickContext<'_>, state: &mut BotState) -> Option<Effect>;
}

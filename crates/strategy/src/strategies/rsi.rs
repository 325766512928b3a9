use tracing::{debug, info};

use common::{Effect, OrderSide, OrderType, RunPolicy};

use crate::config::{RsiSettings, StrategySettings};
use crate::state::BotState;
use crate::trend::{TrendAction, TrendTracker};
use crate::{Strategy, TickContext};

/// Buy and sell on RSI extremes once they have persisted.
///
/// Sells when RSI stays above `high` for `persistence` candles and buys when
/// it stays below `low`. One order per trend run.
#[derive(Debug, Clone)]
pub struct RsiStrategy {
    settings: RsiSettings,
    tracker: TrendTracker,
}

impl RsiStrategy {
    pub fn new(settings: RsiSettings) -> Self {
        let tracker = TrendTracker::new(settings.low, settings.high, settings.persistence);
        Self { settings, tracker }
    }

    fn market_order(&self, side: OrderSide) -> Effect {
        Effect::PlaceEntryOrder {
            side,
            quantity: self.settings.quantity,
            order_type: OrderType::Market,
        }
    }
}

impl Strategy for RsiStrategy {
    fn display_name(&self) -> &'static str {
        "RSI Strategy"
    }

    fn description(&self) -> &'static str {
        "Buys when RSI stays below the low threshold and sells when it stays above the high threshold."
    }

    fn required_history(&self) -> usize {
        self.settings.periods + 1
    }

    fn run_policy(&self) -> RunPolicy {
        RunPolicy {
            on_candle_closed: true,
            on_order_filled: false,
        }
    }

    fn settings(&self) -> StrategySettings {
        StrategySettings::Rsi(self.settings.clone())
    }

    fn evaluate(&self, ctx: &TickContext<'_>, state: &mut BotState) -> Option<Effect> {
        let Some(rsi) = ctx.indicators.rsi(ctx.candles, self.settings.periods) else {
            debug!(bot = %ctx.bot.id, "RSI still warming up");
            return None;
        };
        debug!(bot = %ctx.bot.id, rsi, "RSI value");

        let reading = self.tracker.advance(state.trend_mut(), rsi);
        match reading.action {
            TrendAction::EnterHigh => {
                info!(bot = %ctx.bot.id, rsi, "Advised to SELL");
                Some(self.market_order(OrderSide::Sell))
            }
            TrendAction::EnterLow => {
                info!(bot = %ctx.bot.id, rsi, "Advised to BUY");
                Some(self.market_order(OrderSide::Buy))
            }
            TrendAction::None => None,
        }
    }
}

use tracing::{debug, info};

use common::{Effect, RunPolicy};

use crate::config::{CbbcSettings, StrategySettings};
use crate::state::BotState;
use crate::{Strategy, TickContext};

/// Opens a DCA trade after N consecutive bearish candles.
///
/// Every tick that sees a bearish run emits a new order; there is no
/// per-run deduplication for this variant.
#[derive(Debug, Clone)]
pub struct CbbcStrategy {
    settings: CbbcSettings,
}

impl CbbcStrategy {
    pub fn new(settings: CbbcSettings) -> Self {
        Self { settings }
    }
}

impl Strategy for CbbcStrategy {
    fn display_name(&self) -> &'static str {
        "Consecutive-Bullish-Bearish"
    }

    fn description(&self) -> &'static str {
        "Detects sequences of N consecutive bearish candles and opens a DCA trade."
    }

    fn required_history(&self) -> usize {
        self.settings.consecutive_candles
    }

    fn run_policy(&self) -> RunPolicy {
        RunPolicy {
            on_candle_closed: true,
            on_order_filled: true,
        }
    }

    fn settings(&self) -> StrategySettings {
        StrategySettings::Cbbc(self.settings.clone())
    }

    fn evaluate(&self, ctx: &TickContext<'_>, _state: &mut BotState) -> Option<Effect> {
        let n = self.settings.consecutive_candles;

        let shown = ctx.candles.len().min(n.max(5));
        for candle in &ctx.candles[ctx.candles.len() - shown..] {
            debug!(
                bot = %ctx.bot.id,
                time = %candle.timestamp,
                open = candle.open,
                close = candle.close,
                bullish = candle.is_bullish(),
                bearish = candle.is_bearish(),
                "Candle"
            );
        }

        let run = ctx.indicators.consecutive_candles(ctx.candles, n);
        debug!(bot = %ctx.bot.id, bullish = run.bullish, bearish = run.bearish, "CBBC indicator");

        if !run.bearish {
            return None;
        }

        info!(
            bot = %ctx.bot.id,
            symbol = %ctx.bot.symbol,
            qty = self.settings.quantity,
            tp_percent = self.settings.tp_percent,
            "Entry condition met, placing DCA order"
        );
        Some(Effect::PlaceDcaOrder {
            quantity: self.settings.quantity,
            take_profit_fraction: self.settings.take_profit_fraction(),
            safety_orders: Vec::new(),
        })
    }
}

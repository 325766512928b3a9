use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use common::{BotSignal, Candle, ConfigurationError, Effect, LifecyclePhase, RunPolicy, Trigger};

use crate::config::{BotConfig, StrategySettings};
use crate::indicators::IndicatorProvider;
use crate::state::BotState;
use crate::{strategies, Strategy, TickContext};

/// Who a bot is and what it trades.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotIdentity {
    pub id: String,
    pub symbol: String,
    pub timeframe: String,
}

/// Per-invocation entry point for one bot.
///
/// Routes every host invocation to start, stop or tick handling and returns
/// the effects the host must carry out. The controller itself holds no
/// mutable state; everything that survives between invocations lives in the
/// [`BotState`] the host passes in.
pub struct StrategyController {
    bot: BotIdentity,
    strategy: Box<dyn Strategy>,
    indicators: Arc<dyn IndicatorProvider>,
}

impl StrategyController {
    /// Validate `settings` and build the controller. Validation errors are
    /// reported here, never mid-run.
    pub fn new(
        bot: BotIdentity,
        settings: StrategySettings,
        indicators: Arc<dyn IndicatorProvider>,
    ) -> Result<Self, ConfigurationError> {
        settings.validate(&bot.id)?;
        Ok(Self {
            strategy: strategies::build(settings),
            bot,
            indicators,
        })
    }

    pub fn from_config(
        cfg: &BotConfig,
        indicators: Arc<dyn IndicatorProvider>,
    ) -> Result<Self, ConfigurationError> {
        let bot = BotIdentity {
            id: cfg.id.clone(),
            symbol: cfg.symbol.clone(),
            timeframe: cfg.timeframe.clone(),
        };
        Self::new(bot, cfg.settings()?, indicators)
    }

    pub fn bot(&self) -> &BotIdentity {
        &self.bot
    }

    pub fn display_name(&self) -> &'static str {
        self.strategy.display_name()
    }

    pub fn description(&self) -> &'static str {
        self.strategy.description()
    }

    pub fn required_history(&self) -> usize {
        self.strategy.required_history()
    }

    pub fn run_policy(&self) -> RunPolicy {
        self.strategy.run_policy()
    }

    /// Symbol whose candles this bot must be fed.
    pub fn watched_symbol(&self) -> &str {
        self.strategy.watch_candles(&self.bot)
    }

    pub fn timeframe(&self) -> &str {
        self.strategy.timeframe(&self.bot)
    }

    /// Handle one host invocation.
    pub fn invoke(&self, signal: BotSignal, state: &mut BotState, candles: &[Candle]) -> Vec<Effect> {
        match signal {
            BotSignal::Start => {
                self.on_start(state);
                Vec::new()
            }
            BotSignal::Stop => vec![self.on_stop(state)],
            BotSignal::Tick(trigger) => self.on_tick(trigger, state, candles).into_iter().collect(),
        }
    }

    fn on_start(&self, state: &mut BotState) {
        if state.is_running() {
            info!(bot = %self.bot.id, "Bot already running");
            return;
        }
        state.phase = LifecyclePhase::Starting;
        info!(
            bot = %self.bot.id,
            symbol = %self.bot.symbol,
            timeframe = %self.timeframe(),
            strategy = self.display_name(),
            settings = ?self.strategy.settings(),
            required_history = self.required_history(),
            "Bot started"
        );
        state.phase = LifecyclePhase::Running;
    }

    fn on_stop(&self, state: &mut BotState) -> Effect {
        state.phase = LifecyclePhase::Stopping;
        info!(bot = %self.bot.id, symbol = %self.bot.symbol, "Bot stopped, cancelling active trade");
        state.phase = LifecyclePhase::Stopped;
        Effect::CancelActiveTrade
    }

    fn on_tick(&self, trigger: Trigger, state: &mut BotState, candles: &[Candle]) -> Option<Effect> {
        if !state.is_running() {
            debug!(bot = %self.bot.id, phase = %state.phase, "Tick ignored, bot not running");
            return None;
        }
        if !self.run_policy().accepts(trigger) {
            debug!(bot = %self.bot.id, ?trigger, "Tick ignored, trigger not in run policy");
            return None;
        }

        let required = self.required_history();
        if candles.len() < required {
            debug!(
                bot = %self.bot.id,
                history = candles.len(),
                required,
                "Not enough candle history, skipping tick"
            );
            return None;
        }

        if state.trend.is_none() {
            state.trend_mut();
            debug!(bot = %self.bot.id, "Trend state initialized");
        }

        let ctx = TickContext {
            bot: &self.bot,
            candles,
            indicators: self.indicators.as_ref(),
        };
        self.strategy.evaluate(&ctx, state)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use chrono::{DateTime, Utc};
    use common::OrderSide;

    use super::*;
    use crate::config::{CbbcSettings, RsiSettings};
    use crate::indicators::{RunClassification, StandardIndicators};
    use crate::trend::{TrendDirection, TrendState};

    /// Hands out queued RSI readings, then keeps repeating the last one.
    struct ScriptedRsi {
        readings: Mutex<VecDeque<f64>>,
    }

    impl ScriptedRsi {
        fn new(readings: &[f64]) -> Arc<Self> {
            Arc::new(Self {
                readings: Mutex::new(readings.iter().copied().collect()),
            })
        }
    }

    impl IndicatorProvider for ScriptedRsi {
        fn rsi(&self, _candles: &[Candle], _periods: usize) -> Option<f64> {
            let mut q = self.readings.lock().unwrap();
            if q.len() > 1 {
                q.pop_front()
            } else {
                q.front().copied()
            }
        }

        fn consecutive_candles(&self, _candles: &[Candle], _n: usize) -> RunClassification {
            RunClassification::default()
        }
    }

    fn identity() -> BotIdentity {
        BotIdentity {
            id: "bot-1".into(),
            symbol: "BTC/USDT".into(),
            timeframe: "1h".into(),
        }
    }

    fn candles(pairs: &[(f64, f64)]) -> Vec<Candle> {
        pairs
            .iter()
            .map(|&(open, close)| Candle {
                open,
                high: open.max(close),
                low: open.min(close),
                close,
                timestamp: DateTime::<Utc>::UNIX_EPOCH,
            })
            .collect()
    }

    fn flat(n: usize) -> Vec<Candle> {
        candles(&vec![(100.0, 100.0); n])
    }

    fn rsi_bot(settings: RsiSettings, readings: &[f64]) -> StrategyController {
        StrategyController::new(identity(), StrategySettings::Rsi(settings), ScriptedRsi::new(readings)).unwrap()
    }

    fn cbbc_bot(n: usize) -> StrategyController {
        let mut s = CbbcSettings::new(0.5);
        s.consecutive_candles = n;
        StrategyController::new(identity(), StrategySettings::Cbbc(s), Arc::new(StandardIndicators)).unwrap()
    }

    fn running() -> BotState {
        BotState {
            phase: LifecyclePhase::Running,
            trend: None,
        }
    }

    const CLOSE: BotSignal = BotSignal::Tick(Trigger::CandleClosed);

    #[test]
    fn invalid_settings_fail_construction() {
        let err = StrategyController::new(
            identity(),
            StrategySettings::Rsi(RsiSettings::new(0.0)),
            Arc::new(StandardIndicators),
        )
        .err()
        .unwrap();
        assert_eq!(err.field, "quantity");
    }

    #[test]
    fn start_emits_nothing_and_runs() {
        let bot = rsi_bot(RsiSettings::new(1.0), &[90.0]);
        let mut state = BotState::default();
        assert!(bot.invoke(BotSignal::Start, &mut state, &[]).is_empty());
        assert_eq!(state.phase, LifecyclePhase::Running);
        assert!(state.trend.is_none());
    }

    #[test]
    fn stop_emits_exactly_one_cancel() {
        let bot = rsi_bot(RsiSettings::new(1.0), &[90.0]);
        let mut state = running();
        assert_eq!(bot.invoke(BotSignal::Stop, &mut state, &flat(20)), vec![Effect::CancelActiveTrade]);
        assert_eq!(state.phase, LifecyclePhase::Stopped);
    }

    #[test]
    fn ticks_after_stop_never_enter() {
        let bot = rsi_bot(RsiSettings::new(1.0), &[90.0]);
        let mut state = running();
        bot.invoke(BotSignal::Stop, &mut state, &flat(20));
        for _ in 0..3 {
            assert!(bot.invoke(CLOSE, &mut state, &flat(20)).is_empty());
        }

        // Only a restart re-arms the bot
        bot.invoke(BotSignal::Start, &mut state, &flat(20));
        let effects = bot.invoke(CLOSE, &mut state, &flat(20));
        assert!(matches!(effects.as_slice(), [Effect::PlaceEntryOrder { side: OrderSide::Sell, .. }]));
    }

    #[test]
    fn tick_before_start_is_ignored() {
        let bot = rsi_bot(RsiSettings::new(1.0), &[10.0]);
        let mut state = BotState::default();
        assert!(bot.invoke(CLOSE, &mut state, &flat(20)).is_empty());
        assert!(state.trend.is_none());
    }

    #[test]
    fn insufficient_history_is_a_no_op() {
        let bot = rsi_bot(RsiSettings::new(1.0), &[10.0]);
        assert_eq!(bot.required_history(), 15);
        let mut state = running();
        assert!(bot.invoke(CLOSE, &mut state, &flat(14)).is_empty());
        assert!(state.trend.is_none());
        assert!(bot.invoke(CLOSE, &mut state, &[]).is_empty());
    }

    #[test]
    fn rsi_bot_buys_once_per_persisted_low() {
        let mut settings = RsiSettings::new(0.25);
        settings.persistence = 2;
        let bot = rsi_bot(settings, &[20.0, 20.0, 20.0, 50.0, 80.0, 80.0]);
        let mut state = running();
        let history = flat(20);

        let per_tick: Vec<Vec<Effect>> = (0..6).map(|_| bot.invoke(CLOSE, &mut state, &history)).collect();
        let buy = Effect::PlaceEntryOrder {
            side: OrderSide::Buy,
            quantity: 0.25,
            order_type: common::OrderType::Market,
        };
        let sell = Effect::PlaceEntryOrder {
            side: OrderSide::Sell,
            quantity: 0.25,
            order_type: common::OrderType::Market,
        };
        assert_eq!(per_tick, vec![vec![], vec![buy], vec![], vec![], vec![], vec![sell]]);
    }

    #[test]
    fn reinitializing_existing_trend_emits_nothing() {
        let bot = rsi_bot(RsiSettings::new(1.0), &[90.0]);
        let mut state = BotState {
            phase: LifecyclePhase::Running,
            trend: Some(TrendState {
                direction: TrendDirection::High,
                duration: 5,
                persisted: true,
                advised: true,
            }),
        };
        // Host restart: start again on restored state, then keep ticking high
        assert!(bot.invoke(BotSignal::Start, &mut state, &flat(20)).is_empty());
        assert!(bot.invoke(CLOSE, &mut state, &flat(20)).is_empty());
        assert_eq!(state.trend.unwrap().duration, 6);
    }

    #[test]
    fn restored_advised_trend_survives_a_bad_phase() {
        let bot = rsi_bot(RsiSettings::new(1.0), &[90.0]);
        let mut state = BotState::restore(
            "b",
            serde_json::json!({
                "phase": "paused",
                "trend": {"direction": "high", "duration": 5, "persisted": true, "advised": true}
            }),
        );
        bot.invoke(BotSignal::Start, &mut state, &flat(20));
        assert!(bot.invoke(CLOSE, &mut state, &flat(20)).is_empty());
        assert!(state.trend.unwrap().advised);
    }

    #[test]
    fn rsi_bot_ignores_order_fills() {
        let bot = rsi_bot(RsiSettings::new(1.0), &[90.0]);
        let mut state = running();
        assert!(bot
            .invoke(BotSignal::Tick(Trigger::OrderFilled), &mut state, &flat(20))
            .is_empty());
        assert!(state.trend.is_none());
    }

    #[test]
    fn cbbc_bot_places_dca_on_every_bearish_tick() {
        let bot = cbbc_bot(3);
        let mut state = running();
        let bearish = candles(&[(1.0, 2.0), (4.0, 3.0), (3.0, 2.0), (2.0, 1.0)]);
        let expected = vec![Effect::PlaceDcaOrder {
            quantity: 0.5,
            take_profit_fraction: 0.02,
            safety_orders: vec![],
        }];
        assert_eq!(bot.invoke(CLOSE, &mut state, &bearish), expected);
        assert_eq!(bot.invoke(BotSignal::Tick(Trigger::OrderFilled), &mut state, &bearish), expected);
    }

    #[test]
    fn cbbc_bot_ignores_bullish_and_mixed_runs() {
        let bot = cbbc_bot(3);
        let mut state = running();
        let bullish = candles(&[(1.0, 2.0), (2.0, 3.0), (3.0, 4.0)]);
        let mixed = candles(&[(2.0, 1.0), (2.0, 3.0), (4.0, 3.0)]);
        assert!(bot.invoke(CLOSE, &mut state, &bullish).is_empty());
        assert!(bot.invoke(CLOSE, &mut state, &mixed).is_empty());
        assert!(bot.invoke(CLOSE, &mut state, &bullish[..2]).is_empty());
    }

    #[test]
    fn metadata_follows_configuration() {
        let bot = cbbc_bot(7);
        assert_eq!(bot.required_history(), 7);
        assert_eq!(bot.watched_symbol(), "BTC/USDT");
        assert_eq!(bot.timeframe(), "1h");
        assert!(bot.run_policy().on_order_filled);
        assert_eq!(bot.display_name(), "Consecutive-Bullish-Bearish");
    }
}

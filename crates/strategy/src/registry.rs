use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{error, info, warn};

use common::{BotSignal, Candle, EffectRequest, Trigger};

use crate::config::StrategyFileConfig;
use crate::controller::StrategyController;
use crate::indicators::IndicatorProvider;
use crate::state::BotState;

struct BotSlot {
    controller: StrategyController,
    state: BotState,
}

/// Holds every configured bot together with its state and dispatches host
/// invocations to them, one bot at a time.
pub struct StrategyRegistry {
    bots: Vec<BotSlot>,
}

impl StrategyRegistry {
    /// Build the registry from config. A bot whose settings fail validation
    /// is logged and left out; the others still load.
    pub fn from_config(file_cfg: &StrategyFileConfig, indicators: Arc<dyn IndicatorProvider>) -> Self {
        let controllers = file_cfg
            .bots
            .iter()
            .filter_map(|cfg| match StrategyController::from_config(cfg, indicators.clone()) {
                Ok(controller) => Some(controller),
                Err(e) => {
                    error!(bot = %cfg.id, field = e.field, error = %e, "Invalid bot configuration, bot not started");
                    None
                }
            })
            .collect();
        Self::new(controllers)
    }

    pub fn new(controllers: Vec<StrategyController>) -> Self {
        let bots = controllers
            .into_iter()
            .map(|controller| {
                info!(
                    bot = %controller.bot().id,
                    symbol = %controller.watched_symbol(),
                    strategy = controller.display_name(),
                    "Registered bot"
                );
                BotSlot {
                    controller,
                    state: BotState::default(),
                }
            })
            .collect();
        Self { bots }
    }

    pub fn len(&self) -> usize {
        self.bots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bots.is_empty()
    }

    pub fn bot_ids(&self) -> Vec<String> {
        self.bots.iter().map(|b| b.controller.bot().id.clone()).collect()
    }

    pub fn controller(&self, bot_id: &str) -> Option<&StrategyController> {
        self.slot(bot_id).map(|b| &b.controller)
    }

    pub fn state(&self, bot_id: &str) -> Option<&BotState> {
        self.slot(bot_id).map(|b| &b.state)
    }

    /// Largest history any bot watching `symbol` needs.
    pub fn required_history(&self, symbol: &str) -> usize {
        self.bots
            .iter()
            .filter(|b| b.controller.watched_symbol() == symbol)
            .map(|b| b.controller.required_history())
            .max()
            .unwrap_or(0)
    }

    /// Invoke one bot. Returns `None` when the id is unknown.
    pub fn signal_bot(
        &mut self,
        bot_id: &str,
        signal: BotSignal,
        candles: &[Candle],
    ) -> Option<Vec<EffectRequest>> {
        let slot = self.bots.iter_mut().find(|b| b.controller.bot().id == bot_id)?;
        Some(dispatch(slot, signal, candles))
    }

    /// Invoke every bot, looking up each one's history by watched symbol.
    pub fn signal_all<'a, F>(&mut self, signal: BotSignal, history: F) -> Vec<EffectRequest>
    where
        F: Fn(&str) -> &'a [Candle],
    {
        let mut out = Vec::new();
        for slot in &mut self.bots {
            let candles = history(slot.controller.watched_symbol());
            out.extend(dispatch(slot, signal, candles));
        }
        out
    }

    /// Tick every bot watching `symbol` after a candle closed.
    pub fn on_candle_closed(&mut self, symbol: &str, candles: &[Candle]) -> Vec<EffectRequest> {
        let signal = BotSignal::Tick(Trigger::CandleClosed);
        self.bots
            .iter_mut()
            .filter(|b| b.controller.watched_symbol() == symbol)
            .flat_map(|slot| dispatch(slot, signal, candles))
            .collect()
    }

    /// Replace a bot's state with one persisted by the host.
    pub fn restore_state(&mut self, bot_id: &str, value: serde_json::Value) -> bool {
        match self.bots.iter_mut().find(|b| b.controller.bot().id == bot_id) {
            Some(slot) => {
                slot.state = BotState::restore(bot_id, value);
                true
            }
            None => {
                warn!(bot = bot_id, "No such bot, persisted state ignored");
                false
            }
        }
    }

    /// All bot states keyed by bot id, ready for the host to persist.
    pub fn snapshot_states(&self) -> serde_json::Result<serde_json::Value> {
        let states: BTreeMap<&str, &BotState> = self
            .bots
            .iter()
            .map(|b| (b.controller.bot().id.as_str(), &b.state))
            .collect();
        serde_json::to_value(states)
    }

    fn slot(&self, bot_id: &str) -> Option<&BotSlot> {
        self.bots.iter().find(|b| b.controller.bot().id == bot_id)
    }
}

fn dispatch(slot: &mut BotSlot, signal: BotSignal, candles: &[Candle]) -> Vec<EffectRequest> {
    let bot = slot.controller.bot();
    slot.controller
        .invoke(signal, &mut slot.state, candles)
        .into_iter()
        .map(|effect| EffectRequest {
            bot_id: bot.id.clone(),
            symbol: bot.symbol.clone(),
            effect,
        })
        .collect()
}

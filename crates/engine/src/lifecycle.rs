use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use common::{BotSignal, EffectRequest, EngineCommand, Fill, MarketEvent, Trigger};
use strategy::StrategyRegistry;

use crate::executor::ExecutorMessage;
use crate::history::CandleHistory;

/// Everything the host feeds the engine, kept in one ordered channel so a
/// command always lands between the candles it was issued between.
#[derive(Debug, Clone)]
pub enum EngineInput {
    Command(EngineCommand),
    Market(MarketEvent),
}

/// Cloneable handle passed to whoever drives the engine.
#[derive(Clone)]
pub struct EngineHandle {
    input_tx: mpsc::Sender<EngineInput>,
}

impl EngineHandle {
    pub async fn send(&self, cmd: EngineCommand) {
        if self.input_tx.send(EngineInput::Command(cmd)).await.is_err() {
            warn!("Engine gone, command dropped");
        }
    }

    /// Publish a closed candle. Returns `false` once the engine has stopped.
    pub async fn publish(&self, event: MarketEvent) -> bool {
        self.input_tx.send(EngineInput::Market(event)).await.is_ok()
    }
}

/// The reference execution host loop.
///
/// Keeps candle history, invokes bots on the triggers they asked for, and
/// forwards their effects to the executor. Bots are invoked one at a time,
/// so a bot never has two invocations in flight.
pub struct Engine {
    registry: StrategyRegistry,
    history: CandleHistory,
    input_rx: mpsc::Receiver<EngineInput>,
    fill_rx: mpsc::UnboundedReceiver<Fill>,
    executor_tx: mpsc::Sender<ExecutorMessage>,
}

impl Engine {
    pub fn new(
        registry: StrategyRegistry,
        history_limit: usize,
        executor_tx: mpsc::Sender<ExecutorMessage>,
        fill_rx: mpsc::UnboundedReceiver<Fill>,
    ) -> (Self, EngineHandle) {
        let (input_tx, input_rx) = mpsc::channel(1024);

        let engine = Engine {
            registry,
            history: CandleHistory::new(history_limit),
            input_rx,
            fill_rx,
            executor_tx,
        };

        (engine, EngineHandle { input_tx })
    }

    /// Run until every handle is dropped. Returns the registry so the caller
    /// can persist bot states. Call from `tokio::spawn`.
    pub async fn run(mut self) -> StrategyRegistry {
        info!(bots = self.registry.len(), history_limit = self.history.limit(), "Engine running");

        for id in self.registry.bot_ids() {
            if let Some(bot) = self.registry.controller(&id) {
                let needed = bot.required_history();
                if needed > self.history.limit() {
                    warn!(bot = %id, needed, limit = self.history.limit(), "History limit below bot requirement, bot will never tick");
                }
            }
        }

        loop {
            tokio::select! {
                input = self.input_rx.recv() => {
                    match input {
                        Some(EngineInput::Command(cmd)) => self.handle_command(cmd).await,
                        Some(EngineInput::Market(event)) => self.handle_market_event(event).await,
                        None => {
                            info!("All engine handles dropped, shutting down");
                            break;
                        }
                    }
                }

                Some(fill) = self.fill_rx.recv() => self.handle_fill(fill).await,
            }
        }

        self.registry
    }

    async fn handle_command(&mut self, cmd: EngineCommand) {
        info!(command = ?cmd, "Engine command");
        let requests = match cmd {
            EngineCommand::Start => self.signal_all(BotSignal::Start),
            EngineCommand::Stop => self.signal_all(BotSignal::Stop),
            EngineCommand::StartBot(id) => self.signal_bot(&id, BotSignal::Start),
            EngineCommand::StopBot(id) => self.signal_bot(&id, BotSignal::Stop),
        };
        self.forward(requests).await;
    }

    async fn handle_market_event(&mut self, event: MarketEvent) {
        let MarketEvent { symbol, candle } = event;
        let candles = self.history.push(&symbol, candle);
        debug!(symbol = %symbol, close = candle.close, history = candles.len(), "Candle closed");
        let requests = self.registry.on_candle_closed(&symbol, candles);

        self.send(ExecutorMessage::Price {
            symbol,
            price: candle.close,
        })
        .await;
        self.forward(requests).await;
    }

    async fn handle_fill(&mut self, fill: Fill) {
        debug!(bot = %fill.bot_id, order = %fill.order_id, "Order filled, ticking bot");
        let candles = self.history.get(&fill.symbol);
        let requests = self
            .registry
            .signal_bot(&fill.bot_id, BotSignal::Tick(Trigger::OrderFilled), candles)
            .unwrap_or_default();
        self.forward(requests).await;
    }

    fn signal_all(&mut self, signal: BotSignal) -> Vec<EffectRequest> {
        let history = &self.history;
        self.registry.signal_all(signal, |symbol| history.get(symbol))
    }

    fn signal_bot(&mut self, id: &str, signal: BotSignal) -> Vec<EffectRequest> {
        let symbol = match self.registry.controller(id) {
            Some(bot) => bot.watched_symbol().to_string(),
            None => {
                warn!(bot = id, "Unknown bot, command ignored");
                return Vec::new();
            }
        };
        self.registry
            .signal_bot(id, signal, self.history.get(&symbol))
            .unwrap_or_default()
    }

    async fn forward(&self, requests: Vec<EffectRequest>) {
        for request in requests {
            self.send(ExecutorMessage::Effect(request)).await;
        }
    }

    async fn send(&self, msg: ExecutorMessage) {
        if self.executor_tx.send(msg).await.is_err() {
            warn!("Executor channel closed, effect dropped");
        }
    }
}

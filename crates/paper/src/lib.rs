use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::{debug, info};

use common::{Effect, EffectRequest, Error, ExecutionHost, Fill, OrderSide, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeStatus {
    Open,
    /// Closed by an opposite entry order.
    Closed,
    TakeProfit,
    Cancelled,
}

/// A simulated smart trade: one entry plus an optional take-profit exit.
#[derive(Debug, Clone)]
pub struct SmartTrade {
    pub id: String,
    pub bot_id: String,
    pub symbol: String,
    pub side: OrderSide,
    pub entry_price: f64,
    pub quantity: f64,
    pub take_profit_price: Option<f64>,
    pub status: TradeStatus,
    pub opened_at: DateTime<Utc>,
    pub exit_price: Option<f64>,
}

#[derive(Default)]
struct Ledger {
    /// Quote balance in USD.
    balance_usd: f64,
    /// At most one open trade per bot.
    active: HashMap<String, SmartTrade>,
    finished: Vec<SmartTrade>,
}

impl Ledger {
    fn settle(&mut self, mut trade: SmartTrade, status: TradeStatus, exit_price: f64) {
        let proceeds = exit_price * trade.quantity;
        match trade.side {
            OrderSide::Buy => self.balance_usd += proceeds,
            OrderSide::Sell => self.balance_usd -= proceeds,
        }
        trade.status = status;
        trade.exit_price = Some(exit_price);
        self.finished.push(trade);
    }
}

/// Simulated execution host for paper trading.
///
/// Fills are simulated at the latest known close with configurable slippage.
/// Each bot holds at most one active smart trade; entries arriving while one
/// is open in the same direction are skipped.
pub struct PaperHost {
    ledger: Arc<RwLock<Ledger>>,
    /// Latest known close per symbol, updated via `update_price`.
    prices: Arc<RwLock<HashMap<String, f64>>>,
    /// Slippage in basis points applied to all fills.
    slippage_bps: f64,
}

impl PaperHost {
    pub fn new(initial_balance_usd: f64, slippage_bps: f64) -> Self {
        info!(
            balance = initial_balance_usd,
            slippage_bps = slippage_bps,
            "PaperHost initialized"
        );
        Self {
            ledger: Arc::new(RwLock::new(Ledger {
                balance_usd: initial_balance_usd,
                ..Ledger::default()
            })),
            prices: Arc::new(RwLock::new(HashMap::new())),
            slippage_bps,
        }
    }

    pub async fn balance_usd(&self) -> f64 {
        self.ledger.read().await.balance_usd
    }

    pub async fn active_trade(&self, bot_id: &str) -> Option<SmartTrade> {
        self.ledger.read().await.active.get(bot_id).cloned()
    }

    /// Trades that are no longer open, oldest first.
    pub async fn finished_trades(&self) -> Vec<SmartTrade> {
        self.ledger.read().await.finished.clone()
    }

    fn slipped(&self, price: f64, side: OrderSide) -> f64 {
        // Buys pay more, sells receive less
        match side {
            OrderSide::Buy => price * (1.0 + self.slippage_bps / 10_000.0),
            OrderSide::Sell => price * (1.0 - self.slippage_bps / 10_000.0),
        }
    }

    async fn price(&self, symbol: &str) -> Result<f64> {
        self.prices.read().await.get(symbol).copied().ok_or_else(|| {
            Error::Execution(format!(
                "PaperHost has no price for '{symbol}'. Ensure candles are flowing."
            ))
        })
    }

    async fn enter(
        &self,
        request: &EffectRequest,
        side: OrderSide,
        quantity: f64,
        take_profit_fraction: Option<f64>,
    ) -> Result<Option<Fill>> {
        let mid_price = self.price(&request.symbol).await?;
        let fill_price = self.slipped(mid_price, side);
        let mut ledger = self.ledger.write().await;

        match ledger.active.remove(&request.bot_id) {
            Some(open) if open.side == side => {
                info!(bot = %request.bot_id, trade = %open.id, "Active trade already open, entry skipped");
                ledger.active.insert(request.bot_id.clone(), open);
                return Ok(None);
            }
            // Opposite entry closes the open trade
            Some(trade) => {
                let fill = Fill {
                    order_id: trade.id.clone(),
                    bot_id: request.bot_id.clone(),
                    symbol: request.symbol.clone(),
                    side,
                    fill_price,
                    quantity: trade.quantity,
                    timestamp: Utc::now(),
                };
                info!(bot = %request.bot_id, trade = %trade.id, price = fill_price, "Trade closed by opposite entry");
                ledger.settle(trade, TradeStatus::Closed, fill_price);
                return Ok(Some(fill));
            }
            None => {}
        }

        let cost = fill_price * quantity;
        if side == OrderSide::Buy && cost > ledger.balance_usd {
            return Err(Error::Execution(format!(
                "insufficient funds: need {cost:.2}, have {:.2}",
                ledger.balance_usd
            )));
        }
        match side {
            OrderSide::Buy => ledger.balance_usd -= cost,
            OrderSide::Sell => ledger.balance_usd += cost,
        }

        let trade = SmartTrade {
            id: uuid::Uuid::new_v4().to_string(),
            bot_id: request.bot_id.clone(),
            symbol: request.symbol.clone(),
            side,
            entry_price: fill_price,
            quantity,
            take_profit_price: take_profit_fraction.map(|tp| fill_price * (1.0 + tp)),
            status: TradeStatus::Open,
            opened_at: Utc::now(),
            exit_price: None,
        };
        debug!(
            bot = %trade.bot_id,
            mid = mid_price,
            fill = fill_price,
            qty = quantity,
            tp = ?trade.take_profit_price,
            "Paper fill simulated"
        );

        let fill = Fill {
            order_id: trade.id.clone(),
            bot_id: trade.bot_id.clone(),
            symbol: trade.symbol.clone(),
            side,
            fill_price,
            quantity,
            timestamp: trade.opened_at,
        };
        ledger.active.insert(request.bot_id.clone(), trade);
        Ok(Some(fill))
    }

    async fn cancel(&self, request: &EffectRequest) -> Result<Option<Fill>> {
        let mut ledger = self.ledger.write().await;
        let Some(trade) = ledger.active.remove(&request.bot_id) else {
            debug!(bot = %request.bot_id, "No active trade to cancel");
            return Ok(None);
        };
        // Unwind at the latest close when known, else at entry
        let exit = self
            .prices
            .read()
            .await
            .get(&trade.symbol)
            .copied()
            .unwrap_or(trade.entry_price);
        info!(bot = %request.bot_id, trade = %trade.id, price = exit, "Active trade cancelled");
        ledger.settle(trade, TradeStatus::Cancelled, exit);
        Ok(None)
    }
}

#[async_trait]
impl ExecutionHost for PaperHost {
    async fn execute(&self, request: &EffectRequest) -> Result<Option<Fill>> {
        match &request.effect {
            Effect::PlaceEntryOrder { side, quantity, .. } => {
                self.enter(request, *side, *quantity, None).await
            }
            Effect::PlaceDcaOrder {
                quantity,
                take_profit_fraction,
                safety_orders,
            } => {
                if !safety_orders.is_empty() {
                    debug!(bot = %request.bot_id, count = safety_orders.len(), "Safety orders are not simulated");
                }
                self.enter(request, OrderSide::Buy, *quantity, Some(*take_profit_fraction))
                    .await
            }
            Effect::CancelActiveTrade => self.cancel(request).await,
        }
    }

    async fn update_price(&self, symbol: &str, price: f64) {
        self.prices.write().await.insert(symbol.to_string(), price);

        let mut ledger = self.ledger.write().await;
        let hit: Vec<String> = ledger
            .active
            .values()
            .filter(|t| t.symbol == symbol)
            .filter(|t| t.take_profit_price.is_some_and(|tp| price >= tp))
            .map(|t| t.bot_id.clone())
            .collect();
        for bot_id in hit {
            if let Some(trade) = ledger.active.remove(&bot_id) {
                info!(bot = %bot_id, trade = %trade.id, price, "Take profit reached");
                ledger.settle(trade, TradeStatus::TakeProfit, price);
            }
        }
    }
}

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{error, info, warn};

use common::{EffectRequest, ExecutionHost, Fill};

/// Work handed from the engine to the executor, in the order it happened.
#[derive(Debug, Clone)]
pub enum ExecutorMessage {
    /// Latest close for a symbol, so the host can price fills.
    Price { symbol: String, price: f64 },
    Effect(EffectRequest),
}

/// Counters returned when the executor loop ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecutorReport {
    pub executed: usize,
    pub failed: usize,
}

/// Receives effects from the engine and carries them out on the host.
/// Fills are reported back to the engine so bots can react to them.
///
/// This is the ONLY component that calls `ExecutionHost::execute`.
/// The fill channel is unbounded: the engine may be blocked forwarding
/// effects to us, so reporting a fill must never wait on it.
/// Failed effects are logged and dropped, never retried.
pub struct EffectExecutor {
    effect_rx: mpsc::Receiver<ExecutorMessage>,
    fill_tx: mpsc::UnboundedSender<Fill>,
    host: Arc<dyn ExecutionHost>,
}

impl EffectExecutor {
    pub fn new(
        effect_rx: mpsc::Receiver<ExecutorMessage>,
        fill_tx: mpsc::UnboundedSender<Fill>,
        host: Arc<dyn ExecutionHost>,
    ) -> Self {
        Self {
            effect_rx,
            fill_tx,
            host,
        }
    }

    /// Run the executor loop until the engine drops its sender.
    /// Call from `tokio::spawn`.
    pub async fn run(mut self) -> ExecutorReport {
        info!("EffectExecutor running");
        let mut report = ExecutorReport::default();

        while let Some(msg) = self.effect_rx.recv().await {
            let request = match msg {
                ExecutorMessage::Price { symbol, price } => {
                    self.host.update_price(&symbol, price).await;
                    continue;
                }
                ExecutorMessage::Effect(request) => request,
            };

            info!(bot = %request.bot_id, symbol = %request.symbol, effect = ?request.effect, "Executing effect");
            match self.host.execute(&request).await {
                Ok(Some(fill)) => {
                    report.executed += 1;
                    info!(
                        bot = %fill.bot_id,
                        symbol = %fill.symbol,
                        side = %fill.side,
                        price = fill.fill_price,
                        qty = fill.quantity,
                        "Order filled"
                    );
                    if self.fill_tx.send(fill).is_err() {
                        warn!("Fill channel closed, fill not reported to engine");
                    }
                }
                Ok(None) => report.executed += 1,
                Err(e) => {
                    report.failed += 1;
                    error!(bot = %request.bot_id, symbol = %request.symbol, error = %e, "Effect execution failed");
                }
            }
        }

        info!(executed = report.executed, failed = report.failed, "EffectExecutor: effect channel closed");
        report
    }
}

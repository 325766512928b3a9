use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::mpsc;

use common::{Candle, EngineCommand, LifecyclePhase, OrderSide};
use engine::{CandleFeed, EffectExecutor, Engine};
use paper::{PaperHost, TradeStatus};
use strategy::{StandardIndicators, StrategyFileConfig, StrategyRegistry};

const BOTS: &str = r#"
[[bot]]
id = "rsi"
symbol = "BTC/USDT"
strategy = "rsi"
[bot.settings]
quantity = 1.0
periods = 3
persistence = 2

[[bot]]
id = "cbbc"
symbol = "BTC/USDT"
strategy = "cbbc"
[bot.settings]
quantity = 1.0
tp_percent = 50.0
consecutive_candles = 3
"#;

fn series(closes: &[f64]) -> Vec<Candle> {
    let mut open = closes[0];
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let c = Candle {
                open,
                high: open.max(close),
                low: open.min(close),
                close,
                timestamp: DateTime::<Utc>::UNIX_EPOCH + Duration::hours(i as i64),
            };
            open = close;
            c
        })
        .collect()
}

#[tokio::test]
async fn falling_market_buys_then_stop_unwinds() {
    let file = StrategyFileConfig::from_toml_str(BOTS).unwrap();
    let registry = StrategyRegistry::from_config(&file, Arc::new(StandardIndicators));
    let host = Arc::new(PaperHost::new(1_000.0, 0.0));

    let (executor_tx, executor_rx) = mpsc::channel(64);
    let (fill_tx, fill_rx) = mpsc::unbounded_channel();
    let (engine, handle) = Engine::new(registry, 100, executor_tx, fill_rx);
    let executor = EffectExecutor::new(executor_rx, fill_tx, host.clone());
    let engine_task = tokio::spawn(engine.run());
    let executor_task = tokio::spawn(executor.run());

    // Flat, then a steady slide: RSI pins at 0 and every candle is bearish
    let feed = CandleFeed::new("BTC/USDT", series(&[100.0, 100.0, 99.0, 98.0, 97.0, 96.0, 95.0]));

    handle.send(EngineCommand::Start).await;
    assert_eq!(feed.run(handle.clone()).await, 7);
    handle.send(EngineCommand::Stop).await;
    drop(handle);

    let registry = engine_task.await.unwrap();
    let report = executor_task.await.unwrap();
    assert_eq!(report.failed, 0);

    // Both bots bought once, the stop cancelled both trades
    assert!(host.active_trade("rsi").await.is_none());
    assert!(host.active_trade("cbbc").await.is_none());
    let finished = host.finished_trades().await;
    assert_eq!(finished.len(), 2);
    assert!(finished.iter().all(|t| t.side == OrderSide::Buy));
    assert!(finished.iter().all(|t| t.status == TradeStatus::Cancelled));

    assert_eq!(registry.state("rsi").unwrap().phase, LifecyclePhase::Stopped);
    let trend = registry.state("rsi").unwrap().trend.unwrap();
    assert!(trend.advised);
}

use std::sync::Arc;

use anyhow::{bail, Context};
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use common::{Config, EngineCommand};
use engine::{CandleFeed, EffectExecutor, Engine};
use paper::PaperHost;
use strategy::{StandardIndicators, StrategyFileConfig, StrategyRegistry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── Logging ──────────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // ── Config ────────────────────────────────────────────────────────────────
    let cfg = Config::from_env()?;
    let strategy_file = StrategyFileConfig::load(&cfg.strategy_config_path).with_context(|| {
        format!("loading bots from {}", cfg.strategy_config_path.display())
    })?;
    info!(bots = strategy_file.bots.len(), "SignalBot starting");

    // ── Bots ──────────────────────────────────────────────────────────────────
    let registry = StrategyRegistry::from_config(&strategy_file, Arc::new(StandardIndicators));
    if registry.is_empty() {
        bail!("no valid bots configured in {}", cfg.strategy_config_path.display());
    }

    // ── Candle replay ─────────────────────────────────────────────────────────
    let symbol = match cfg.candles_symbol.clone() {
        Some(symbol) => symbol,
        None => strategy_file
            .symbols()
            .into_iter()
            .next()
            .context("no symbol to replay candles for")?,
    };
    let mut feed = CandleFeed::from_json_file(symbol.clone(), &cfg.candles_path)
        .with_context(|| format!("loading candles from {}", cfg.candles_path.display()))?;
    if let Some(pace) = cfg.replay_pace {
        feed = feed.with_pace(pace);
    }
    let needed = registry.required_history(&symbol);
    if feed.len() < needed {
        info!(candles = feed.len(), needed, "Candle file shorter than required history, bots will not tick");
    }

    // ── Execution host ────────────────────────────────────────────────────────
    let host = Arc::new(PaperHost::new(cfg.paper_balance_usd, cfg.paper_slippage_bps));

    // ── Channels ──────────────────────────────────────────────────────────────
    let (executor_tx, executor_rx) = mpsc::channel(256);
    let (fill_tx, fill_rx) = mpsc::unbounded_channel();

    let (engine, engine_handle) = Engine::new(registry, cfg.history_limit, executor_tx, fill_rx);
    let executor = EffectExecutor::new(executor_rx, fill_tx, host.clone());

    // ── Spawn all tasks ───────────────────────────────────────────────────────
    let engine_task = tokio::spawn(engine.run());
    let executor_task = tokio::spawn(executor.run());

    engine_handle.send(EngineCommand::Start).await;
    let replayed = feed.run(engine_handle.clone()).await;
    engine_handle.send(EngineCommand::Stop).await;
    drop(engine_handle);

    let registry = engine_task.await.context("engine task panicked")?;
    let report = executor_task.await.context("executor task panicked")?;

    // ── Summary ───────────────────────────────────────────────────────────────
    let finished = host.finished_trades().await;
    info!(
        replayed,
        executed = report.executed,
        failed = report.failed,
        trades = finished.len(),
        balance = host.balance_usd().await,
        "Replay complete"
    );
    for trade in &finished {
        info!(
            bot = %trade.bot_id,
            side = %trade.side,
            entry = trade.entry_price,
            exit = ?trade.exit_price,
            status = ?trade.status,
            "Trade"
        );
    }

    let states = registry.snapshot_states()?;
    println!("{}", serde_json::to_string_pretty(&states)?);
    Ok(())
}

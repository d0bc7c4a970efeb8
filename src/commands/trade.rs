//! Trade command handler.
//!
//! Wires the Binance market data client, the executor for the selected mode,
//! notifications and the trade journal into a `TradingEngine` and runs it
//! until Ctrl-C.

use crate::cli::TradeArgs;
use crate::config::{BotConfig, BotConfigBuilder};
use crate::exchange::{BinanceClient, OrderExecutor, PaperExecutor};
use crate::health::{run_health_server, HealthState};
use crate::logging::{
    CsvRecorder, MultiRecorder, TracingRecorder, TradeRecorder, DEFAULT_JOURNAL_PATH,
};
use crate::notify;
use crate::strategy::PairsSignalEngine;
use crate::trading::{EngineError, PositionStateMachine, TradingEngine};

use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Run the pairs trading loop.
///
/// # Errors
/// Returns error if configuration is invalid or the exchange client cannot
/// be created. Once the loop runs it only returns on shutdown.
pub async fn run_trade(args: TradeArgs) -> Result<(), Box<dyn std::error::Error>> {
    let (config, mut engine) = build_engine(&args)?;

    if let Some(port) = args.health_port {
        let health = HealthState::new(config.env);
        tokio::spawn(run_health_server(port, health.clone()));
        engine = engine.with_health(health);
    }

    engine.run().await?;
    Ok(())
}

fn build_engine(args: &TradeArgs) -> Result<(BotConfig, TradingEngine), EngineError> {
    let config = args.apply(BotConfigBuilder::from_env()?).build()?;

    let client = Arc::new(BinanceClient::new(config.credentials.clone())?);
    info!(
        signed_endpoints = client.has_credentials(),
        "Binance client ready"
    );

    let executor: Arc<dyn OrderExecutor> = if config.is_paper() {
        Arc::new(PaperExecutor::new(config.paper_fake_balance))
    } else {
        client.clone()
    };

    let notifier = notify::from_settings(&config.telegram);

    let mut recorders: Vec<Box<dyn TradeRecorder>> = vec![Box::new(TracingRecorder::new())];
    let journal = args
        .journal
        .clone()
        .or_else(|| config.is_paper().then(|| PathBuf::from(DEFAULT_JOURNAL_PATH)));
    if let Some(path) = journal {
        info!("Journaling trades to {}", path.display());
        recorders.push(Box::new(CsvRecorder::new(path)));
    }
    let recorder: Arc<dyn TradeRecorder> = Arc::new(MultiRecorder::new(recorders));

    let signal_engine = PairsSignalEngine::new(&config, client);
    let machine =
        PositionStateMachine::new(&config, executor, notifier.clone()).with_recorder(recorder);
    let engine = TradingEngine::new(config.clone(), signal_engine, machine, notifier);

    Ok((config, engine))
}

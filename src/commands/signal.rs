//! Signal command handler.
//!
//! Evaluates one cycle against live market data and prints the
//! `StrategyResult` as JSON. Never places orders.

use crate::cli::SignalArgs;
use crate::config::BotConfigBuilder;
use crate::exchange::BinanceClient;
use crate::strategy::PairsSignalEngine;

use std::sync::Arc;

/// Print the current signal.
///
/// # Errors
/// Returns error if configuration is invalid or the result cannot be
/// serialized. Market data failures are reported inside the JSON.
pub async fn run_signal(args: SignalArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = args.apply(BotConfigBuilder::from_env()?).build()?;

    // Market data only: never hand credentials to this client.
    let client = Arc::new(BinanceClient::new(None)?);
    let engine = PairsSignalEngine::new(&config, client);

    let result = engine.get_signal().await;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

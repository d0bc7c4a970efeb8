//! CLI argument parsing using clap.
//!
//! This module defines the command-line interface for pairpilot.
//! Every flag is optional and overrides the environment configuration.

mod config;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use rust_decimal::Decimal;

use crate::exchange::Granularity;

/// pairpilot - ratio-spread mean-reversion bot for a two-asset crypto pair
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Set the verbosity level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info")]
    pub verbose: String,

    /// Directory for the rolling log file
    #[arg(long, global = true, default_value = "logs")]
    pub log_dir: PathBuf,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Run the trading bot until interrupted
    Trade(TradeArgs),

    /// Evaluate the current signal once and print it as JSON (no orders)
    Signal(SignalArgs),
}

/// Pair selection shared by every subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct PairArgs {
    /// Base leg symbol (e.g., "BTC/USDT")
    #[arg(long)]
    pub base: Option<String>,
    /// Quote leg symbol (e.g., "ETH/USDT")
    #[arg(long)]
    pub quote: Option<String>,
    /// Candle timeframe (1m, 3m, 5m, 15m, 30m, 1h, 2h, 4h, 6h, 8h, 12h, 1d)
    #[arg(long)]
    pub timeframe: Option<Granularity>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct TradeArgs {
    /// Force paper trading (simulated execution)
    #[arg(long, conflicts_with = "live")]
    pub paper: bool,
    /// Force live trading (real orders; needs Binance credentials)
    #[arg(long)]
    pub live: bool,
    #[command(flatten)]
    pub pair: PairArgs,
    /// Seconds to sleep between cycles
    #[arg(long)]
    pub poll_interval: Option<u64>,
    /// Quote currency spent per entry
    #[arg(long)]
    pub notional: Option<Decimal>,
    /// Serve /health and /metrics on this port
    #[arg(long)]
    pub health_port: Option<u16>,
    /// CSV trade journal path (always on in paper mode)
    #[arg(long)]
    pub journal: Option<PathBuf>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct SignalArgs {
    #[command(flatten)]
    pub pair: PairArgs,
}

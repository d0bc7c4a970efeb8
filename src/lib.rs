//! pairpilot: ratio-spread mean-reversion trading for a two-asset crypto pair.
//!
//! The signal engine (`strategy`) turns candles into a Z-score signal, the
//! position state machine (`trading`) turns signals into orders, and the
//! engine loop polls both on a fixed interval.

pub mod cli;
pub mod commands;
pub mod config;
pub mod exchange;
pub mod health;
pub mod logging;
pub mod math;
pub mod metrics;
pub mod notify;
pub mod observability;
pub mod state;
pub mod strategy;
pub mod trading;
pub mod types;

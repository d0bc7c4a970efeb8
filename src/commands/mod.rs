//! CLI command handlers.
//!
//! Each handler assembles its components from the validated configuration
//! and delegates to the signal engine or the trading loop.

mod signal;
mod trade;

pub use signal::run_signal;
pub use trade::run_trade;

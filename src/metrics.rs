//! Prometheus Metrics Module
//!
//! Pre-registered metrics for the trading loop, exposed on `/metrics` by the
//! health server.

use lazy_static::lazy_static;
use prometheus::{
    opts, register_gauge, register_int_counter_vec, Encoder, Gauge, IntCounterVec, TextEncoder,
};

use crate::state::PositionState;
use crate::strategy::Signal;
use crate::types::OrderSide;

lazy_static! {
    /// Completed cycles by outcome ("completed", "skipped", "panicked")
    pub static ref CYCLES_TOTAL: IntCounterVec = register_int_counter_vec!(
        opts!("pairpilot_cycles_total", "Trading cycles run"),
        &["outcome"]
    ).expect("FATAL: Failed to register CYCLES_TOTAL metric - check for duplicate registration");

    /// Signals produced by valid evaluations
    pub static ref SIGNALS_TOTAL: IntCounterVec = register_int_counter_vec!(
        opts!("pairpilot_signals_total", "Signals generated"),
        &["signal"]
    ).expect("FATAL: Failed to register SIGNALS_TOTAL metric - check for duplicate registration");

    /// Orders attempted (by symbol, side, status)
    pub static ref ORDERS_TOTAL: IntCounterVec = register_int_counter_vec!(
        opts!("pairpilot_orders_total", "Total orders attempted"),
        &["symbol", "side", "status"]
    ).expect("FATAL: Failed to register ORDERS_TOTAL metric - check for duplicate registration");

    /// Position state transitions
    pub static ref STATE_TRANSITIONS: IntCounterVec = register_int_counter_vec!(
        opts!("pairpilot_state_transitions_total", "Position state transitions"),
        &["from_state", "to_state"]
    ).expect("FATAL: Failed to register STATE_TRANSITIONS metric - check for duplicate registration");

    /// Latest defined spread Z-score
    pub static ref Z_SCORE: Gauge = register_gauge!(
        opts!("pairpilot_z_score", "Latest spread Z-score")
    ).expect("FATAL: Failed to register Z_SCORE metric - check for duplicate registration");
}

/// Record a finished cycle
pub fn record_cycle(outcome: &str) {
    CYCLES_TOTAL.with_label_values(&[outcome]).inc();
}

/// Record a valid evaluation's signal and Z-score
pub fn record_signal(signal: Signal, z_score: Option<f64>) {
    SIGNALS_TOTAL.with_label_values(&[signal.as_str()]).inc();
    if let Some(z) = z_score {
        Z_SCORE.set(z);
    }
}

/// Record an order attempt
pub fn record_order(symbol: &str, side: OrderSide, success: bool) {
    let status = if success { "success" } else { "failure" };
    ORDERS_TOTAL
        .with_label_values(&[symbol, side.as_exchange_str(), status])
        .inc();
}

pub fn record_transition(from: PositionState, to: PositionState) {
    STATE_TRANSITIONS
        .with_label_values(&[from.as_str(), to.as_str()])
        .inc();
}

/// Get metrics as text for /metrics endpoint
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode Prometheus metrics: {}", e);
        return String::new();
    }

    match String::from_utf8(buffer) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Prometheus metrics buffer is not valid UTF-8: {}", e);
            String::new()
        }
    }
}

//! Mathematical utilities for trading strategies.
//!
//! This module provides the rolling statistical primitives used by the
//! ratio-spread signal engine.

pub mod rolling;

pub use rolling::{mean, rolling_stats, sample_std_dev, WindowStats};

//! Ratio-spread mean-reversion strategy.
//!
//! `spread` holds the pure series math, `pairs` turns market data into a
//! `StrategyResult` once per cycle.

pub mod pairs;
pub mod spread;

pub use pairs::{
    determine_signal, PairsSignalEngine, SignalThresholds, StrategyResult, StrategySettings,
};
pub use spread::{compute_spread, compute_z_score, SignalError, ZScoreSeries};

use serde::{Deserialize, Serialize};

/// Represents a trading signal.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Signal {
    /// Spread abnormally narrow: favour the base leg.
    LongBase,
    /// Spread abnormally wide: favour the quote leg.
    LongQuote,
    /// Z-score crossed the exit threshold: flatten.
    Close,
    Hold,
}

impl Signal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Signal::LongBase => "LONG_BASE",
            Signal::LongQuote => "LONG_QUOTE",
            Signal::Close => "CLOSE",
            Signal::Hold => "HOLD",
        }
    }
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One side of the configured pair.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum Leg {
    Base,
    Quote,
}

impl std::fmt::Display for Leg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Leg::Base => write!(f, "base"),
            Leg::Quote => write!(f, "quote"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_serializes_as_screaming_snake_case() {
        assert_eq!(
            serde_json::to_string(&Signal::LongQuote).unwrap(),
            "\"LONG_QUOTE\""
        );
        assert_eq!(Signal::Close.to_string(), "CLOSE");
    }
}

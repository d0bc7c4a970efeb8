//! Ratio spread and rolling Z-score series.
//!
//! Undefined positions (warm-up prefix, flat windows) are `None` throughout.

use thiserror::Error;
use tracing::{debug, warn};

use crate::exchange::ExchangeError;
use crate::math::rolling_stats;

/// Reasons the signal engine could not produce a usable reading.
#[derive(Debug, Error)]
pub enum SignalError {
    #[error("Cannot compute on an empty price series")]
    EmptyInput,

    #[error("Price series length mismatch: base has {base} points, quote has {quote}")]
    LengthMismatch { base: usize, quote: usize },

    #[error("Division by zero: quote close is zero at index {index}")]
    DivisionByZero { index: usize },

    #[error("Insufficient history: have {have} points, need {need}")]
    InsufficientHistory { have: usize, need: usize },

    #[error("Z-score series has no defined values")]
    NoDefinedZScore,

    #[error("Exchange returned no candles for {symbol}")]
    NoData { symbol: String },

    #[error("Market data fetch failed for {symbol}: {source}")]
    Fetch {
        symbol: String,
        #[source]
        source: ExchangeError,
    },
}

/// Rolling Z-score together with the statistics it was derived from.
#[derive(Debug, Clone, PartialEq)]
pub struct ZScoreSeries {
    pub z: Vec<Option<f64>>,
    pub mean: Vec<Option<f64>>,
    pub std_dev: Vec<Option<f64>>,
}

impl ZScoreSeries {
    pub fn len(&self) -> usize {
        self.z.len()
    }

    pub fn is_empty(&self) -> bool {
        self.z.is_empty()
    }

    /// Z-score at the most recent index.
    pub fn latest(&self) -> Option<f64> {
        self.z.last().copied().flatten()
    }

    pub fn latest_mean(&self) -> Option<f64> {
        self.mean.last().copied().flatten()
    }

    pub fn latest_std_dev(&self) -> Option<f64> {
        self.std_dev.last().copied().flatten()
    }

    pub fn defined_count(&self) -> usize {
        self.z.iter().filter(|z| z.is_some()).count()
    }
}

/// Elementwise `base / quote`.
///
/// Every quote close is checked, not only the latest one: a zero anywhere
/// would leak into every rolling window that covers it.
pub fn compute_spread(base_closes: &[f64], quote_closes: &[f64]) -> Result<Vec<f64>, SignalError> {
    if base_closes.is_empty() || quote_closes.is_empty() {
        return Err(SignalError::EmptyInput);
    }
    if base_closes.len() != quote_closes.len() {
        return Err(SignalError::LengthMismatch {
            base: base_closes.len(),
            quote: quote_closes.len(),
        });
    }
    if let Some(index) = quote_closes.iter().position(|q| *q == 0.0) {
        return Err(SignalError::DivisionByZero { index });
    }

    let spread: Vec<f64> = base_closes
        .iter()
        .zip(quote_closes)
        .map(|(b, q)| b / q)
        .collect();

    let (min, max) = spread
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), s| {
            (lo.min(*s), hi.max(*s))
        });
    debug!(
        min,
        max,
        latest = spread[spread.len() - 1],
        "Spread computed"
    );

    Ok(spread)
}

/// Rolling Z-score of `spread` over a trailing `window`.
///
/// A window whose sample standard deviation is exactly zero yields `None`
/// at that index and a data-quality warning.
pub fn compute_z_score(spread: &[f64], window: usize) -> Result<ZScoreSeries, SignalError> {
    if spread.is_empty() {
        return Err(SignalError::EmptyInput);
    }
    if spread.len() < window {
        return Err(SignalError::InsufficientHistory {
            have: spread.len(),
            need: window,
        });
    }

    let stats = rolling_stats(spread, window);

    let mut zero_std = 0usize;
    let z: Vec<Option<f64>> = spread
        .iter()
        .zip(&stats)
        .map(|(value, stat)| {
            let stat = (*stat)?;
            if stat.std_dev == 0.0 {
                zero_std += 1;
                return None;
            }
            Some((value - stat.mean) / stat.std_dev)
        })
        .collect();

    if zero_std > 0 {
        warn!(
            flat_windows = zero_std,
            window,
            "Rolling std is zero (flat or stale prices); Z-score left undefined"
        );
    }

    Ok(ZScoreSeries {
        z,
        mean: stats.iter().map(|s| s.map(|s| s.mean)).collect(),
        std_dev: stats.iter().map(|s| s.map(|s| s.std_dev)).collect(),
    })
}

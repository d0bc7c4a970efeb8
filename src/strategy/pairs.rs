//! Pairs signal engine.
//!
//! Fetches both legs, builds the ratio spread and its rolling Z-score, and
//! maps the latest reading to a `Signal`. Any failure degrades to an invalid
//! `Hold` result so the caller never has to care which stage broke.

use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info, warn};

use super::spread::{compute_spread, compute_z_score, SignalError};
use super::Signal;
use crate::config::BotConfig;
use crate::exchange::{Granularity, MarketDataSource};

/// Entry / exit Z-score levels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalThresholds {
    /// |Z| strictly above this opens a position.
    pub entry: f64,
    /// Level whose crossing closes a position.
    pub exit: f64,
}

/// Everything the engine needs from the bot configuration.
#[derive(Debug, Clone)]
pub struct StrategySettings {
    pub base_symbol: String,
    pub quote_symbol: String,
    pub granularity: Granularity,
    pub lookback: usize,
    pub rolling_window: usize,
    pub thresholds: SignalThresholds,
}

impl From<&BotConfig> for StrategySettings {
    fn from(config: &BotConfig) -> Self {
        Self {
            base_symbol: config.base_symbol.clone(),
            quote_symbol: config.quote_symbol.clone(),
            granularity: config.timeframe,
            lookback: config.lookback,
            rolling_window: config.rolling_window,
            thresholds: SignalThresholds {
                entry: config.entry_threshold,
                exit: config.exit_threshold,
            },
        }
    }
}

/// Snapshot of one strategy evaluation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategyResult {
    pub signal: Signal,
    pub z_score: Option<f64>,
    pub spread: f64,
    pub rolling_mean: f64,
    pub rolling_std: f64,
    pub base_close: f64,
    pub quote_close: f64,
    pub is_data_valid: bool,
    pub error_message: Option<String>,
}

impl StrategyResult {
    /// `Hold` result for a failed evaluation. `closes` are the latest
    /// observed closes when the fetch itself succeeded.
    pub fn invalid(error: &SignalError, closes: Option<(f64, f64)>) -> Self {
        let (base_close, quote_close) = closes.unwrap_or((0.0, 0.0));
        Self {
            signal: Signal::Hold,
            z_score: None,
            spread: 0.0,
            rolling_mean: 0.0,
            rolling_std: 0.0,
            base_close,
            quote_close,
            is_data_valid: false,
            error_message: Some(error.to_string()),
        }
    }
}

/// Map the current reading (and its history) to a signal.
///
/// Entry checks run first; the exit check looks for the two most recent
/// defined readings sitting strictly on opposite sides of `thresholds.exit`.
/// `history` is expected to end with `current_z`.
pub fn determine_signal(
    current_z: Option<f64>,
    history: &[Option<f64>],
    thresholds: SignalThresholds,
) -> Signal {
    let Some(current) = current_z else {
        warn!("Current Z-score is undefined - insufficient data for a signal");
        return Signal::Hold;
    };

    if current > thresholds.entry {
        info!(
            "Z-score {:.4} > entry threshold {:.2} -> {}",
            current,
            thresholds.entry,
            Signal::LongQuote
        );
        return Signal::LongQuote;
    }

    if current < -thresholds.entry {
        info!(
            "Z-score {:.4} < -entry threshold {:.2} -> {}",
            current,
            thresholds.entry,
            Signal::LongBase
        );
        return Signal::LongBase;
    }

    let exit = thresholds.exit;
    if let Some(previous) = history.iter().rev().filter_map(|z| *z).nth(1) {
        let crossed = (previous > exit && exit > current) || (previous < exit && exit < current);
        if crossed {
            info!(
                "Z-score crossed exit level {:.2} ({:.4} -> {:.4}) -> {}",
                exit,
                previous,
                current,
                Signal::Close
            );
            return Signal::Close;
        }
    }

    info!("Z-score {:.4} within bounds -> {}", current, Signal::Hold);
    Signal::Hold
}

/// Produces one `StrategyResult` per call from live market data.
pub struct PairsSignalEngine {
    source: Arc<dyn MarketDataSource>,
    settings: StrategySettings,
}

impl PairsSignalEngine {
    pub fn new(config: &BotConfig, source: Arc<dyn MarketDataSource>) -> Self {
        Self::with_settings(StrategySettings::from(config), source)
    }

    pub fn with_settings(settings: StrategySettings, source: Arc<dyn MarketDataSource>) -> Self {
        Self { source, settings }
    }

    pub fn settings(&self) -> &StrategySettings {
        &self.settings
    }

    /// Fetch both legs and evaluate. Never fails: problems become an
    /// invalid `Hold` result.
    pub async fn get_signal(&self) -> StrategyResult {
        info!("--- Strategy cycle starting ---");

        let fetched = async {
            let base = self.fetch_closes(&self.settings.base_symbol).await?;
            let quote = self.fetch_closes(&self.settings.quote_symbol).await?;
            Ok::<_, SignalError>((base, quote))
        }
        .await;

        let (base, quote) = match fetched {
            Ok(closes) => closes,
            Err(e) => {
                error!(error = %e, "Data fetch failed for one or both symbols; returning HOLD");
                return StrategyResult::invalid(&e, None);
            }
        };

        match self.evaluate_closes(&base, &quote) {
            Ok(result) => result,
            Err(e) => {
                error!(error = %e, "Signal computation failed; returning HOLD");
                let latest = base.last().copied().zip(quote.last().copied());
                StrategyResult::invalid(&e, latest)
            }
        }
    }

    /// Pure evaluation of two aligned close series.
    pub fn evaluate_closes(&self, base: &[f64], quote: &[f64]) -> Result<StrategyResult, SignalError> {
        let spread = compute_spread(base, quote)?;
        let z_series = compute_z_score(&spread, self.settings.rolling_window)?;

        if z_series.defined_count() == 0 {
            return Err(SignalError::NoDefinedZScore);
        }

        let z_score = z_series.latest();
        let result_spread = spread[spread.len() - 1];
        let rolling_mean = z_series.latest_mean().unwrap_or(0.0);
        let rolling_std = z_series.latest_std_dev().unwrap_or(0.0);
        let base_close = base[base.len() - 1];
        let quote_close = quote[quote.len() - 1];

        info!(
            base_close,
            quote_close,
            spread = result_spread,
            mean = rolling_mean,
            std = rolling_std,
            z_score = z_score.unwrap_or(f64::NAN),
            "Latest values"
        );

        let signal = determine_signal(z_score, &z_series.z, self.settings.thresholds);
        info!(signal = %signal, "Signal generated");

        Ok(StrategyResult {
            signal,
            z_score,
            spread: result_spread,
            rolling_mean,
            rolling_std,
            base_close,
            quote_close,
            is_data_valid: true,
            error_message: None,
        })
    }

    async fn fetch_closes(&self, symbol: &str) -> Result<Vec<f64>, SignalError> {
        let candles = self
            .source
            .fetch_candles(symbol, self.settings.granularity, self.settings.lookback)
            .await
            .map_err(|e| {
                e.report("fetch_candles", symbol);
                SignalError::Fetch {
                    symbol: symbol.to_string(),
                    source: e,
                }
            })?;

        if candles.is_empty() {
            warn!(symbol, "Exchange returned an empty OHLCV list");
            return Err(SignalError::NoData {
                symbol: symbol.to_string(),
            });
        }

        Ok(candles.iter().map(|c| c.close).collect())
    }
}

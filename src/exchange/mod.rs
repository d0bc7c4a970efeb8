//! Exchange Abstraction Layer
//!
//! This module provides exchange-agnostic traits for market data, order
//! execution and balance queries. The trading core only ever talks to these
//! traits, so the live Binance client and the paper executor are
//! interchangeable.

pub mod binance;
pub mod paper;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{error, warn};

// Re-export shared types for convenience
pub use crate::types::{AppEnv, OrderSide};

pub use binance::BinanceClient;
pub use paper::PaperExecutor;

/// Exchange-agnostic candle data
#[derive(Debug, Clone, PartialEq)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Unified granularity enum (maps to exchange-specific values)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    OneMinute,
    ThreeMinute,
    FiveMinute,
    FifteenMinute,
    ThirtyMinute,
    OneHour,
    TwoHour,
    FourHour,
    SixHour,
    EightHour,
    TwelveHour,
    OneDay,
}

impl Granularity {
    /// Interval string as used by Binance kline endpoints (e.g. "15m").
    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::OneMinute => "1m",
            Granularity::ThreeMinute => "3m",
            Granularity::FiveMinute => "5m",
            Granularity::FifteenMinute => "15m",
            Granularity::ThirtyMinute => "30m",
            Granularity::OneHour => "1h",
            Granularity::TwoHour => "2h",
            Granularity::FourHour => "4h",
            Granularity::SixHour => "6h",
            Granularity::EightHour => "8h",
            Granularity::TwelveHour => "12h",
            Granularity::OneDay => "1d",
        }
    }
}

impl std::fmt::Display for Granularity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Granularity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "1m" => Ok(Granularity::OneMinute),
            "3m" => Ok(Granularity::ThreeMinute),
            "5m" => Ok(Granularity::FiveMinute),
            "15m" => Ok(Granularity::FifteenMinute),
            "30m" => Ok(Granularity::ThirtyMinute),
            "1h" => Ok(Granularity::OneHour),
            "2h" => Ok(Granularity::TwoHour),
            "4h" => Ok(Granularity::FourHour),
            "6h" => Ok(Granularity::SixHour),
            "8h" => Ok(Granularity::EightHour),
            "12h" => Ok(Granularity::TwelveHour),
            "1d" => Ok(Granularity::OneDay),
            _ => Err(format!(
                "Unknown timeframe: {}. Valid options: 1m, 3m, 5m, 15m, 30m, 1h, 2h, 4h, 6h, 8h, 12h, 1d",
                s
            )),
        }
    }
}

/// Failure classes reported by exchange collaborators.
///
/// The split matters for logging only: transient failures are warnings and
/// everything is retried on the next cycle either way.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ExchangeError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Insufficient funds: {0}")]
    InsufficientFunds(String),

    #[error("Invalid order: {0}")]
    InvalidOrder(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Exchange error: {0}")]
    Exchange(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl ExchangeError {
    /// Whether the failure is expected to clear up on its own.
    pub fn is_transient(&self) -> bool {
        matches!(self, ExchangeError::Network(_) | ExchangeError::RateLimited(_))
    }

    /// Log this failure at the severity its class deserves.
    pub fn report(&self, operation: &str, symbol: &str) {
        match self {
            e if e.is_transient() => {
                warn!(operation, symbol, error = %e, "Transient exchange failure - will retry next cycle");
            }
            ExchangeError::Unexpected(_) => {
                error!(operation, symbol, error = %self, "CRITICAL: Unexpected exchange failure");
            }
            _ => {
                error!(operation, symbol, error = %self, "Exchange request failed");
            }
        }
    }
}

/// Acknowledgement for an accepted market order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderAck {
    pub order_id: String,
    pub status: String,
}

/// API credentials for signed endpoints.
#[derive(Clone)]
pub struct ExchangeCredentials {
    pub api_key: String,
    pub api_secret: String,
}

impl ExchangeCredentials {
    /// `None` unless both parts are non-empty.
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Option<Self> {
        let api_key = api_key.into().trim().to_string();
        let api_secret = api_secret.into().trim().to_string();
        if api_key.is_empty() || api_secret.is_empty() {
            return None;
        }
        Some(Self {
            api_key,
            api_secret,
        })
    }
}

impl std::fmt::Debug for ExchangeCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExchangeCredentials")
            .field("api_key", &"<redacted>")
            .field("api_secret", &"<redacted>")
            .finish()
    }
}

/// Source of historical candles.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Fetch up to `limit` most recent candles, oldest first.
    async fn fetch_candles(
        &self,
        symbol: &str,
        granularity: Granularity,
        limit: usize,
    ) -> Result<Vec<Candle>, ExchangeError>;
}

/// Order placement and balance queries.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrderExecutor: Send + Sync {
    /// Market buy spending `quote_notional` of the quote currency.
    async fn market_buy(&self, symbol: &str, quote_notional: Decimal)
        -> Result<OrderAck, ExchangeError>;

    /// Market sell of `quantity` units of the base asset.
    async fn market_sell(&self, symbol: &str, quantity: Decimal)
        -> Result<OrderAck, ExchangeError>;

    /// Free (unlocked) balance of a single asset, e.g. "BTC".
    async fn free_balance(&self, asset: &str) -> Result<Decimal, ExchangeError>;

    /// Largest quantity of `balance` the venue accepts in a sell of `symbol`.
    /// Zero when the balance is below the smallest tradable lot.
    async fn sellable_quantity(
        &self,
        _symbol: &str,
        balance: Decimal,
    ) -> Result<Decimal, ExchangeError> {
        Ok(balance)
    }
}

/// Asset traded by a `BASE/QUOTE` symbol, e.g. "BTC" for "BTC/USDT".
pub fn base_asset(symbol: &str) -> &str {
    symbol.split('/').next().unwrap_or(symbol).trim()
}

/// Currency a `BASE/QUOTE` symbol is priced in, e.g. "USDT" for "BTC/USDT".
pub fn quote_asset(symbol: &str) -> Option<&str> {
    symbol.split_once('/').map(|(_, quote)| quote.trim())
}

//! Binance spot REST payloads and error mapping.

use std::str::FromStr;

use chrono::DateTime;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;

use crate::exchange::{Candle, ExchangeError};

/// Error body returned by Binance on non-2xx responses.
#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    pub code: i64,
    pub msg: String,
}

/// Subset of the `POST /api/v3/order` response we care about.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub order_id: u64,
    pub status: String,
    #[serde(default)]
    pub executed_qty: Option<String>,
    #[serde(default)]
    pub cummulative_quote_qty: Option<String>,
}

/// `GET /api/v3/account` response.
#[derive(Debug, Deserialize)]
pub struct AccountResponse {
    pub balances: Vec<BalanceEntry>,
}

#[derive(Debug, Deserialize)]
pub struct BalanceEntry {
    pub asset: String,
    pub free: String,
    pub locked: String,
}

/// `GET /api/v3/exchangeInfo` response, reduced to symbol filters.
#[derive(Debug, Deserialize)]
pub struct ExchangeInfoResponse {
    pub symbols: Vec<SymbolInfo>,
}

#[derive(Debug, Deserialize)]
pub struct SymbolInfo {
    pub symbol: String,
    #[serde(default)]
    pub filters: Vec<SymbolFilter>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "filterType")]
pub enum SymbolFilter {
    #[serde(rename = "LOT_SIZE", rename_all = "camelCase")]
    LotSize { min_qty: String, step_size: String },
    #[serde(other)]
    Other,
}

/// Quantity constraints of one symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LotSize {
    pub min_qty: Decimal,
    pub step_size: Decimal,
}

impl LotSize {
    /// Floor `quantity` to a multiple of `step_size`. Anything below
    /// `min_qty` after flooring is not tradable and becomes zero.
    pub fn floor(&self, quantity: Decimal) -> Decimal {
        let floored = if self.step_size > Decimal::ZERO {
            (quantity / self.step_size).floor() * self.step_size
        } else {
            quantity
        };
        if floored <= Decimal::ZERO || floored < self.min_qty {
            Decimal::ZERO
        } else {
            floored.normalize()
        }
    }
}

impl SymbolInfo {
    /// The LOT_SIZE filter, if the exchange listed one.
    pub fn lot_size(&self) -> Result<Option<LotSize>, ExchangeError> {
        for filter in &self.filters {
            if let SymbolFilter::LotSize { min_qty, step_size } = filter {
                return Ok(Some(LotSize {
                    min_qty: decimal_field(min_qty, "minQty")?,
                    step_size: decimal_field(step_size, "stepSize")?,
                }));
            }
        }
        Ok(None)
    }
}

fn decimal_field(raw: &str, name: &str) -> Result<Decimal, ExchangeError> {
    Decimal::from_str(raw)
        .map_err(|e| ExchangeError::Unexpected(format!("Invalid {} '{}': {}", name, raw, e)))
}

/// "BTC/USDT" or "BTC-USDT" -> "BTCUSDT"
pub fn to_exchange_symbol(symbol: &str) -> String {
    symbol
        .chars()
        .filter(|c| *c != '/' && *c != '-')
        .collect::<String>()
        .to_uppercase()
}

/// Parse one kline row: `[open_time_ms, "open", "high", "low", "close", "volume", ...]`.
pub fn parse_kline(row: &[Value]) -> Result<Candle, ExchangeError> {
    if row.len() < 6 {
        return Err(ExchangeError::Unexpected(format!(
            "Kline row has {} fields, expected at least 6",
            row.len()
        )));
    }

    let open_time = row[0]
        .as_i64()
        .ok_or_else(|| ExchangeError::Unexpected(format!("Invalid kline open time: {}", row[0])))?;
    let timestamp = DateTime::from_timestamp_millis(open_time).ok_or_else(|| {
        ExchangeError::Unexpected(format!("Kline open time out of range: {}", open_time))
    })?;

    Ok(Candle {
        timestamp,
        open: numeric_field(&row[1], "open")?,
        high: numeric_field(&row[2], "high")?,
        low: numeric_field(&row[3], "low")?,
        close: numeric_field(&row[4], "close")?,
        volume: numeric_field(&row[5], "volume")?,
    })
}

fn numeric_field(value: &Value, name: &str) -> Result<f64, ExchangeError> {
    let parsed = match value {
        Value::String(s) => s.parse::<f64>().ok(),
        Value::Number(n) => n.as_f64(),
        _ => None,
    };
    parsed
        .filter(|v| v.is_finite())
        .ok_or_else(|| ExchangeError::Unexpected(format!("Invalid kline {}: {}", name, value)))
}

/// Map a non-2xx response to an `ExchangeError`.
///
/// HTTP status decides first for throttling, auth and server-side outages;
/// the Binance error code decides the rest.
pub fn classify_api_error(status: u16, body: &str) -> ExchangeError {
    let parsed = serde_json::from_str::<ApiErrorBody>(body).ok();
    let detail = parsed
        .as_ref()
        .map(|e| format!("{} (code {})", e.msg, e.code))
        .unwrap_or_else(|| format!("HTTP {}: {}", status, body.trim()));

    match status {
        418 | 429 => return ExchangeError::RateLimited(detail),
        401 => return ExchangeError::Authentication(detail),
        500..=599 => return ExchangeError::Network(detail),
        _ => {}
    }

    let Some(api_error) = parsed else {
        return ExchangeError::Exchange(detail);
    };

    match api_error.code {
        -2010 if api_error.msg.to_lowercase().contains("insufficient") => {
            ExchangeError::InsufficientFunds(detail)
        }
        -1003 => ExchangeError::RateLimited(detail),
        -2008 | -2014 | -2015 | -1022 => ExchangeError::Authentication(detail),
        -2010 | -1013 | -1199..=-1100 => ExchangeError::InvalidOrder(detail),
        _ => ExchangeError::Exchange(detail),
    }
}

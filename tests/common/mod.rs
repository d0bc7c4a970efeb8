//! Scripted collaborators shared by the integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use pairpilot::exchange::{
    Candle, ExchangeError, Granularity, MarketDataSource, OrderAck, OrderExecutor,
};
use pairpilot::notify::Notifier;
use rust_decimal::Decimal;

/// Base closes whose last ratio Z-score (window 20, quote flat at 50) is 2.460521.
pub const WIDENING_BASE: [f64; 20] = [
    100.0, 102.0, 101.0, 103.0, 99.0, 104.0, 98.0, 105.0, 97.0, 106.0, 100.0, 102.0, 101.0, 103.0,
    99.0, 104.0, 98.0, 105.0, 97.0, 110.0,
];

pub fn candles(closes: &[f64]) -> Vec<Candle> {
    closes
        .iter()
        .enumerate()
        .map(|(i, close)| Candle {
            timestamp: Utc
                .timestamp_opt(1_700_000_000 + i as i64 * 900, 0)
                .unwrap(),
            open: *close,
            high: *close,
            low: *close,
            close: *close,
            volume: 1.0,
        })
        .collect()
}

/// Serves queued close series per symbol; the last queued series repeats.
#[derive(Default)]
pub struct ScriptedSource {
    series: Mutex<HashMap<String, VecDeque<Result<Vec<f64>, ExchangeError>>>>,
}

impl ScriptedSource {
    pub fn push(&self, symbol: &str, closes: Result<Vec<f64>, ExchangeError>) {
        self.series
            .lock()
            .unwrap()
            .entry(symbol.to_string())
            .or_default()
            .push_back(closes);
    }
}

#[async_trait]
impl MarketDataSource for ScriptedSource {
    async fn fetch_candles(
        &self,
        symbol: &str,
        _granularity: Granularity,
        limit: usize,
    ) -> Result<Vec<Candle>, ExchangeError> {
        let mut series = self.series.lock().unwrap();
        let queue = series.get_mut(symbol).expect("no script for symbol");
        let next = if queue.len() > 1 {
            queue.pop_front().unwrap()
        } else {
            queue.front().cloned().unwrap()
        };
        next.map(|closes| {
            let start = closes.len().saturating_sub(limit);
            candles(&closes[start..])
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Buy(String, Decimal),
    Sell(String, Decimal),
    Balance(String),
}

/// Executor with scripted outcomes that records every call.
#[derive(Default)]
pub struct ScriptedExecutor {
    pub calls: Mutex<Vec<Call>>,
    pub balance: Mutex<Option<Result<Decimal, ExchangeError>>>,
    pub fail_orders: Mutex<Option<ExchangeError>>,
}

impl ScriptedExecutor {
    pub fn with_balance(balance: Decimal) -> Self {
        let executor = Self::default();
        *executor.balance.lock().unwrap() = Some(Ok(balance));
        executor
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn order_outcome(&self) -> Result<OrderAck, ExchangeError> {
        match self.fail_orders.lock().unwrap().clone() {
            Some(e) => Err(e),
            None => Ok(OrderAck {
                order_id: format!("scripted-{}", self.calls.lock().unwrap().len()),
                status: "FILLED".to_string(),
            }),
        }
    }
}

#[async_trait]
impl OrderExecutor for ScriptedExecutor {
    async fn market_buy(
        &self,
        symbol: &str,
        quote_notional: Decimal,
    ) -> Result<OrderAck, ExchangeError> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::Buy(symbol.to_string(), quote_notional));
        self.order_outcome()
    }

    async fn market_sell(&self, symbol: &str, quantity: Decimal) -> Result<OrderAck, ExchangeError> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::Sell(symbol.to_string(), quantity));
        self.order_outcome()
    }

    async fn free_balance(&self, asset: &str) -> Result<Decimal, ExchangeError> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::Balance(asset.to_string()));
        self.balance
            .lock()
            .unwrap()
            .clone()
            .unwrap_or(Ok(Decimal::ZERO))
    }
}

/// Collects notification texts.
#[derive(Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, text: &str) {
        self.messages.lock().unwrap().push(text.to_string());
    }
}

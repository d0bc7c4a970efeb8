//! Trade Recording System
//!
//! Provides a pluggable `TradeRecorder` trait for journaling executed orders:
//! - CSV (paper trading journal)
//! - Structured logs via tracing

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::strategy::Signal;
use crate::types::OrderSide;

/// Error type for trade recording operations
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Background write task failed: {0}")]
    Task(String),
}

/// A single executed order.
#[derive(Debug, Clone)]
pub struct TradeRecord {
    /// Unique trade identifier
    pub trade_id: String,
    pub timestamp: DateTime<Utc>,
    /// Trading pair (e.g., "BTC/USDT")
    pub symbol: String,
    pub side: OrderSide,
    /// Quote currency spent for buys, base quantity sold for sells.
    pub amount: Decimal,
    /// Exchange order id (`paper-<uuid>` for simulated fills)
    pub order_id: String,
    /// Signal that triggered the order
    pub signal: Signal,
    pub z_score: Option<f64>,
    pub is_paper: bool,
}

impl TradeRecord {
    /// Create a new trade record with explicit timestamp (deterministic).
    #[allow(clippy::too_many_arguments)]
    pub fn with_timestamp(
        symbol: impl Into<String>,
        side: OrderSide,
        amount: Decimal,
        order_id: impl Into<String>,
        signal: Signal,
        z_score: Option<f64>,
        is_paper: bool,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            trade_id: uuid::Uuid::new_v4().to_string(),
            timestamp,
            symbol: symbol.into(),
            side,
            amount,
            order_id: order_id.into(),
            signal,
            z_score,
            is_paper,
        }
    }

    /// Format as CSV line.
    pub fn to_csv_line(&self) -> String {
        format!(
            "{},{},{},{},{},{},{},{},{}",
            self.trade_id,
            self.timestamp.to_rfc3339(),
            self.symbol,
            self.side.as_exchange_str(),
            self.amount,
            self.order_id,
            self.signal,
            self.z_score.map(|z| format!("{:.4}", z)).unwrap_or_default(),
            self.is_paper,
        )
    }

    /// CSV header
    pub fn csv_header() -> &'static str {
        "trade_id,timestamp,symbol,side,amount,order_id,signal,z_score,is_paper"
    }
}

/// Trait for recording trades to various backends
#[async_trait]
pub trait TradeRecorder: Send + Sync {
    /// Record a trade.
    async fn record(&self, trade: &TradeRecord) -> Result<(), RecordError>;

    /// Flush any buffered records (optional, default no-op)
    async fn flush(&self) -> Result<(), RecordError> {
        Ok(())
    }
}

/// A recorder that fans out to multiple backends
pub struct MultiRecorder {
    recorders: Vec<Box<dyn TradeRecorder>>,
}

impl MultiRecorder {
    pub fn new(recorders: Vec<Box<dyn TradeRecorder>>) -> Self {
        Self { recorders }
    }

    pub fn add(&mut self, recorder: Box<dyn TradeRecorder>) {
        self.recorders.push(recorder);
    }

    pub fn len(&self) -> usize {
        self.recorders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recorders.is_empty()
    }
}

#[async_trait]
impl TradeRecorder for MultiRecorder {
    async fn record(&self, trade: &TradeRecord) -> Result<(), RecordError> {
        let mut error_count = 0;
        let mut last_error = None;

        for recorder in &self.recorders {
            if let Err(e) = recorder.record(trade).await {
                tracing::error!(error = %e, "Failed to record trade to backend");
                last_error = Some(e);
                error_count += 1;
            }
        }

        // Only an error when every backend failed
        if error_count > 0 && error_count == self.recorders.len() {
            if let Some(e) = last_error {
                return Err(e);
            }
        }

        Ok(())
    }

    async fn flush(&self) -> Result<(), RecordError> {
        for recorder in &self.recorders {
            recorder.flush().await?;
        }
        Ok(())
    }
}

//! Tracing-based Trade Recorder
//!
//! Emits one structured event per executed order on the `trades` target.

use super::recorder::{RecordError, TradeRecord, TradeRecorder};
use async_trait::async_trait;
use tracing::info;

/// Recorder that emits structured tracing logs
#[derive(Debug, Default)]
pub struct TracingRecorder;

impl TracingRecorder {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TradeRecorder for TracingRecorder {
    async fn record(&self, trade: &TradeRecord) -> Result<(), RecordError> {
        info!(
            target: "trades",
            trade_type = "EXECUTED",
            trade_id = %trade.trade_id,
            timestamp = %trade.timestamp.to_rfc3339(),
            symbol = %trade.symbol,
            side = trade.side.as_exchange_str(),
            amount = %trade.amount,
            order_id = %trade.order_id,
            signal = %trade.signal,
            z_score = trade.z_score.unwrap_or(f64::NAN),
            is_paper = trade.is_paper,
            "Trade executed"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::Signal;
    use crate::types::OrderSide;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_tracing_recorder_does_not_error() {
        let recorder = TracingRecorder::new();
        let trade = TradeRecord::with_timestamp(
            "ETH/USDT",
            OrderSide::Sell,
            dec!(1.0),
            "12345",
            Signal::LongBase,
            Some(-2.1),
            false,
            Utc::now(),
        );
        recorder.record(&trade).await.unwrap();
    }
}

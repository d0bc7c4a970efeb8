//! Paper trading executor.
//!
//! Real market data, fake order execution: every order is logged and
//! reported as accepted without any network call, and balance queries return
//! a configured fake balance so the sell path behaves as it would live.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use rust_decimal::Decimal;
use tracing::info;

use crate::exchange::{ExchangeError, OrderAck, OrderExecutor};

/// Status reported for simulated fills.
pub const SIMULATED_STATUS: &str = "SIMULATED";

/// Simulated executor. Never fails.
#[derive(Debug)]
pub struct PaperExecutor {
    fake_balance: Decimal,
    simulated_orders: AtomicU64,
}

impl PaperExecutor {
    pub fn new(fake_balance: Decimal) -> Self {
        Self {
            fake_balance,
            simulated_orders: AtomicU64::new(0),
        }
    }

    /// Number of orders simulated so far.
    pub fn simulated_orders(&self) -> u64 {
        self.simulated_orders.load(Ordering::Relaxed)
    }

    fn ack(&self) -> OrderAck {
        self.simulated_orders.fetch_add(1, Ordering::Relaxed);
        OrderAck {
            order_id: format!("paper-{}", uuid::Uuid::new_v4()),
            status: SIMULATED_STATUS.to_string(),
        }
    }
}

#[async_trait]
impl OrderExecutor for PaperExecutor {
    async fn market_buy(
        &self,
        symbol: &str,
        quote_notional: Decimal,
    ) -> Result<OrderAck, ExchangeError> {
        info!(
            "[DRY RUN] Simulated market order: MARKET BUY | symbol={} | spend={:.2} | no real order was placed.",
            symbol, quote_notional
        );
        Ok(self.ack())
    }

    async fn market_sell(&self, symbol: &str, quantity: Decimal) -> Result<OrderAck, ExchangeError> {
        info!(
            "[DRY RUN] Simulated market order: MARKET SELL | symbol={} | qty={:.8} | no real order was placed.",
            symbol, quantity
        );
        Ok(self.ack())
    }

    async fn free_balance(&self, asset: &str) -> Result<Decimal, ExchangeError> {
        info!(
            "[DRY RUN] Providing fake balance | currency={} | fake_balance={:.2}",
            asset, self.fake_balance
        );
        Ok(self.fake_balance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_paper_orders_always_succeed() {
        let executor = PaperExecutor::new(dec!(99));

        let buy = executor.market_buy("BTC/USDT", dec!(150)).await.unwrap();
        assert_eq!(buy.status, SIMULATED_STATUS);
        assert!(buy.order_id.starts_with("paper-"));

        let sell = executor.market_sell("BTC/USDT", dec!(0.0025)).await.unwrap();
        assert_ne!(buy.order_id, sell.order_id);
        assert_eq!(executor.simulated_orders(), 2);
    }

    #[tokio::test]
    async fn test_paper_balance_is_configured_fake_value() {
        let executor = PaperExecutor::new(dec!(99));
        assert_eq!(executor.free_balance("ETH").await.unwrap(), dec!(99));
        assert_eq!(executor.simulated_orders(), 0);
    }
}

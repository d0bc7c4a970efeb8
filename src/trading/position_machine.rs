//! Position state machine.
//!
//! `plan` is the pure transition table; `PositionStateMachine::transition`
//! carries out the planned action against the executor and only moves the
//! state once the exchange accepted the order.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{error, info, warn};

use crate::config::BotConfig;
use crate::exchange::{base_asset, OrderAck, OrderExecutor};
use crate::logging::{TradeRecord, TradeRecorder};
use crate::metrics;
use crate::notify::{buy_message, sell_message, Notifier};
use crate::state::PositionState;
use crate::strategy::{Leg, Signal, StrategyResult};
use crate::types::OrderSide;

/// What a `(state, signal)` pair asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    None,
    Enter(Leg),
    Exit(Leg),
}

/// Transition table.
///
/// While holding, the opposite entry signal exits the held leg; the new leg
/// is only entered on a later cycle.
pub fn plan(state: PositionState, signal: Signal) -> Action {
    match (state, signal) {
        (PositionState::Flat, Signal::LongBase) => Action::Enter(Leg::Base),
        (PositionState::Flat, Signal::LongQuote) => Action::Enter(Leg::Quote),
        (PositionState::Flat, Signal::Close | Signal::Hold) => Action::None,

        (PositionState::HoldingBase, Signal::Close | Signal::LongQuote) => Action::Exit(Leg::Base),
        (PositionState::HoldingBase, Signal::LongBase | Signal::Hold) => Action::None,

        (PositionState::HoldingQuote, Signal::Close | Signal::LongBase) => {
            Action::Exit(Leg::Quote)
        }
        (PositionState::HoldingQuote, Signal::LongQuote | Signal::Hold) => Action::None,
    }
}

/// Executes planned actions and reports them.
pub struct PositionStateMachine {
    executor: Arc<dyn OrderExecutor>,
    notifier: Arc<dyn Notifier>,
    recorder: Option<Arc<dyn TradeRecorder>>,
    base_symbol: String,
    quote_symbol: String,
    notional: Decimal,
    notional_currency: String,
    paper: bool,
}

impl PositionStateMachine {
    pub fn new(
        config: &BotConfig,
        executor: Arc<dyn OrderExecutor>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            executor,
            notifier,
            recorder: None,
            base_symbol: config.base_symbol.clone(),
            quote_symbol: config.quote_symbol.clone(),
            notional: config.trade_notional,
            notional_currency: config.notional_currency().to_string(),
            paper: config.is_paper(),
        }
    }

    /// Journal every accepted order.
    #[must_use]
    pub fn with_recorder(mut self, recorder: Arc<dyn TradeRecorder>) -> Self {
        self.recorder = Some(recorder);
        self
    }

    fn symbol(&self, leg: Leg) -> &str {
        match leg {
            Leg::Base => &self.base_symbol,
            Leg::Quote => &self.quote_symbol,
        }
    }

    /// Apply `result.signal` to `state` and return the new state.
    ///
    /// Order or balance failures are logged and leave `state` unchanged, so
    /// the same action is attempted again on the next cycle.
    pub async fn transition(&self, state: PositionState, result: &StrategyResult) -> PositionState {
        let next = match plan(state, result.signal) {
            Action::None => {
                info!(
                    "No action: state={} signal={} (conditions not met)",
                    state, result.signal
                );
                return state;
            }
            Action::Enter(leg) => self.enter(state, leg, result).await,
            Action::Exit(leg) => self.exit(state, leg, result).await,
        };

        if next != state {
            info!("State transition: {} -> {}", state, next);
            metrics::record_transition(state, next);
        }
        next
    }

    async fn enter(&self, state: PositionState, leg: Leg, result: &StrategyResult) -> PositionState {
        let symbol = self.symbol(leg);
        info!(
            "{} -> buying {} for {:.2} {}",
            result.signal, symbol, self.notional, self.notional_currency
        );

        match self.executor.market_buy(symbol, self.notional).await {
            Ok(ack) => {
                metrics::record_order(symbol, OrderSide::Buy, true);
                info!(order_id = %ack.order_id, status = %ack.status, symbol, "Buy order accepted");

                let message = buy_message(
                    self.paper,
                    symbol,
                    self.notional,
                    &self.notional_currency,
                    result.signal,
                    result.z_score,
                );
                self.notifier.notify(&message).await;
                self.record(symbol, OrderSide::Buy, self.notional, &ack, result)
                    .await;

                PositionState::holding(leg)
            }
            Err(e) => {
                metrics::record_order(symbol, OrderSide::Buy, false);
                e.report("market_buy", symbol);
                state
            }
        }
    }

    async fn exit(&self, state: PositionState, leg: Leg, result: &StrategyResult) -> PositionState {
        let symbol = self.symbol(leg);
        let asset = base_asset(symbol);

        let free = match self.executor.free_balance(asset).await {
            Ok(balance) => balance,
            Err(e) => {
                e.report("free_balance", symbol);
                Decimal::ZERO
            }
        };

        let balance = if free > Decimal::ZERO {
            match self.executor.sellable_quantity(symbol, free).await {
                Ok(quantity) => quantity,
                Err(e) => {
                    e.report("sellable_quantity", symbol);
                    return state;
                }
            }
        } else {
            free
        };
        if balance < free {
            info!(free = %free, sellable = %balance, "Sell quantity rounded down to the lot size");
        }

        if balance <= Decimal::ZERO {
            // Known gap: nothing reconciles if the balance shows up later.
            error!(
                symbol,
                asset,
                "No sellable {} balance while in {} - forcing state to FLAT without an order",
                asset,
                state
            );
            return PositionState::Flat;
        }

        info!("{} -> selling {:.8} {} of {}", result.signal, balance, asset, symbol);

        match self.executor.market_sell(symbol, balance).await {
            Ok(ack) => {
                metrics::record_order(symbol, OrderSide::Sell, true);
                info!(order_id = %ack.order_id, status = %ack.status, symbol, "Sell order accepted");

                let message = sell_message(self.paper, symbol, balance, result.signal, result.z_score);
                self.notifier.notify(&message).await;
                self.record(symbol, OrderSide::Sell, balance, &ack, result)
                    .await;

                PositionState::Flat
            }
            Err(e) => {
                metrics::record_order(symbol, OrderSide::Sell, false);
                e.report("market_sell", symbol);
                state
            }
        }
    }

    async fn record(
        &self,
        symbol: &str,
        side: OrderSide,
        amount: Decimal,
        ack: &OrderAck,
        result: &StrategyResult,
    ) {
        let Some(recorder) = &self.recorder else {
            return;
        };
        let trade = TradeRecord::with_timestamp(
            symbol,
            side,
            amount,
            ack.order_id.clone(),
            result.signal,
            result.z_score,
            self.paper,
            Utc::now(),
        );
        if let Err(e) = recorder.record(&trade).await {
            warn!(error = %e, symbol, "Failed to journal trade");
        }
    }
}

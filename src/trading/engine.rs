//! Polling engine.
//!
//! One cycle = fetch and evaluate, then (for valid data only) apply the
//! signal to the position. Cycles never overlap. A panic inside a cycle is
//! contained at the loop boundary so a single bad cycle cannot stop the bot.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use thiserror::Error;
use tracing::{error, info, warn};

use super::position_machine::PositionStateMachine;
use crate::config::{BotConfig, ConfigError};
use crate::exchange::ExchangeError;
use crate::health::HealthState;
use crate::metrics;
use crate::notify::{critical_message, started_message, stopped_message, Notifier};
use crate::state::PositionState;
use crate::strategy::PairsSignalEngine;

/// Upper bound on the farewell notification.
pub const SHUTDOWN_NOTIFY_TIMEOUT: Duration = Duration::from_secs(5);

/// Failures that prevent the engine from starting.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Exchange client setup failed: {0}")]
    Exchange(#[from] ExchangeError),
}

pub struct TradingEngine {
    config: BotConfig,
    signal_engine: PairsSignalEngine,
    machine: PositionStateMachine,
    notifier: Arc<dyn Notifier>,
    health: Option<HealthState>,
}

impl TradingEngine {
    pub fn new(
        config: BotConfig,
        signal_engine: PairsSignalEngine,
        machine: PositionStateMachine,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            config,
            signal_engine,
            machine,
            notifier,
            health: None,
        }
    }

    /// Publish per-cycle status to the health endpoint.
    #[must_use]
    pub fn with_health(mut self, health: HealthState) -> Self {
        self.health = Some(health);
        self
    }

    /// Run until Ctrl-C.
    pub async fn run(self) -> Result<(), EngineError> {
        let shutdown = async {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("Interrupt received - shutting down"),
                Err(e) => {
                    error!(error = %e, "Cannot listen for Ctrl-C; running until the process is killed");
                    std::future::pending::<()>().await;
                }
            }
        };
        self.run_until(shutdown).await
    }

    /// Run until `shutdown` resolves. Shutdown is observed during the start
    /// notification and while sleeping between cycles, never in the middle
    /// of one.
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), EngineError>
    where
        F: Future<Output = ()>,
    {
        // polled from here on, so the Ctrl-C handler is live before any I/O
        tokio::pin!(shutdown);
        let mut state = PositionState::Flat;
        let mut cycle: u64 = 0;

        let interrupted = tokio::select! {
            biased;
            _ = shutdown.as_mut() => true,
            _ = self.announce_start() => false,
        };
        if interrupted {
            warn!("Interrupted during the start notification");
            self.announce_stop(state, cycle).await;
            return Ok(());
        }

        loop {
            if !self.sleep_or_shutdown(&mut shutdown).await {
                break;
            }

            cycle += 1;
            match AssertUnwindSafe(self.run_cycle(cycle, state))
                .catch_unwind()
                .await
            {
                Ok(next) => state = next,
                Err(panic) => {
                    let reason = panic_message(panic.as_ref());
                    error!(
                        cycle,
                        state = %state,
                        "CRITICAL: unhandled failure in main loop: {}",
                        reason
                    );
                    metrics::record_cycle("panicked");
                    if let Some(health) = &self.health {
                        health.record_cycle(cycle, state, None).await;
                    }
                    self.notifier
                        .notify(&critical_message(cycle, state, &reason))
                        .await;

                    // back off one extra interval before retrying
                    if !self.sleep_or_shutdown(&mut shutdown).await {
                        break;
                    }
                }
            }
        }

        self.announce_stop(state, cycle).await;
        Ok(())
    }

    /// `false` when shutdown fired first.
    async fn sleep_or_shutdown<F>(&self, shutdown: &mut std::pin::Pin<&mut F>) -> bool
    where
        F: Future<Output = ()>,
    {
        let interval = self.config.poll_interval;
        info!("Sleeping {}s until next cycle...", interval.as_secs());
        tokio::select! {
            _ = shutdown.as_mut() => false,
            _ = tokio::time::sleep(interval) => true,
        }
    }

    async fn run_cycle(&self, cycle: u64, state: PositionState) -> PositionState {
        info!("===== Cycle {} | state={} =====", cycle, state);

        let result = self.signal_engine.get_signal().await;

        let next = if result.is_data_valid {
            metrics::record_signal(result.signal, result.z_score);
            let next = self.machine.transition(state, &result).await;
            metrics::record_cycle("completed");
            next
        } else {
            warn!(
                error = result.error_message.as_deref().unwrap_or("unknown"),
                "Data invalid this cycle - skipping trading logic"
            );
            metrics::record_cycle("skipped");
            state
        };

        if let Some(health) = &self.health {
            health.record_cycle(cycle, next, Some(&result)).await;
        }

        info!("Cycle {} complete | state={}", cycle, next);
        next
    }

    async fn announce_start(&self) {
        let config = &self.config;
        if config.is_paper() {
            info!("==============================================================");
            info!("  DRY RUN MODE - paper trading, no real orders will be placed");
            info!("==============================================================");
        } else {
            warn!("==============================================================");
            warn!("  LIVE TRADING - real orders, REAL MONEY IS AT RISK");
            warn!("==============================================================");
        }
        info!(
            "Pair: {} / {} | timeframe: {} | window: {} | entry: {:.2} | exit: {:.2} | notional: {:.2} {} | poll: {}s",
            config.base_symbol,
            config.quote_symbol,
            config.timeframe,
            config.rolling_window,
            config.entry_threshold,
            config.exit_threshold,
            config.trade_notional,
            config.notional_currency(),
            config.poll_interval.as_secs()
        );

        self.notifier.notify(&started_message(config)).await;
    }

    async fn announce_stop(&self, state: PositionState, cycles: u64) {
        info!("Shutting down | final state={} | cycles run={}", state, cycles);
        if !state.is_flat() {
            warn!("Stopping while {} - the open position is left as is", state);
        }

        let farewell = stopped_message(state, cycles);
        if tokio::time::timeout(SHUTDOWN_NOTIFY_TIMEOUT, self.notifier.notify(&farewell))
            .await
            .is_err()
        {
            warn!("Shutdown notification timed out");
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

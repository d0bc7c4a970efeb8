//! Operator notifications.
//!
//! Delivery is best effort: `Notifier::notify` never fails and never blocks
//! longer than the transport timeout. Message text for every lifecycle event
//! is built here so the wording stays in one place.

mod telegram;

pub use telegram::{TelegramNotifier, DEFAULT_API_BASE};

use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::config::{BotConfig, TelegramSettings};
use crate::state::PositionState;
use crate::strategy::Signal;

/// Telegram rejects longer messages.
pub const MAX_MESSAGE_CHARS: usize = 4096;

/// Sink for operator-facing messages.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, text: &str);
}

/// Drops every message. Used when Telegram is not configured.
#[derive(Debug, Default)]
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn notify(&self, text: &str) {
        debug!(chars = text.chars().count(), "Notification skipped (no notifier configured)");
    }
}

/// Telegram notifier when both token and chat id are set, otherwise a no-op.
pub fn from_settings(settings: &TelegramSettings) -> Arc<dyn Notifier> {
    match (&settings.bot_token, &settings.chat_id) {
        (Some(token), Some(chat_id)) => match TelegramNotifier::new(token, chat_id) {
            Ok(notifier) => Arc::new(notifier),
            Err(e) => {
                warn!(error = %e, "Could not build Telegram client - notifications disabled");
                Arc::new(NoopNotifier)
            }
        },
        _ => {
            debug!("Telegram token or chat id missing - notifications disabled");
            Arc::new(NoopNotifier)
        }
    }
}

/// Cut `text` to at most `MAX_MESSAGE_CHARS` characters without splitting one.
pub fn truncate_message(text: &str) -> &str {
    match text.char_indices().nth(MAX_MESSAGE_CHARS) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}

fn dry_run_prefix(paper: bool) -> &'static str {
    if paper {
        "[DRY RUN] "
    } else {
        ""
    }
}

fn format_z(z_score: Option<f64>) -> String {
    z_score
        .map(|z| format!("{:.4}", z))
        .unwrap_or_else(|| "n/a".to_string())
}

pub fn buy_message(
    paper: bool,
    symbol: &str,
    notional: Decimal,
    currency: &str,
    signal: Signal,
    z_score: Option<f64>,
) -> String {
    format!(
        "{}BUY executed\nCoin   : {}\nAmount : {:.2} {}\nSignal : {}\nZ-score: {}",
        dry_run_prefix(paper),
        symbol,
        notional,
        currency,
        signal,
        format_z(z_score)
    )
}

pub fn sell_message(
    paper: bool,
    symbol: &str,
    quantity: Decimal,
    signal: Signal,
    z_score: Option<f64>,
) -> String {
    format!(
        "{}SELL executed\nCoin    : {}\nQty     : {:.8}\nTrigger : {}\nZ-score : {}",
        dry_run_prefix(paper),
        symbol,
        quantity,
        signal,
        format_z(z_score)
    )
}

pub fn started_message(config: &BotConfig) -> String {
    let mode = if config.is_paper() {
        "DRY RUN (paper trading)"
    } else {
        "LIVE TRADING"
    };
    format!(
        "Robot started\nPair    : {} / {}\nMode    : {}\nTF      : {}\nAmount  : {:.2} {} per trade",
        config.base_symbol,
        config.quote_symbol,
        mode,
        config.timeframe,
        config.trade_notional,
        config.notional_currency()
    )
}

pub fn critical_message(cycle: u64, state: PositionState, error: &str) -> String {
    format!(
        "CRITICAL ERROR in main loop\nCycle : {}\nState : {}\nError : {}\nBot is still running and will retry next cycle.",
        cycle, state, error
    )
}

pub fn stopped_message(state: PositionState, cycles: u64) -> String {
    format!(
        "Bot stopped by operator (interrupt)\nFinal state : {}\nCycles run  : {}",
        state, cycles
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_truncate_keeps_short_text() {
        assert_eq!(truncate_message("hello"), "hello");
    }

    #[test]
    fn test_truncate_is_char_safe() {
        let text = "é".repeat(MAX_MESSAGE_CHARS + 10);
        let cut = truncate_message(&text);
        assert_eq!(cut.chars().count(), MAX_MESSAGE_CHARS);
        assert_eq!(cut.len(), MAX_MESSAGE_CHARS * 2);

        let exact = "a".repeat(MAX_MESSAGE_CHARS);
        assert_eq!(truncate_message(&exact).len(), MAX_MESSAGE_CHARS);
    }

    #[test]
    fn test_buy_message_format() {
        let msg = buy_message(
            true,
            "BTC/USDT",
            dec!(150),
            "USDT",
            Signal::LongBase,
            Some(-2.345678),
        );
        assert_eq!(
            msg,
            "[DRY RUN] BUY executed\nCoin   : BTC/USDT\nAmount : 150.00 USDT\nSignal : LONG_BASE\nZ-score: -2.3457"
        );
    }

    #[test]
    fn test_sell_message_format() {
        let msg = sell_message(false, "ETH/USDT", dec!(0.5), Signal::Close, None);
        assert_eq!(
            msg,
            "SELL executed\nCoin    : ETH/USDT\nQty     : 0.50000000\nTrigger : CLOSE\nZ-score : n/a"
        );
    }

    #[test]
    fn test_lifecycle_messages() {
        let config = BotConfig::builder().build().unwrap();
        let started = started_message(&config);
        assert!(started.starts_with("Robot started\nPair    : BTC/USDT / ETH/USDT"));
        assert!(started.contains("DRY RUN (paper trading)"));
        assert!(started.ends_with("150.00 USDT per trade"));

        assert!(critical_message(3, PositionState::Flat, "boom").contains("Cycle : 3\nState : FLAT"));
        assert_eq!(
            stopped_message(PositionState::HoldingQuote, 7),
            "Bot stopped by operator (interrupt)\nFinal state : HOLDING_QUOTE\nCycles run  : 7"
        );
    }

    #[test]
    fn test_missing_settings_yield_noop() {
        // Only checks construction succeeds without a token.
        let _notifier = from_settings(&TelegramSettings::default());
    }
}

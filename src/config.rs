//! Bot configuration.
//!
//! A single validated `BotConfig` is built once at startup (environment,
//! then CLI overrides) and handed to every component by reference.

use std::time::Duration;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use thiserror::Error;

use crate::exchange::{ExchangeCredentials, Granularity};
use crate::types::AppEnv;

pub const DEFAULT_BASE_SYMBOL: &str = "BTC/USDT";
pub const DEFAULT_QUOTE_SYMBOL: &str = "ETH/USDT";
pub const DEFAULT_LOOKBACK: usize = 100;
pub const DEFAULT_ROLLING_WINDOW: usize = 20;
pub const DEFAULT_ENTRY_THRESHOLD: f64 = 2.0;
pub const DEFAULT_EXIT_THRESHOLD: f64 = 0.0;
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 300;

/// Errors raised while assembling or validating configuration.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Invalid value for {var}: '{value}' ({reason})")]
    InvalidValue {
        var: String,
        value: String,
        reason: String,
    },

    #[error("Invalid symbol '{0}': expected ASSET/QUOTE, e.g. BTC/USDT")]
    InvalidSymbol(String),

    #[error("Base and quote symbols must differ (both are {0})")]
    DuplicateSymbols(String),

    #[error("Rolling window must be at least 2, got {0}")]
    InvalidWindow(usize),

    #[error("Lookback ({lookback}) must be at least the rolling window ({window})")]
    LookbackTooShort { lookback: usize, window: usize },

    #[error("Entry threshold must be a positive finite number, got {0}")]
    InvalidEntryThreshold(f64),

    #[error("Exit threshold {exit} must lie strictly between -{entry} and {entry}")]
    InvalidExitThreshold { exit: f64, entry: f64 },

    #[error("Trade notional must be positive, got {0}")]
    InvalidNotional(Decimal),

    #[error("Paper fake balance cannot be negative, got {0}")]
    InvalidFakeBalance(Decimal),

    #[error("Poll interval must be positive")]
    InvalidPollInterval,

    #[error("Live trading requires BINANCE_API_KEY and BINANCE_API_SECRET")]
    MissingCredentials,
}

/// Optional Telegram delivery settings.
#[derive(Clone, Default, PartialEq)]
pub struct TelegramSettings {
    pub bot_token: Option<String>,
    pub chat_id: Option<String>,
}

impl TelegramSettings {
    /// Both token and chat id present.
    pub fn is_configured(&self) -> bool {
        self.bot_token.is_some() && self.chat_id.is_some()
    }
}

impl std::fmt::Debug for TelegramSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramSettings")
            .field("bot_token", &self.bot_token.as_ref().map(|_| "<redacted>"))
            .field("chat_id", &self.chat_id)
            .finish()
    }
}

/// Validated runtime configuration.
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub base_symbol: String,
    pub quote_symbol: String,
    pub timeframe: Granularity,
    /// Candles requested per symbol each cycle
    pub lookback: usize,
    pub rolling_window: usize,
    pub entry_threshold: f64,
    pub exit_threshold: f64,
    /// Quote currency spent per entry
    pub trade_notional: Decimal,
    pub poll_interval: Duration,
    pub env: AppEnv,
    /// Balance reported by the paper executor
    pub paper_fake_balance: Decimal,
    pub credentials: Option<ExchangeCredentials>,
    pub telegram: TelegramSettings,
}

impl BotConfig {
    pub fn builder() -> BotConfigBuilder {
        BotConfigBuilder::default()
    }

    /// Environment-only configuration.
    pub fn from_env() -> Result<Self, ConfigError> {
        BotConfigBuilder::from_env()?.build()
    }

    pub fn is_paper(&self) -> bool {
        self.env.is_paper()
    }

    /// Currency the trade notional is denominated in ("USDT" for "BTC/USDT").
    pub fn notional_currency(&self) -> &str {
        crate::exchange::quote_asset(&self.base_symbol).unwrap_or("USDT")
    }
}

/// Builder for `BotConfig`. Starts from the documented defaults.
#[derive(Debug, Clone)]
pub struct BotConfigBuilder {
    base_symbol: String,
    quote_symbol: String,
    timeframe: Granularity,
    lookback: usize,
    rolling_window: usize,
    entry_threshold: f64,
    exit_threshold: f64,
    trade_notional: Decimal,
    poll_interval: Duration,
    env: AppEnv,
    paper_fake_balance: Decimal,
    credentials: Option<ExchangeCredentials>,
    telegram: TelegramSettings,
}

impl Default for BotConfigBuilder {
    fn default() -> Self {
        Self {
            base_symbol: DEFAULT_BASE_SYMBOL.to_string(),
            quote_symbol: DEFAULT_QUOTE_SYMBOL.to_string(),
            timeframe: Granularity::FifteenMinute,
            lookback: DEFAULT_LOOKBACK,
            rolling_window: DEFAULT_ROLLING_WINDOW,
            entry_threshold: DEFAULT_ENTRY_THRESHOLD,
            exit_threshold: DEFAULT_EXIT_THRESHOLD,
            trade_notional: dec!(150),
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            env: AppEnv::Paper,
            paper_fake_balance: dec!(99),
            credentials: None,
            telegram: TelegramSettings::default(),
        }
    }
}

impl BotConfigBuilder {
    /// Defaults overridden by process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns. Blank values count
    /// as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut builder = Self::default();

        if let Some(v) = get("PAIRPILOT_BASE_SYMBOL") {
            builder.base_symbol = v;
        }
        if let Some(v) = get("PAIRPILOT_QUOTE_SYMBOL") {
            builder.quote_symbol = v;
        }
        if let Some(v) = get("PAIRPILOT_TIMEFRAME") {
            builder.timeframe = v
                .parse()
                .map_err(|reason| invalid("PAIRPILOT_TIMEFRAME", &v, reason))?;
        }
        if let Some(v) = get("PAIRPILOT_LOOKBACK") {
            builder.lookback = parse_var("PAIRPILOT_LOOKBACK", &v)?;
        }
        if let Some(v) = get("PAIRPILOT_ROLLING_WINDOW") {
            builder.rolling_window = parse_var("PAIRPILOT_ROLLING_WINDOW", &v)?;
        }
        if let Some(v) = get("PAIRPILOT_ENTRY_THRESHOLD") {
            builder.entry_threshold = parse_var("PAIRPILOT_ENTRY_THRESHOLD", &v)?;
        }
        if let Some(v) = get("PAIRPILOT_EXIT_THRESHOLD") {
            builder.exit_threshold = parse_var("PAIRPILOT_EXIT_THRESHOLD", &v)?;
        }
        if let Some(v) = get("PAIRPILOT_TRADE_NOTIONAL") {
            builder.trade_notional = parse_var("PAIRPILOT_TRADE_NOTIONAL", &v)?;
        }
        if let Some(v) = get("PAIRPILOT_POLL_INTERVAL_SECS") {
            builder.poll_interval =
                Duration::from_secs(parse_var("PAIRPILOT_POLL_INTERVAL_SECS", &v)?);
        }
        if let Some(v) = get("DRY_RUN") {
            builder.env = parse_dry_run(&v);
        }
        if let Some(v) = get("DRY_RUN_FAKE_BALANCE") {
            builder.paper_fake_balance = parse_var("DRY_RUN_FAKE_BALANCE", &v)?;
        }
        if let (Some(key), Some(secret)) = (get("BINANCE_API_KEY"), get("BINANCE_API_SECRET")) {
            builder.credentials = ExchangeCredentials::new(key, secret);
        }
        builder.telegram = TelegramSettings {
            bot_token: get("TELEGRAM_BOT_TOKEN"),
            chat_id: get("TELEGRAM_CHAT_ID"),
        };

        Ok(builder)
    }

    pub fn base_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.base_symbol = symbol.into();
        self
    }

    pub fn quote_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.quote_symbol = symbol.into();
        self
    }

    pub fn timeframe(mut self, timeframe: Granularity) -> Self {
        self.timeframe = timeframe;
        self
    }

    pub fn lookback(mut self, lookback: usize) -> Self {
        self.lookback = lookback;
        self
    }

    pub fn rolling_window(mut self, window: usize) -> Self {
        self.rolling_window = window;
        self
    }

    pub fn entry_threshold(mut self, threshold: f64) -> Self {
        self.entry_threshold = threshold;
        self
    }

    pub fn exit_threshold(mut self, threshold: f64) -> Self {
        self.exit_threshold = threshold;
        self
    }

    pub fn trade_notional(mut self, notional: Decimal) -> Self {
        self.trade_notional = notional;
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn env(mut self, env: AppEnv) -> Self {
        self.env = env;
        self
    }

    pub fn paper_fake_balance(mut self, balance: Decimal) -> Self {
        self.paper_fake_balance = balance;
        self
    }

    pub fn credentials(mut self, credentials: Option<ExchangeCredentials>) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn telegram(mut self, telegram: TelegramSettings) -> Self {
        self.telegram = telegram;
        self
    }

    /// Validate and freeze.
    pub fn build(self) -> Result<BotConfig, ConfigError> {
        let base_symbol = normalize_symbol(&self.base_symbol)?;
        let quote_symbol = normalize_symbol(&self.quote_symbol)?;
        if base_symbol == quote_symbol {
            return Err(ConfigError::DuplicateSymbols(base_symbol));
        }

        if self.rolling_window < 2 {
            return Err(ConfigError::InvalidWindow(self.rolling_window));
        }
        if self.lookback < self.rolling_window {
            return Err(ConfigError::LookbackTooShort {
                lookback: self.lookback,
                window: self.rolling_window,
            });
        }

        let entry = self.entry_threshold;
        if !entry.is_finite() || entry <= 0.0 {
            return Err(ConfigError::InvalidEntryThreshold(entry));
        }
        let exit = self.exit_threshold;
        if !exit.is_finite() || exit >= entry || exit <= -entry {
            return Err(ConfigError::InvalidExitThreshold { exit, entry });
        }

        if self.trade_notional <= Decimal::ZERO {
            return Err(ConfigError::InvalidNotional(self.trade_notional));
        }
        if self.paper_fake_balance < Decimal::ZERO {
            return Err(ConfigError::InvalidFakeBalance(self.paper_fake_balance));
        }
        if self.poll_interval.is_zero() {
            return Err(ConfigError::InvalidPollInterval);
        }
        if !self.env.is_paper() && self.credentials.is_none() {
            return Err(ConfigError::MissingCredentials);
        }

        Ok(BotConfig {
            base_symbol,
            quote_symbol,
            timeframe: self.timeframe,
            lookback: self.lookback,
            rolling_window: self.rolling_window,
            entry_threshold: entry,
            exit_threshold: exit,
            trade_notional: self.trade_notional,
            poll_interval: self.poll_interval,
            env: self.env,
            paper_fake_balance: self.paper_fake_balance,
            credentials: self.credentials,
            telegram: self.telegram,
        })
    }
}

/// Paper trading unless the value is exactly "false" (any case).
pub fn parse_dry_run(value: &str) -> AppEnv {
    if value.trim().eq_ignore_ascii_case("false") {
        AppEnv::Live
    } else {
        AppEnv::Paper
    }
}

fn normalize_symbol(raw: &str) -> Result<String, ConfigError> {
    let symbol = raw.trim().to_uppercase();
    let well_formed = match symbol.split_once('/') {
        Some((asset, quote)) => {
            !asset.is_empty()
                && !quote.is_empty()
                && !quote.contains('/')
                && !symbol.contains(char::is_whitespace)
        }
        None => false,
    };
    if well_formed {
        Ok(symbol)
    } else {
        Err(ConfigError::InvalidSymbol(raw.to_string()))
    }
}

fn parse_var<T>(var: &str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e: T::Err| invalid(var, value, e.to_string()))
}

fn invalid(var: &str, value: &str, reason: String) -> ConfigError {
    ConfigError::InvalidValue {
        var: var.to_string(),
        value: value.to_string(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = BotConfig::builder().build().unwrap();
        assert_eq!(config.base_symbol, "BTC/USDT");
        assert_eq!(config.quote_symbol, "ETH/USDT");
        assert_eq!(config.timeframe, Granularity::FifteenMinute);
        assert_eq!(config.lookback, 100);
        assert_eq!(config.rolling_window, 20);
        assert_eq!(config.entry_threshold, 2.0);
        assert_eq!(config.exit_threshold, 0.0);
        assert_eq!(config.trade_notional, dec!(150));
        assert_eq!(config.poll_interval, Duration::from_secs(300));
        assert!(config.is_paper());
        assert_eq!(config.paper_fake_balance, dec!(99));
        assert_eq!(config.notional_currency(), "USDT");
    }

    #[test]
    fn test_dry_run_parsing() {
        assert_eq!(parse_dry_run("false"), AppEnv::Live);
        assert_eq!(parse_dry_run("FALSE"), AppEnv::Live);
        assert_eq!(parse_dry_run(" False "), AppEnv::Live);
        assert_eq!(parse_dry_run("true"), AppEnv::Paper);
        assert_eq!(parse_dry_run("0"), AppEnv::Paper);
        assert_eq!(parse_dry_run("no"), AppEnv::Paper);
    }

    #[test]
    fn test_env_overrides() {
        let builder = BotConfigBuilder::from_lookup(lookup(&[
            ("PAIRPILOT_BASE_SYMBOL", "sol/usdt"),
            ("PAIRPILOT_TIMEFRAME", "1h"),
            ("PAIRPILOT_ROLLING_WINDOW", "30"),
            ("PAIRPILOT_ENTRY_THRESHOLD", "2.5"),
            ("PAIRPILOT_TRADE_NOTIONAL", "75.5"),
            ("PAIRPILOT_POLL_INTERVAL_SECS", "60"),
            ("DRY_RUN_FAKE_BALANCE", "0.5"),
            ("TELEGRAM_BOT_TOKEN", "123:abc"),
            ("TELEGRAM_CHAT_ID", "42"),
        ]))
        .unwrap();
        let config = builder.build().unwrap();

        assert_eq!(config.base_symbol, "SOL/USDT");
        assert_eq!(config.timeframe, Granularity::OneHour);
        assert_eq!(config.rolling_window, 30);
        assert_eq!(config.entry_threshold, 2.5);
        assert_eq!(config.trade_notional, dec!(75.5));
        assert_eq!(config.poll_interval, Duration::from_secs(60));
        assert_eq!(config.paper_fake_balance, dec!(0.5));
        assert!(config.telegram.is_configured());
    }

    #[test]
    fn test_blank_env_values_are_unset() {
        let config = BotConfigBuilder::from_lookup(lookup(&[
            ("PAIRPILOT_LOOKBACK", "  "),
            ("TELEGRAM_BOT_TOKEN", ""),
        ]))
        .unwrap()
        .build()
        .unwrap();
        assert_eq!(config.lookback, DEFAULT_LOOKBACK);
        assert!(!config.telegram.is_configured());
    }

    #[test]
    fn test_malformed_env_value_is_reported() {
        let err = BotConfigBuilder::from_lookup(lookup(&[("PAIRPILOT_LOOKBACK", "lots")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref var, .. } if var == "PAIRPILOT_LOOKBACK"));

        let err = BotConfigBuilder::from_lookup(lookup(&[("PAIRPILOT_TIMEFRAME", "7m")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_live_requires_credentials() {
        let err = BotConfigBuilder::from_lookup(lookup(&[("DRY_RUN", "false")]))
            .unwrap()
            .build()
            .unwrap_err();
        assert_eq!(err, ConfigError::MissingCredentials);

        let config = BotConfigBuilder::from_lookup(lookup(&[
            ("DRY_RUN", "false"),
            ("BINANCE_API_KEY", "k"),
            ("BINANCE_API_SECRET", "s"),
        ]))
        .unwrap()
        .build()
        .unwrap();
        assert_eq!(config.env, AppEnv::Live);
    }

    #[test]
    fn test_symbol_validation() {
        assert!(matches!(
            BotConfig::builder().base_symbol("BTCUSDT").build(),
            Err(ConfigError::InvalidSymbol(_))
        ));
        assert!(matches!(
            BotConfig::builder().quote_symbol("ETH/").build(),
            Err(ConfigError::InvalidSymbol(_))
        ));
        assert!(matches!(
            BotConfig::builder().quote_symbol("btc/usdt").build(),
            Err(ConfigError::DuplicateSymbols(_))
        ));
    }

    #[test]
    fn test_window_validation() {
        assert_eq!(
            BotConfig::builder().rolling_window(1).build().unwrap_err(),
            ConfigError::InvalidWindow(1)
        );
        assert_eq!(
            BotConfig::builder()
                .lookback(10)
                .rolling_window(20)
                .build()
                .unwrap_err(),
            ConfigError::LookbackTooShort {
                lookback: 10,
                window: 20
            }
        );
    }

    #[test]
    fn test_threshold_validation() {
        assert!(matches!(
            BotConfig::builder().entry_threshold(0.0).build(),
            Err(ConfigError::InvalidEntryThreshold(_))
        ));
        assert!(matches!(
            BotConfig::builder().entry_threshold(f64::NAN).build(),
            Err(ConfigError::InvalidEntryThreshold(_))
        ));
        assert!(matches!(
            BotConfig::builder().exit_threshold(2.0).build(),
            Err(ConfigError::InvalidExitThreshold { .. })
        ));
        assert!(matches!(
            BotConfig::builder().exit_threshold(-2.5).build(),
            Err(ConfigError::InvalidExitThreshold { .. })
        ));
        assert!(BotConfig::builder().exit_threshold(0.5).build().is_ok());
    }

    #[test]
    fn test_amount_and_interval_validation() {
        assert!(matches!(
            BotConfig::builder().trade_notional(Decimal::ZERO).build(),
            Err(ConfigError::InvalidNotional(_))
        ));
        assert!(matches!(
            BotConfig::builder().paper_fake_balance(dec!(-1)).build(),
            Err(ConfigError::InvalidFakeBalance(_))
        ));
        assert_eq!(
            BotConfig::builder()
                .poll_interval(Duration::ZERO)
                .build()
                .unwrap_err(),
            ConfigError::InvalidPollInterval
        );
    }

    #[test]
    fn test_telegram_token_is_redacted() {
        let settings = TelegramSettings {
            bot_token: Some("123:secret".into()),
            chat_id: Some("42".into()),
        };
        assert!(!format!("{:?}", settings).contains("secret"));
    }
}

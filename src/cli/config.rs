//! Bridges parsed CLI arguments onto the configuration builder.
//!
//! Flags that were not given leave the environment value in place.

use std::time::Duration;

use super::{PairArgs, SignalArgs, TradeArgs};
use crate::config::BotConfigBuilder;
use crate::types::AppEnv;

impl PairArgs {
    pub fn apply(&self, mut builder: BotConfigBuilder) -> BotConfigBuilder {
        if let Some(base) = &self.base {
            builder = builder.base_symbol(base.clone());
        }
        if let Some(quote) = &self.quote {
            builder = builder.quote_symbol(quote.clone());
        }
        if let Some(timeframe) = self.timeframe {
            builder = builder.timeframe(timeframe);
        }
        builder
    }
}

impl TradeArgs {
    /// Mode forced by `--paper` / `--live`, if either was given.
    pub fn env_override(&self) -> Option<AppEnv> {
        match (self.paper, self.live) {
            (true, _) => Some(AppEnv::Paper),
            (false, true) => Some(AppEnv::Live),
            (false, false) => None,
        }
    }

    pub fn apply(&self, builder: BotConfigBuilder) -> BotConfigBuilder {
        let mut builder = self.pair.apply(builder);
        if let Some(env) = self.env_override() {
            builder = builder.env(env);
        }
        if let Some(secs) = self.poll_interval {
            builder = builder.poll_interval(Duration::from_secs(secs));
        }
        if let Some(notional) = self.notional {
            builder = builder.trade_notional(notional);
        }
        builder
    }
}

impl SignalArgs {
    /// Read-only evaluation: always paper, so no credentials are needed.
    pub fn apply(&self, builder: BotConfigBuilder) -> BotConfigBuilder {
        self.pair.apply(builder).env(AppEnv::Paper)
    }
}

//! Position state.
//!
//! The bot holds at most one leg at a time. State lives in memory only and
//! always starts `Flat`; it is owned by the engine loop and changed solely by
//! `PositionStateMachine::transition`.

use serde::Serialize;

use crate::strategy::Leg;

/// Current holding of the pair.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PositionState {
    #[default]
    Flat,
    HoldingBase,
    HoldingQuote,
}

impl PositionState {
    /// Holding state for `leg`.
    pub fn holding(leg: Leg) -> Self {
        match leg {
            Leg::Base => PositionState::HoldingBase,
            Leg::Quote => PositionState::HoldingQuote,
        }
    }

    /// Leg currently held, if any.
    pub fn held_leg(&self) -> Option<Leg> {
        match self {
            PositionState::Flat => None,
            PositionState::HoldingBase => Some(Leg::Base),
            PositionState::HoldingQuote => Some(Leg::Quote),
        }
    }

    pub fn is_flat(&self) -> bool {
        matches!(self, PositionState::Flat)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PositionState::Flat => "FLAT",
            PositionState::HoldingBase => "HOLDING_BASE",
            PositionState::HoldingQuote => "HOLDING_QUOTE",
        }
    }
}

impl std::fmt::Display for PositionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

//! Trading loop.
//!
//! `position_machine` turns signals into orders, `engine` drives one
//! evaluation per poll interval until shutdown.

mod engine;
pub mod position_machine;

pub use engine::{EngineError, TradingEngine, SHUTDOWN_NOTIFY_TIMEOUT};
pub use position_machine::{plan, Action, PositionStateMachine};

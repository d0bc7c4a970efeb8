//! Trade journal backends.
//!
//! - `TradeRecorder` trait - Pluggable recorder interface
//! - `CsvRecorder` - Append-only CSV journal
//! - `TracingRecorder` - Structured log events
//! - `MultiRecorder` - Fan-out to several backends

pub mod csv_recorder;
pub mod recorder;
pub mod tracing_recorder;

pub use csv_recorder::{CsvRecorder, DEFAULT_JOURNAL_PATH};
pub use recorder::{MultiRecorder, RecordError, TradeRecord, TradeRecorder};
pub use tracing_recorder::TracingRecorder;

//! CSV Trade Recorder
//!
//! Appends one row per executed order. Used as the paper trading journal.

use super::recorder::{RecordError, TradeRecord, TradeRecorder};
use async_trait::async_trait;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Default journal file for paper trading.
pub const DEFAULT_JOURNAL_PATH: &str = "paper_trades.csv";

/// CSV file recorder.
///
/// File I/O runs on `spawn_blocking`.
pub struct CsvRecorder {
    file_path: Arc<PathBuf>,
    /// Serializes writes and tracks header state
    state: Arc<Mutex<CsvState>>,
}

struct CsvState {
    header_written: bool,
}

impl CsvRecorder {
    pub fn new(file_path: PathBuf) -> Self {
        Self {
            file_path: Arc::new(file_path),
            state: Arc::new(Mutex::new(CsvState {
                header_written: false,
            })),
        }
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }
}

#[async_trait]
impl TradeRecorder for CsvRecorder {
    async fn record(&self, trade: &TradeRecord) -> Result<(), RecordError> {
        let file_path = Arc::clone(&self.file_path);
        let state = Arc::clone(&self.state);
        let csv_line = trade.to_csv_line();

        tokio::task::spawn_blocking(move || {
            let mut guard = state.lock().unwrap_or_else(|e| e.into_inner());

            let mut file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&*file_path)?;

            if !guard.header_written {
                // An existing journal from an earlier run already has its header
                if file.metadata()?.len() == 0 {
                    writeln!(file, "{}", TradeRecord::csv_header())?;
                }
                guard.header_written = true;
            }

            writeln!(file, "{}", csv_line)?;
            Ok::<(), RecordError>(())
        })
        .await
        .map_err(|e| RecordError::Task(e.to_string()))??;

        Ok(())
    }
}

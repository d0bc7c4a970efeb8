//! Tracing setup: compact stdout plus a daily rolling log file.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// File name prefix of the rolling log.
pub const LOG_FILE_NAME: &str = "pairpilot.log";

/// Install the global subscriber.
///
/// stdout honours `RUST_LOG` when set, otherwise `level`. The file under
/// `log_dir` always records debug and above for this crate plus the trade
/// journal events.
///
/// # Returns
/// The file writer guard. Hold it for the lifetime of the process or
/// buffered lines may be lost.
///
/// # Errors
/// Returns error if the log directory cannot be created or a global
/// subscriber is already installed.
pub fn init_tracing(
    level: &str,
    log_dir: &Path,
) -> Result<WorkerGuard, Box<dyn std::error::Error>> {
    std::fs::create_dir_all(log_dir)?;

    let file_appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_NAME);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let stdout_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let file_filter = EnvFilter::new("pairpilot=debug,trades=info,warn");

    let stdout_layer = fmt::layer()
        .with_target(false)
        .compact()
        .with_filter(stdout_filter);

    let file_layer = fmt::layer()
        .with_writer(file_writer)
        .with_ansi(false)
        .with_target(true)
        .with_filter(file_filter);

    tracing_subscriber::registry()
        .with(stdout_layer)
        .with(file_layer)
        .try_init()?;

    Ok(guard)
}

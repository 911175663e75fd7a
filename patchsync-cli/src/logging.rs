//! Logging initialization.
//!
//! Two layers share one `EnvFilter`: a compact stderr layer and a plain-text
//! file layer at `<log dir>/patchsync.log`. `RUST_LOG` overrides the
//! configured level.

use std::fs;
use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::error::CliError;

/// Log file name inside the log directory.
pub const LOG_FILE_NAME: &str = "patchsync.log";

/// Default filter directive for the configured level.
///
/// Library and binary events both carry `patchsync::` targets.
fn filter_directive(level: &str) -> String {
    format!("patchsync={}", level)
}

fn env_filter(level: &str) -> Result<EnvFilter, CliError> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(filter_directive(level)))
        .map_err(|e| CliError::Config(format!("Failed to create log filter: {}", e)))
}

fn stderr_level(verbose: bool) -> tracing::Level {
    if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    }
}

/// Initialize stderr and file logging.
///
/// The returned guard flushes the file writer when dropped and must be kept
/// alive for the duration of the program.
pub fn init_logging(log_dir: &Path, level: &str, verbose: bool) -> Result<WorkerGuard, CliError> {
    fs::create_dir_all(log_dir).map_err(|e| {
        CliError::Config(format!(
            "Failed to create log directory {}: {}",
            log_dir.display(),
            e
        ))
    })?;

    let file_appender = tracing_appender::rolling::never(log_dir, LOG_FILE_NAME);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_writer(file_writer)
        .with_ansi(false)
        .with_target(true)
        .with_thread_names(true);

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .with_filter(tracing_subscriber::filter::LevelFilter::from_level(
            stderr_level(verbose),
        ));

    tracing_subscriber::registry()
        .with(env_filter(level)?)
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .map_err(|e| CliError::Config(format!("Failed to initialize logging: {}", e)))?;

    Ok(guard)
}

/// Initialize stderr-only logging for commands that do not touch the
/// configured log directory.
pub fn init_stderr_logging(verbose: bool) {
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(stderr_level(verbose).to_string().to_lowercase()));

    if let Err(e) = tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .try_init()
    {
        eprintln!("Warning: logging disabled: {}", e);
    }
}

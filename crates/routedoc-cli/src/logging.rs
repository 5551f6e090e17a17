//! Logging initialization and configuration.
//!
//! Logs go to stderr so stdout stays free for the run summary:
//! - **Pretty** (default): multi-line human-friendly output
//! - **Compact**: one line per event
//! - **JSON**: structured output for log collectors
//!
//! With a log directory, JSON logs are additionally written to daily rolling
//! files.

use std::path::Path;
use std::sync::OnceLock;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::cli::LogFormat;

/// Static guards to keep non-blocking writers alive.
/// These must persist for the lifetime of the program.
static FILE_GUARD: OnceLock<WorkerGuard> = OnceLock::new();
static STDERR_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Environment variable consulted when `RUST_LOG` is unset.
const LOG_LEVEL_ENV: &str = "ROUTEDOC_LOG_LEVEL";

/// File name prefix for rolling log files.
const LOG_FILE_PREFIX: &str = "routedoc";

/// Initialize the logging system.
///
/// The filter comes from `RUST_LOG`, then `ROUTEDOC_LOG_LEVEL`, then `info`.
///
/// # Errors
///
/// Returns an error if the env filter cannot be parsed or the log directory
/// cannot be created.
pub fn init(format: LogFormat, log_dir: Option<&Path>) -> anyhow::Result<()> {
    let log_level = std::env::var(LOG_LEVEL_ENV).unwrap_or_else(|_| "info".to_string());
    let env_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&log_level))?;

    let (non_blocking_stderr, stderr_guard) = tracing_appender::non_blocking(std::io::stderr());

    let stderr_layer = match format {
        LogFormat::Pretty => tracing_subscriber::fmt::layer()
            .pretty()
            .with_writer(non_blocking_stderr)
            .with_target(false)
            .with_file(false)
            .with_line_number(false)
            .boxed(),
        LogFormat::Compact => tracing_subscriber::fmt::layer()
            .compact()
            .with_writer(non_blocking_stderr)
            .with_target(true)
            .boxed(),
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_writer(non_blocking_stderr)
            .with_target(true)
            .boxed(),
    };

    let file_layer = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;

            // Rolling file appender - creates new file daily
            let file_appender = RollingFileAppender::new(Rotation::DAILY, dir, LOG_FILE_PREFIX);
            let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);
            let _ = FILE_GUARD.set(file_guard);

            Some(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(non_blocking_file)
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();

    let _ = STDERR_GUARD.set(stderr_guard);

    Ok(())
}

//! Logging utilities for Bookwise.
//!
//! Sets up a `tracing` subscriber with an env filter, an stderr fmt layer and,
//! when configured, a daily rolling log file.

use bookwise_config::LoggingConfig;
use std::str::FromStr;
use tracing::{error, info, Level};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DEFAULT_FILE_PREFIX: &str = "bookwise.log";

/// Initialize the tracing subscriber at INFO.
///
/// ```
/// use bookwise_common::logging;
///
/// logging::init();
/// // a second call is harmless
/// logging::init_with_level(tracing::Level::DEBUG);
/// ```
pub fn init() {
    init_with_level(Level::INFO);
}

/// Initialize the tracing subscriber with a specific log level.
pub fn init_with_level(level: Level) {
    let result = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(true)
                .with_file(true)
                .with_line_number(true),
        )
        .with(filter_for(level))
        .try_init();

    // try_init fails when a global subscriber is already set, which is fine
    if result.is_ok() {
        info!("Logging initialized at level: {}", level);
    }
}

/// Initialize logging from configuration.
///
/// When `directory` is set, log lines are also written to a daily rolling
/// file through a non-blocking writer. The returned guard must be kept alive
/// for as long as file output is wanted.
pub fn init_from_config(config: &LoggingConfig) -> Option<WorkerGuard> {
    let level = parse_level(config.level.as_deref());

    let Some(directory) = config.directory.as_deref() else {
        init_with_level(level);
        return None;
    };

    let prefix = config
        .file_prefix
        .as_deref()
        .unwrap_or(DEFAULT_FILE_PREFIX);
    let appender = tracing_appender::rolling::daily(directory, prefix);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let result = tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(fmt::layer().with_ansi(false).with_writer(writer))
        .with(filter_for(level))
        .try_init();

    if result.is_ok() {
        info!("Logging initialized at level: {} (files in {})", level, directory);
    }
    Some(guard)
}

/// Parses a level name, defaulting to INFO for absent or unknown values.
pub fn parse_level(level: Option<&str>) -> Level {
    level
        .and_then(|name| Level::from_str(name).ok())
        .unwrap_or(Level::INFO)
}

fn filter_for(level: Level) -> EnvFilter {
    let filter = EnvFilter::from_default_env();
    match format!("bookwise={}", level).parse() {
        Ok(directive) => filter.add_directive(directive),
        Err(_) => filter,
    }
}

/// Log a result, with different messages for success and error cases.
///
/// Returns the original result so it can be used in a chain.
pub fn log_result<T, E: std::fmt::Display>(
    result: Result<T, E>,
    success_message: &str,
    error_context: &str,
) -> Result<T, E> {
    match &result {
        Ok(_) => info!("{}", success_message),
        Err(e) => error!("{}: {}", error_context, e),
    }
    result
}

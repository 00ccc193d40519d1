//! Logging configuration
//!
//! Console output always goes to stderr so the MCP stdio transport can own
//! stdout. The full setup adds a daily-rolling file under `logs/`.

use std::path::Path;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Registry,
};

use crate::errors::Result;

fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{level},prodassist={level}")))
}

/// Initialize logging with console and daily-rolling file output
pub fn init_logging(level: &str) -> Result<()> {
    let logs_dir = Path::new("logs");
    if !logs_dir.exists() {
        std::fs::create_dir_all(logs_dir)?;
    }

    let file_appender = tracing_appender::rolling::daily("logs", "prodassist.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let console_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(std::io::stderr);

    let file_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(non_blocking)
        .with_ansi(false);

    Registry::default()
        .with(env_filter(level))
        .with(console_layer)
        .with(file_layer)
        .init();

    tracing::info!("Logging initialized with level: {}", level);

    // Keep the appender guard alive for the process lifetime
    std::mem::forget(guard);

    Ok(())
}

/// Initialize stderr-only logging.
///
/// Used by the MCP server subcommand, where stdout carries the JSON-RPC
/// stream and must stay clean.
pub fn init_stderr_logging(level: &str) -> Result<()> {
    let console_layer = fmt::layer()
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_writer(std::io::stderr);

    Registry::default()
        .with(env_filter(level))
        .with(console_layer)
        .init();

    Ok(())
}

//! Log subscriber setup.
//!
//! Output goes to the configured log file (appending, without ANSI colors)
//! or to stderr. `RUST_LOG`, when set, replaces the configured level.

use config::LogConfig;
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::error::{Result, ServerError};

/// The level actually applied for `config`.
pub fn effective_level(config: &LogConfig) -> &'static str {
    config.tracing_level().unwrap_or("info")
}

fn build_filter(config: &LogConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level(config)))
}

/// Installs the global subscriber. Fails if one is already installed.
pub fn init_logging(config: &LogConfig) -> Result<()> {
    let (writer, ansi) = match config.file() {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| {
                    ServerError::Configuration(format!(
                        "Unable to open log file '{}': {e}",
                        path.display()
                    ))
                })?;
            (BoxMakeWriter::new(Mutex::new(file)), false)
        }
        None => (BoxMakeWriter::new(std::io::stderr), true)
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(writer).with_ansi(ansi))
        .with(build_filter(config))
        .try_init()
        .map_err(|e| ServerError::Internal(format!("Failed to install log subscriber: {e}")))?;

    if !config.has_known_level() {
        tracing::error!(level = %config.level, "Unknown log level, using info");
    }
    Ok(())
}

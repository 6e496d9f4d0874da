//! # Configuration Precedence
//!
//! Merges configuration from multiple sources with precedence rules.
//!
//! # Precedence Order
//! 1. CLI arguments (highest priority)
//! 2. Environment variables
//! 3. Configuration file
//! 4. Default values (lowest priority)
//!
//! Sources and source types only ever come from the configuration file; the
//! overridable surface is the scalar settings below.

use crate::config::Config;
use std::path::PathBuf;

/// Partial configuration supplied by the environment or the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    pub address: Option<String>,
    pub port: Option<u16>,
    pub endpoint: Option<String>,
    pub log_file: Option<PathBuf>,
    pub log_level: Option<String>,
    pub request_timeout: Option<u64>,
    pub cache_update_interval: Option<u64>,
    pub cache_path: Option<PathBuf>
}

/// Merge environment and CLI overrides on top of a file configuration.
///
/// ## Usage
/// ```rust,no_run
/// use config::{Overrides, load_from_file, load_overrides_from_env, merge_overrides};
/// use std::path::Path;
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let from_file = load_from_file(Path::new("freshcve.toml"))?;
///     let _config = merge_overrides(from_file, load_overrides_from_env(), Overrides::default());
///     Ok(())
/// }
/// ```
pub fn merge_overrides(file_config: Config, env: Overrides, cli: Overrides) -> Config {
    let config = apply_with_logging(file_config, env, "env");
    apply_with_logging(config, cli, "cli")
}

fn apply_with_logging(mut base: Config, overrides: Overrides, source_name: &str) -> Config {
    let mut changes: Vec<&'static str> = Vec::new();

    if let Some(address) = overrides.address {
        base.server.address = address;
        changes.push("server.address");
    }
    if let Some(port) = overrides.port {
        base.server.port = port;
        changes.push("server.port");
    }
    if let Some(endpoint) = overrides.endpoint {
        base.server.endpoint = endpoint;
        changes.push("server.endpoint");
    }
    if let Some(file) = overrides.log_file {
        base.log.file = Some(file);
        changes.push("log.file");
    }
    if let Some(level) = overrides.log_level {
        base.log.level = level;
        changes.push("log.level");
    }
    if let Some(timeout) = overrides.request_timeout {
        base.timers.request_timeout = timeout;
        changes.push("timers.request_timeout");
    }
    if let Some(interval) = overrides.cache_update_interval {
        base.timers.cache_update_interval = interval;
        changes.push("timers.cache_update_interval");
    }
    if let Some(path) = overrides.cache_path {
        base.cache.path = path;
        changes.push("cache.path");
    }

    if !changes.is_empty() {
        tracing::debug!(source = source_name, fields = ?changes, "Applied configuration overrides");
    }

    base
}

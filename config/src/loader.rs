//! # Environment Variable Loader
//!
//! Reads configuration overrides from `FRESHCVE_*` environment variables.
//!
//! # Environment Variables
//! - `FRESHCVE_ADDRESS`: listen address
//! - `FRESHCVE_PORT`: listen port
//! - `FRESHCVE_ENDPOINT`: read endpoint path
//! - `FRESHCVE_LOG_FILE`: log file (empty means stderr)
//! - `FRESHCVE_LOG_LEVEL`: trace/debug/info/warn/error
//! - `FRESHCVE_REQUEST_TIMEOUT`: request timeout in seconds
//! - `FRESHCVE_CACHE_UPDATE_INTERVAL`: refresh interval in seconds
//! - `FRESHCVE_CACHE_PATH`: persisted snapshot file

use crate::precedence::Overrides;
use std::env;
use std::fmt;
use std::path::PathBuf;

/// An override variable that was set but could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvOverrideWarning {
    pub variable: &'static str,
    pub value: String,
    pub reason: String
}

impl EnvOverrideWarning {
    pub fn log(&self) {
        tracing::warn!(
            variable = self.variable,
            value = %self.value,
            error = %self.reason,
            "Ignoring unparsable environment override"
        );
    }
}

impl fmt::Display for EnvOverrideWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ignoring {}={:?}: {}",
            self.variable, self.value, self.reason
        )
    }
}

/// Load overrides from environment variables.
///
/// Unset variables leave the corresponding field untouched. Numeric variables
/// that do not parse are ignored with a warning rather than failing startup.
pub fn load_overrides_from_env() -> Overrides {
    let (overrides, warnings) = collect_overrides_from_env();
    for warning in &warnings {
        warning.log();
    }
    overrides
}

/// Like [`load_overrides_from_env`], but hands the warnings back instead of
/// logging them.
pub fn collect_overrides_from_env() -> (Overrides, Vec<EnvOverrideWarning>) {
    let mut warnings = Vec::new();
    let overrides = Overrides {
        address: env::var("FRESHCVE_ADDRESS").ok(),
        port: parse_env("FRESHCVE_PORT", &mut warnings),
        endpoint: env::var("FRESHCVE_ENDPOINT").ok(),
        log_file: env::var("FRESHCVE_LOG_FILE").ok().map(PathBuf::from),
        log_level: env::var("FRESHCVE_LOG_LEVEL").ok(),
        request_timeout: parse_env("FRESHCVE_REQUEST_TIMEOUT", &mut warnings),
        cache_update_interval: parse_env("FRESHCVE_CACHE_UPDATE_INTERVAL", &mut warnings),
        cache_path: env::var("FRESHCVE_CACHE_PATH").ok().map(PathBuf::from)
    };
    (overrides, warnings)
}

fn parse_env<T>(key: &'static str, warnings: &mut Vec<EnvOverrideWarning>) -> Option<T>
where
    T: std::str::FromStr,
    T::Err: fmt::Display
{
    let raw = env::var(key).ok()?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(e) => {
            warnings.push(EnvOverrideWarning {
                variable: key,
                value: raw,
                reason: e.to_string()
            });
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: &[&str] = &[
        "FRESHCVE_ADDRESS",
        "FRESHCVE_PORT",
        "FRESHCVE_ENDPOINT",
        "FRESHCVE_LOG_FILE",
        "FRESHCVE_LOG_LEVEL",
        "FRESHCVE_REQUEST_TIMEOUT",
        "FRESHCVE_CACHE_UPDATE_INTERVAL",
        "FRESHCVE_CACHE_PATH",
    ];

    fn clear_env() {
        for var in VARS {
            unsafe {
                env::remove_var(var);
            }
        }
    }

    #[test]
    #[serial]
    fn test_no_env_means_no_overrides() {
        clear_env();
        assert_eq!(load_overrides_from_env(), Overrides::default());
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        clear_env();
        unsafe {
            env::set_var("FRESHCVE_PORT", "9999");
            env::set_var("FRESHCVE_LOG_LEVEL", "debug");
            env::set_var("FRESHCVE_CACHE_PATH", "/var/lib/freshcve/cache.db");
        }

        let overrides = load_overrides_from_env();
        assert_eq!(overrides.port, Some(9999));
        assert_eq!(overrides.log_level.as_deref(), Some("debug"));
        assert_eq!(
            overrides.cache_path,
            Some(PathBuf::from("/var/lib/freshcve/cache.db"))
        );
        assert!(overrides.address.is_none());

        clear_env();
    }

    #[test]
    #[serial]
    fn test_unparsable_number_is_ignored() {
        clear_env();
        unsafe {
            env::set_var("FRESHCVE_REQUEST_TIMEOUT", "soon");
        }

        let overrides = load_overrides_from_env();
        assert!(overrides.request_timeout.is_none());

        clear_env();
    }

    #[test]
    #[serial]
    fn test_unparsable_numbers_are_collected() {
        clear_env();
        unsafe {
            env::set_var("FRESHCVE_PORT", "eighty");
            env::set_var("FRESHCVE_CACHE_UPDATE_INTERVAL", "60");
        }

        let (overrides, warnings) = collect_overrides_from_env();
        assert!(overrides.port.is_none());
        assert_eq!(overrides.cache_update_interval, Some(60));
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].variable, "FRESHCVE_PORT");
        assert_eq!(warnings[0].value, "eighty");
        assert!(warnings[0].to_string().starts_with("ignoring FRESHCVE_PORT=\"eighty\""));

        clear_env();
    }
}

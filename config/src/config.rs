//! # Configuration Structures
//!
//! This module defines the configuration structures for the freshcve
//! service.
//!
//! All configuration structures:
//! - Use `serde` for serialization/deserialization
//! - Use `validator` for input validation
//! - Default every section, so a file only needs to name its sources

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;
use validator::Validate;

/// Default request timeout applied when the configured value is absent or zero.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 2;

/// Default cache update interval applied when the configured value is absent or zero.
pub const DEFAULT_CACHE_UPDATE_INTERVAL_SECS: u64 = 3600;

/// Log levels accepted in `[log] level`. `fatal` and `panic` log at `error`.
pub const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "fatal", "panic"];

/// Main configuration structure.
///
/// ## Fields
/// - `server`: listen address and read endpoint
/// - `log`: log destination and level
/// - `timers`: request timeout and refresh interval
/// - `cache`: persisted snapshot location
/// - `sources_types`: named field mappings, keyed by type name
/// - `sources`: remote sources, each referencing one field mapping
///
/// ## Validation
/// Nested sections are validated with `validator`. Source types and sources
/// are validated when they are resolved by the feed, which reports the
/// offending entry by name.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    #[validate(nested)]
    pub server: ServerConfig,

    #[serde(default)]
    pub log: LogConfig,

    #[serde(default)]
    pub timers: TimersConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub sources_types: BTreeMap<String, SourceTypeConfig>,

    #[serde(default)]
    pub sources: Vec<SourceConfig>
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct ServerConfig {
    /// TCP address to listen on. Empty means all interfaces.
    #[serde(default)]
    pub address: String,

    /// TCP port to listen on.
    #[serde(default = "default_port")]
    #[validate(range(min = 1))]
    pub port: u16,

    /// Path of the read endpoint.
    #[serde(default = "default_endpoint")]
    #[validate(custom(function = "validate_endpoint"))]
    pub endpoint: String
}

fn default_port() -> u16 {
    8080
}

fn default_endpoint() -> String {
    "/api/v1/cves".to_string()
}

/// Paths served next to the read endpoint.
pub const RESERVED_PATHS: &[&str] = &["/health", "/metrics"];

fn validate_endpoint(value: &str) -> Result<(), validator::ValidationError> {
    if !value.starts_with('/') {
        return Err(validator::ValidationError::new("endpoint must start with '/'"));
    }
    if RESERVED_PATHS.contains(&value) {
        return Err(validator::ValidationError::new("endpoint collides with a built-in route"));
    }
    // The endpoint is registered as a literal route; parameter and wildcard
    // syntax would make the router panic.
    if value.contains(['{', '}']) || value.split('/').any(|s| s.starts_with([':', '*'])) {
        return Err(validator::ValidationError::new("endpoint must be a literal path"));
    }
    Ok(())
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: String::new(),
            port: default_port(),
            endpoint: default_endpoint()
        }
    }
}

impl ServerConfig {
    /// `host:port` string suitable for binding a listener.
    pub fn bind_addr(&self) -> String {
        let host = if self.address.is_empty() {
            "0.0.0.0"
        } else {
            self.address.as_str()
        };
        format!("{host}:{}", self.port)
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogConfig {
    /// Log file. Absent or empty means stderr.
    #[serde(default)]
    pub file: Option<PathBuf>,

    /// One of [`LOG_LEVELS`]. Anything else is reported at startup and
    /// replaced by `info`.
    #[serde(default = "default_log_level")]
    pub level: String
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            file: None,
            level: default_log_level()
        }
    }
}

impl LogConfig {
    /// Whether `level` names a known log level.
    pub fn has_known_level(&self) -> bool {
        LOG_LEVELS.contains(&self.level.as_str())
    }

    /// The `tracing` level for `level`, if it is known.
    pub fn tracing_level(&self) -> Option<&'static str> {
        match self.level.as_str() {
            "trace" => Some("trace"),
            "debug" => Some("debug"),
            "info" => Some("info"),
            "warn" => Some("warn"),
            "error" | "fatal" | "panic" => Some("error"),
            _ => None
        }
    }

    /// The configured log file, treating an empty path as "no file".
    pub fn file(&self) -> Option<&PathBuf> {
        self.file.as_ref().filter(|p| !p.as_os_str().is_empty())
    }
}

/// Refresh timers, in seconds. Zero falls back to the defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimersConfig {
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,

    #[serde(default = "default_cache_update_interval")]
    pub cache_update_interval: u64
}

fn default_request_timeout() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_cache_update_interval() -> u64 {
    DEFAULT_CACHE_UPDATE_INTERVAL_SECS
}

impl Default for TimersConfig {
    fn default() -> Self {
        Self {
            request_timeout: default_request_timeout(),
            cache_update_interval: default_cache_update_interval()
        }
    }
}

impl TimersConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(non_zero_or(
            self.request_timeout,
            DEFAULT_REQUEST_TIMEOUT_SECS
        ))
    }

    pub fn cache_update_interval(&self) -> Duration {
        Duration::from_secs(non_zero_or(
            self.cache_update_interval,
            DEFAULT_CACHE_UPDATE_INTERVAL_SECS
        ))
    }
}

fn non_zero_or(value: u64, default: u64) -> u64 {
    if value == 0 { default } else { value }
}

/// Persisted snapshot configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheConfig {
    #[serde(default = "default_cache_path")]
    pub path: PathBuf
}

fn default_cache_path() -> PathBuf {
    PathBuf::from("cache.db")
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            path: default_cache_path()
        }
    }
}

/// Field mapping from a source's JSON keys to item fields.
///
/// The capitalized aliases keep configuration files written for earlier
/// releases loading unchanged.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct SourceTypeConfig {
    #[serde(default, alias = "ID")]
    pub id: String,

    #[serde(default, alias = "Published")]
    pub published: String,

    #[serde(default, alias = "References")]
    pub references: String,

    #[serde(default, alias = "Description")]
    pub description: String
}

/// One remote source as written in the configuration file.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct SourceConfig {
    /// Display name used in logs and metrics.
    #[serde(default, alias = "description")]
    pub name: String,

    /// Base URL of the source.
    #[serde(default)]
    pub url: String,

    /// Name of an entry in `sources_types`.
    #[serde(default, rename = "type")]
    pub type_name: String,

    /// Optional query template appended to `url` on every fetch.
    #[serde(default, alias = "query_params", skip_serializing_if = "Option::is_none")]
    pub query_param: Option<String>
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.endpoint, "/api/v1/cves");
        assert_eq!(config.log.level, "info");
        assert_eq!(config.timers.request_timeout(), Duration::from_secs(2));
        assert_eq!(
            config.timers.cache_update_interval(),
            Duration::from_secs(3600)
        );
        assert_eq!(config.cache.path, PathBuf::from("cache.db"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_timers_fall_back_to_defaults() {
        let timers = TimersConfig {
            request_timeout: 0,
            cache_update_interval: 0
        };
        assert_eq!(timers.request_timeout(), Duration::from_secs(2));
        assert_eq!(timers.cache_update_interval(), Duration::from_secs(3600));
    }

    #[test]
    fn test_bind_addr_uses_all_interfaces_when_empty() {
        let mut server = ServerConfig::default();
        assert_eq!(server.bind_addr(), "0.0.0.0:8080");
        server.address = "127.0.0.1".to_string();
        server.port = 9000;
        assert_eq!(server.bind_addr(), "127.0.0.1:9000");
    }

    #[test]
    fn test_empty_log_file_means_stderr() {
        let log = LogConfig {
            file: Some(PathBuf::new()),
            level: "info".to_string()
        };
        assert!(log.file().is_none());
    }

    #[test]
    fn test_known_log_levels() {
        let mut log = LogConfig::default();
        assert!(log.has_known_level());
        log.level = "verbose".to_string();
        assert!(!log.has_known_level());
        assert!(log.tracing_level().is_none());
    }

    #[test]
    fn test_fatal_and_panic_map_to_error() {
        for level in ["fatal", "panic", "error"] {
            let log = LogConfig {
                file: None,
                level: level.to_string()
            };
            assert!(log.has_known_level());
            assert_eq!(log.tracing_level(), Some("error"));
        }
    }

    #[test]
    fn test_source_type_accepts_capitalized_keys() {
        let json = r#"{"ID": "CVE", "Published": "public_date", "References": "resource_url", "Description": "bugzilla_description"}"#;
        let mapping: SourceTypeConfig = serde_json::from_str(json).unwrap();
        assert_eq!(mapping.id, "CVE");
        assert_eq!(mapping.published, "public_date");
        assert_eq!(mapping.references, "resource_url");
        assert_eq!(mapping.description, "bugzilla_description");
    }

    #[test]
    fn test_source_config_type_rename() {
        let json = r#"{"name": "redhat source", "url": "http://x", "type": "redhat", "query_params": "?a=1"}"#;
        let source: SourceConfig = serde_json::from_str(json).unwrap();
        assert_eq!(source.type_name, "redhat");
        assert_eq!(source.query_param.as_deref(), Some("?a=1"));
    }
}

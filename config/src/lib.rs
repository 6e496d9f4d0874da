//! # Configuration System
//!
//! Configuration management for the freshcve service.
//!
//! This crate provides:
//! - Configuration structures for the server, logging, timers, the persisted
//!   cache, source types and sources
//! - Configuration file loading (TOML/YAML/JSON)
//! - Environment variable overrides
//! - Configuration precedence (CLI > env > file > defaults)
//! - Configuration validation
//! - The default configuration template

pub mod config;
pub mod defaults;
pub mod file_loader;
pub mod loader;
pub mod precedence;
pub mod validation;

pub use config::{
    CacheConfig, Config, LogConfig, ServerConfig, SourceConfig, SourceTypeConfig, TimersConfig,
};
pub use defaults::DEFAULT_CONFIG;
pub use file_loader::{ConfigFileError, ConfigFormat, load_from_file, parse_config};
pub use loader::{EnvOverrideWarning, collect_overrides_from_env, load_overrides_from_env};
pub use precedence::{Overrides, merge_overrides};
pub use validation::validate;

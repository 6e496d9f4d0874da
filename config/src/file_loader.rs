//! # Configuration File Loading
//!
//! Loads configuration from TOML, YAML or JSON files.
//!
//! Supports automatic format detection based on file extension.

use crate::config::Config;
use std::path::Path;

/// Configuration file loading error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigFileError {
    #[error("Unable to open config file: {0}")]
    FileNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    TomlParse(String),

    #[error("Failed to parse YAML: {0}")]
    YamlParse(String),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(String),

    #[error("Config file has no extension")]
    NoExtension,

    #[error("Unsupported config file format: {0}")]
    UnsupportedFormat(String)
}

/// Supported configuration file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Yaml,
    Json
}

impl ConfigFormat {
    /// Detects the format from a file extension.
    pub fn from_path(path: &Path) -> Result<Self, ConfigFileError> {
        let extension = path
            .extension()
            .and_then(|s| s.to_str())
            .ok_or(ConfigFileError::NoExtension)?;

        match extension.to_lowercase().as_str() {
            "toml" => Ok(Self::Toml),
            "yaml" | "yml" => Ok(Self::Yaml),
            "json" => Ok(Self::Json),
            other => Err(ConfigFileError::UnsupportedFormat(other.to_string()))
        }
    }
}

/// Parses configuration text in the given format.
pub fn parse_config(contents: &str, format: ConfigFormat) -> Result<Config, ConfigFileError> {
    match format {
        ConfigFormat::Toml => {
            toml::from_str(contents).map_err(|e| ConfigFileError::TomlParse(e.to_string()))
        }
        ConfigFormat::Yaml => {
            serde_yaml::from_str(contents).map_err(|e| ConfigFileError::YamlParse(e.to_string()))
        }
        ConfigFormat::Json => {
            serde_json::from_str(contents).map_err(|e| ConfigFileError::JsonParse(e.to_string()))
        }
    }
}

/// Load configuration from file with auto-detection.
///
/// ## Supported Formats
/// - `.toml`: TOML format
/// - `.yaml` / `.yml`: YAML format
/// - `.json`: JSON format
///
/// ## Usage
/// ```rust,no_run
/// use config::load_from_file;
/// use std::path::Path;
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = load_from_file(Path::new("freshcve.toml"))?;
///     println!("{} sources configured", config.sources.len());
///     Ok(())
/// }
/// ```
///
/// ## Error Handling
/// Returns `ConfigFileError` for:
/// - File not found
/// - Invalid or unsupported file extension
/// - Parse errors for detected format
pub fn load_from_file(path: &Path) -> Result<Config, ConfigFileError> {
    let format = ConfigFormat::from_path(path)?;

    let contents = std::fs::read_to_string(path)
        .map_err(|e| ConfigFileError::FileNotFound(format!("{}: {e}", path.display())))?;

    parse_config(&contents, format)
}

//! # freshcve Errors
//!
//! Error taxonomy shared by the configuration, feed and server crates.
//!
//! - Uses `thiserror` for structured error definitions
//! - Named fields everywhere so log lines carry the offending source or path
//! - Each enum matches one propagation policy: configuration errors abort
//!   startup, everything else is contained to a source, a record or a file

use std::path::PathBuf;
use thiserror::Error;

/// Invalid configuration. Fatal at startup, never raised once serving.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Source type '{type_name}' configuration error: field '{field}' must not be empty")]
    IncompleteSourceType {
        type_name: String,
        field: &'static str
    },

    #[error("Source '{source_name}' configuration error: no source type configured")]
    MissingSourceType { source_name: String },

    #[error("Source '{source_name}' configuration error: unknown source type '{type_name}'")]
    UnknownSourceType {
        source_name: String,
        type_name: String
    },

    #[error("Source '{source_name}' configuration error: url must not be empty")]
    MissingSourceUrl { source_name: String },

    #[error("Source '{source_name}' is configured more than once")]
    DuplicateSource { source_name: String },

    #[error("Source '{source_name}' configuration error: incorrect 'query_param' value: {reason}")]
    InvalidQueryTemplate { source_name: String, reason: String },

    #[error("Wrong query param syntax in '{template}': {reason}")]
    MalformedTemplate { template: String, reason: String }
}

/// Failure of one source during a refresh cycle.
///
/// The source contributes nothing to the cycle; sibling sources are unaffected.
#[derive(Debug, Error)]
pub enum SourceFetchError {
    #[error("Failed to get data from source '{source_name}' ({url}): {reason}")]
    Transport {
        source_name: String,
        url: String,
        reason: String
    },

    #[error("Source '{source_name}' ({url}) did not answer within {timeout_ms}ms")]
    Timeout {
        source_name: String,
        url: String,
        timeout_ms: u64
    },

    #[error("Source '{source_name}' ({url}) returned status {status}: {body}")]
    Status {
        source_name: String,
        url: String,
        status: u16,
        body: String
    },

    #[error("Failed to parse data from source '{source_name}' ({url}): {reason}")]
    Decode {
        source_name: String,
        url: String,
        reason: String
    }
}

impl SourceFetchError {
    /// Name of the configured source that failed.
    pub fn source_name(&self) -> &str {
        match self {
            Self::Transport { source_name, .. }
            | Self::Timeout { source_name, .. }
            | Self::Status { source_name, .. }
            | Self::Decode { source_name, .. } => source_name
        }
    }

    /// Short label used for metrics and structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transport { .. } => "transport",
            Self::Timeout { .. } => "timeout",
            Self::Status { .. } => "status",
            Self::Decode { .. } => "decode"
        }
    }
}

/// A single record that could not be turned into an item.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RecordDecodeError {
    #[error("Record {index} from source '{source_name}' has no '{field}' field")]
    MissingId {
        source_name: String,
        index: usize,
        field: String
    },

    #[error("Record {index} from source '{source_name}' has an unusable '{field}' value: {found}")]
    InvalidId {
        source_name: String,
        index: usize,
        field: String,
        found: String
    }
}

/// Reading or writing the persisted snapshot file.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("Error to open file with cached data '{}': {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error
    },

    #[error("Unable to parse cache data from file '{}': {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error
    },

    #[error("Error to write cached data to '{}': {source}", .path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error
    },

    #[error("Unable to encode cache data for '{}': {source}", .path.display())]
    Encode {
        path: PathBuf,
        source: serde_json::Error
    }
}

/// Misuse of the refresh cycle protocol on the snapshot cache.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CacheError {
    #[error("A refresh cycle is already in progress")]
    CycleInProgress,

    #[error("No refresh cycle is in progress")]
    NoActiveCycle
}

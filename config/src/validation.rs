//! # Configuration Validation
//!
//! Validates the scalar configuration sections using the `validator` crate.

use crate::config::Config;
use validator::Validate;

/// Validate configuration structure.
///
/// ## Validation Rules
/// ### Server
/// - `port`: 1-65535
/// - `endpoint`: a literal path starting with `/`, other than `/health` and
///   `/metrics`. Route parameters (`{id}`, `:id`) and wildcards (`*rest`)
///   are rejected.
///
/// Source types and sources are checked when the feed resolves them, so a
/// bad mapping is reported by name instead of as a field path.
pub fn validate(config: &Config) -> Result<(), validator::ValidationErrors> {
    config.validate()
}

//! The normalized item every source record is mapped into.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One tracked entry (for example a vulnerability advisory).
///
/// `published`, `references` and `description` are passed through from the
/// source payload untouched; they may be strings, lists, objects or null.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Deduplication key, never empty.
    pub id: String,
    /// Base URL of the source the item came from.
    pub source: String,
    #[serde(default)]
    pub published: Value,
    #[serde(default)]
    pub references: Value,
    #[serde(default)]
    pub description: Value
}

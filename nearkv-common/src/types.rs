//! Shared protocol types and defaults.

use serde::{Deserialize, Serialize};

use crate::value::IndexValue;

/// Well-known TCP port of the index server.
pub const DEFAULT_PORT: u16 = 7586;

/// Default edit-distance bound for fuzzy lookups.
pub const DEFAULT_MAX_EDIT_DISTANCE: u32 = 3;

/// Default exact-prefix length for fuzzy and near lookups.
pub const DEFAULT_MIN_EXACT_PREFIX: u32 = 2;

/// One candidate returned by a fuzzy or near lookup.
///
/// Ordering within a result set is decided by the server and preserved as
/// received; the client never re-sorts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    /// Candidate key.
    pub key: String,
    /// Edit distance between the candidate and the queried key.
    pub distance: u32,
    /// Raw wire value stored under the candidate key, empty when the server
    /// did not attach one.
    pub raw_value: Vec<u8>,
}

impl Match {
    /// Decodes the attached value with the shared value-decode rule.
    ///
    /// Returns `None` when no value was attached.
    pub fn value(&self) -> Option<IndexValue> {
        if self.raw_value.is_empty() {
            return None;
        }
        Some(IndexValue::decode(&self.raw_value))
    }
}

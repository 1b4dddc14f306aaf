use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Settings for walking logical changes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// File extensions that can never be test files.
    pub skip_extensions: BTreeSet<String>,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            skip_extensions: ["h", "cpp", "rs"].into_iter().map(String::from).collect(),
        }
    }
}

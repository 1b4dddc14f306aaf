use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Configuration for a [`TestTopology`](crate::TestTopology).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// File names treated as build declarations.
    pub declaration_names: BTreeSet<String>,
    /// Manifest file names whose latest content handle is buffered while
    /// walking diffs, so resolving them needs no tree lookup.
    pub tracked_manifest_names: BTreeSet<String>,
    /// Parsed files kept in memory before the parse cache is flushed.
    pub parse_cache_capacity: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            declaration_names: ["moz.build"].into_iter().map(String::from).collect(),
            tracked_manifest_names: ["mochitest.ini", "reftest.list", "crashtest.list"]
                .into_iter()
                .map(String::from)
                .collect(),
            parse_cache_capacity: 8192,
        }
    }
}

impl ResolverConfig {
    pub fn is_declaration(&self, file_name: &str) -> bool {
        self.declaration_names.contains(file_name)
    }

    pub fn is_tracked_manifest(&self, file_name: &str) -> bool {
        self.tracked_manifest_names.contains(file_name)
    }
}

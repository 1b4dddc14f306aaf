use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use testtopo_types::{ChangeKind, SuiteKind};

/// Suites touched by a change, per status.
///
/// Only additions and modifications are tracked; deletions never classify.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuiteChanges {
    pub added: BTreeSet<SuiteKind>,
    pub modified: BTreeSet<SuiteKind>,
}

impl SuiteChanges {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, kind: ChangeKind) -> Option<&BTreeSet<SuiteKind>> {
        match kind {
            ChangeKind::Added => Some(&self.added),
            ChangeKind::Modified => Some(&self.modified),
            ChangeKind::Deleted => None,
        }
    }

    /// Record `suite` under `kind`. Deletions are ignored.
    pub fn insert(&mut self, kind: ChangeKind, suite: SuiteKind) -> bool {
        match kind {
            ChangeKind::Added => self.added.insert(suite),
            ChangeKind::Modified => self.modified.insert(suite),
            ChangeKind::Deleted => false,
        }
    }

    pub fn contains(&self, kind: ChangeKind, suite: SuiteKind) -> bool {
        self.get(kind).is_some_and(|suites| suites.contains(&suite))
    }

    pub fn extend(&mut self, other: &SuiteChanges) {
        self.added.extend(other.added.iter().copied());
        self.modified.extend(other.modified.iter().copied());
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.modified.is_empty()
    }

    /// Every suite touched under any status.
    pub fn suites(&self) -> BTreeSet<SuiteKind> {
        self.added.union(&self.modified).copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deletions_are_never_recorded() {
        let mut changes = SuiteChanges::new();
        assert!(!changes.insert(ChangeKind::Deleted, SuiteKind::Reftest));
        assert!(changes.is_empty());
        assert!(changes.get(ChangeKind::Deleted).is_none());
    }

    #[test]
    fn extend_and_union() {
        let mut a = SuiteChanges::new();
        a.insert(ChangeKind::Added, SuiteKind::Mochitest);
        let mut b = SuiteChanges::new();
        b.insert(ChangeKind::Modified, SuiteKind::Reftest);
        b.insert(ChangeKind::Added, SuiteKind::Mochitest);
        a.extend(&b);
        assert!(a.contains(ChangeKind::Added, SuiteKind::Mochitest));
        assert!(a.contains(ChangeKind::Modified, SuiteKind::Reftest));
        assert_eq!(a.suites().len(), 2);
    }

    #[test]
    fn serializes_kebab_case_suites() {
        let mut changes = SuiteChanges::new();
        changes.insert(ChangeKind::Added, SuiteKind::WebPlatformTests);
        let json = serde_json::to_string(&changes).unwrap();
        assert_eq!(json, r#"{"added":["web-platform-tests"],"modified":[]}"#);
    }
}

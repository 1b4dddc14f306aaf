//! State owned by one build-declaration file.

use std::collections::{BTreeMap, BTreeSet};

use testtopo_diff::{PathChange, TreeDiff};
use testtopo_types::{ChangeKind, SuiteKind};
use tracing::debug;

use crate::context::ResolveContext;
use crate::error::ResolverResult;
use crate::suite::SuiteState;

/// The suites one build declaration exports.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeclarationState {
    path: String,
    suites: BTreeMap<SuiteKind, SuiteState>,
}

impl DeclarationState {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            suites: BTreeMap::new(),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn suites(&self) -> &BTreeMap<SuiteKind, SuiteState> {
        &self.suites
    }

    pub fn suite(&self, kind: SuiteKind) -> Option<&SuiteState> {
        self.suites.get(&kind)
    }

    pub fn is_empty(&self) -> bool {
        self.suites.is_empty()
    }

    /// Whether any owned suite needs a recompute for `diff`.
    pub fn affected_by(&self, diff: &TreeDiff) -> bool {
        self.suites.values().any(|suite| suite.affected_by(diff))
    }

    /// Bring this declaration up to date with one diff.
    ///
    /// `change` is the diff entry for the declaration file itself, if any.
    /// Returns the suite kinds whose contribution changed.
    pub(crate) fn update(
        &mut self,
        change: Option<&PathChange>,
        ctx: &mut ResolveContext<'_>,
    ) -> ResolverResult<BTreeSet<SuiteKind>> {
        let mut updated = BTreeSet::new();
        let mut fresh = BTreeSet::new();

        match change.map(|c| (c.kind, c.new_id)) {
            Some((ChangeKind::Deleted, _)) | Some((_, None)) => {
                updated.extend(self.suites.keys().copied());
                self.suites.clear();
                debug!(path = %self.path, "declaration removed");
                return Ok(updated);
            }
            Some((_, Some(id))) => {
                let declared = ctx.declaration(&self.path, &id)?;
                let mut next = BTreeMap::new();
                for (kind, manifests) in declared {
                    let manifests: BTreeSet<String> = manifests.into_iter().collect();
                    match self.suites.remove(&kind) {
                        Some(existing) if existing.manifests() == &manifests => {
                            next.insert(kind, existing);
                        }
                        _ => {
                            let Some(mut state) = SuiteState::new(kind.format(), manifests) else {
                                continue;
                            };
                            state.recompute(ctx)?;
                            next.insert(kind, state);
                            updated.insert(kind);
                            fresh.insert(kind);
                        }
                    }
                }
                // Whatever is left was dropped from the declaration.
                updated.extend(self.suites.keys().copied());
                self.suites = next;
            }
            None => {}
        }

        for (kind, suite) in self.suites.iter_mut() {
            if fresh.contains(kind) || !suite.affected_by(ctx.diff) {
                continue;
            }
            if suite.recompute(ctx)? {
                updated.insert(*kind);
            }
        }

        if !updated.is_empty() {
            debug!(path = %self.path, updated = ?updated, "declaration updated");
        }
        Ok(updated)
    }
}

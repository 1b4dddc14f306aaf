//! The top-level resolver that walks commits and answers classify queries.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use testtopo_diff::{diff_trees, PathsByKind, TreeDiff};
use testtopo_manifest::Resolution;
use testtopo_store::ObjectStore;
use testtopo_types::{path, ObjectId, SuiteKind};
use tracing::{debug, trace};

use crate::cache::{ParseCache, RawObjectCache};
use crate::changes::SuiteChanges;
use crate::config::ResolverConfig;
use crate::context::ResolveContext;
use crate::declaration::DeclarationState;
use crate::diagnostics::DiagnosticSink;
use crate::error::ResolverResult;
use crate::matcher::SuiteMatcher;

/// Declaration states replaced by one update; `None` removes the entry.
struct Staged {
    replacements: BTreeMap<String, Option<DeclarationState>>,
    updated: BTreeSet<SuiteKind>,
}

/// Incrementally maintained map from build declarations to suite matchers.
///
/// A topology is advanced one commit at a time with [`update`](Self::update).
/// Consecutive commits need not be related: each update diffs the tree it
/// was last advanced to against the new one. Updates are all-or-nothing; if
/// one fails the topology still describes the previous commit.
pub struct TestTopology {
    store: Arc<dyn ObjectStore>,
    config: ResolverConfig,
    sink: Arc<dyn DiagnosticSink>,
    commit: Option<ObjectId>,
    tree: Option<ObjectId>,
    declarations: BTreeMap<String, DeclarationState>,
    raw: RawObjectCache,
    parsed: ParseCache,
    summaries: BTreeMap<SuiteKind, Resolution>,
    matchers: BTreeMap<SuiteKind, SuiteMatcher>,
}

impl TestTopology {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        config: ResolverConfig,
        sink: Arc<dyn DiagnosticSink>,
    ) -> Self {
        let matchers = SuiteKind::ALL
            .into_iter()
            .filter_map(|kind| SuiteMatcher::fixed(kind).map(|m| (kind, m)))
            .collect();
        Self {
            raw: RawObjectCache::new(config.tracked_manifest_names.clone()),
            parsed: ParseCache::new(config.parse_cache_capacity),
            store,
            config,
            sink,
            commit: None,
            tree: None,
            declarations: BTreeMap::new(),
            summaries: BTreeMap::new(),
            matchers,
        }
    }

    /// Advance to `commit_id`. Returns the suites whose aggregate was rebuilt.
    pub fn update(&mut self, commit_id: &ObjectId) -> ResolverResult<BTreeSet<SuiteKind>> {
        let commit = self.store.read_commit(commit_id)?;
        let diff = diff_trees(&*self.store, self.tree.as_ref(), Some(&commit.tree))?;
        let staged = self.stage(&commit.tree, &diff)?;
        let updated = staged.updated.clone();
        self.apply(*commit_id, commit.tree, &diff, staged);
        debug!(
            commit = %commit_id.short_hex(),
            changed = diff.len(),
            updated = ?updated,
            "topology advanced"
        );
        Ok(updated)
    }

    /// Compute every replacement state without touching `self`'s view.
    ///
    /// Only the parse cache is written here; its entries are keyed by
    /// content, so they stay valid whether or not the update completes.
    fn stage(&mut self, root: &ObjectId, diff: &TreeDiff) -> ResolverResult<Staged> {
        let mut ctx = ResolveContext {
            store: &*self.store,
            root,
            diff,
            raw: &self.raw,
            parsed: &mut self.parsed,
            sink: &*self.sink,
        };
        let mut replacements = BTreeMap::new();
        let mut updated = BTreeSet::new();

        for (repo_path, change) in diff.iter() {
            if !self.config.is_declaration(path::file_name(repo_path)) {
                continue;
            }
            let mut state = match self.declarations.get(repo_path) {
                Some(existing) => existing.clone(),
                None if change.new_id.is_none() => continue,
                None => DeclarationState::new(repo_path),
            };
            updated.extend(state.update(Some(change), &mut ctx)?);
            replacements.insert(repo_path.to_string(), (!state.is_empty()).then_some(state));
        }

        for (repo_path, state) in &self.declarations {
            if replacements.contains_key(repo_path) || !state.affected_by(diff) {
                continue;
            }
            let mut state = state.clone();
            updated.extend(state.update(None, &mut ctx)?);
            replacements.insert(repo_path.clone(), Some(state));
        }

        trace!(
            replaced = replacements.len(),
            parse_hits = ctx.parsed.hits(),
            parse_misses = ctx.parsed.misses(),
            "staged update"
        );
        Ok(Staged {
            replacements,
            updated,
        })
    }

    /// Swap staged state in. Cannot fail.
    fn apply(&mut self, commit: ObjectId, tree: ObjectId, diff: &TreeDiff, staged: Staged) {
        for (repo_path, replacement) in staged.replacements {
            match replacement {
                Some(state) => {
                    self.declarations.insert(repo_path, state);
                }
                None => {
                    self.declarations.remove(&repo_path);
                }
            }
        }
        self.raw.apply(diff);

        for kind in staged.updated {
            let mut resolution = Resolution::default();
            let mut manifests = BTreeSet::new();
            let mut exported = false;
            for suite in self.declarations.values().filter_map(|d| d.suite(kind)) {
                exported = true;
                resolution.merge(suite.resolution().clone());
                manifests.extend(suite.manifests().iter().cloned());
                manifests.extend(suite.included().into_iter().flatten().cloned());
            }
            if exported {
                self.matchers
                    .insert(kind, SuiteMatcher::build(kind, &resolution, &manifests));
                self.summaries.insert(kind, resolution);
            } else {
                self.matchers.remove(&kind);
                self.summaries.remove(&kind);
            }
        }

        self.commit = Some(commit);
        self.tree = Some(tree);
    }

    /// Which suites the changed paths touch, per status.
    ///
    /// Deleted paths never classify. A suite already recorded under a status
    /// in `exclude` is not tested again for that status.
    pub fn classify(&self, paths: &PathsByKind, exclude: &SuiteChanges) -> SuiteChanges {
        let mut changes = SuiteChanges::new();
        for (&kind, changed) in paths {
            let Some(excluded) = exclude.get(kind) else {
                continue;
            };
            if changed.is_empty() {
                continue;
            }
            for (&suite, matcher) in &self.matchers {
                if !excluded.contains(&suite) && matcher.matches(changed) {
                    changes.insert(kind, suite);
                }
            }
        }
        changes
    }

    /// The commit the topology was last advanced to.
    pub fn commit(&self) -> Option<&ObjectId> {
        self.commit.as_ref()
    }

    pub fn suite_summary(&self, kind: SuiteKind) -> Option<&Resolution> {
        self.summaries.get(&kind)
    }

    pub fn summaries(&self) -> &BTreeMap<SuiteKind, Resolution> {
        &self.summaries
    }

    pub fn matcher(&self, kind: SuiteKind) -> Option<&SuiteMatcher> {
        self.matchers.get(&kind)
    }

    pub fn declaration(&self, repo_path: &str) -> Option<&DeclarationState> {
        self.declarations.get(repo_path)
    }

    pub fn declarations(&self) -> impl Iterator<Item = &DeclarationState> {
        self.declarations.values()
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn raw_cache(&self) -> &RawObjectCache {
        &self.raw
    }
}

impl fmt::Debug for TestTopology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestTopology")
            .field("commit", &self.commit)
            .field("declarations", &self.declarations.len())
            .field("summaries", &self.summaries)
            .finish_non_exhaustive()
    }
}

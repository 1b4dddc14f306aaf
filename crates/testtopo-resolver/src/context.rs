//! Everything a recompute needs to read files of the commit being staged.

use testtopo_diff::TreeDiff;
use testtopo_manifest::{BuildDeclaration, DirectiveManifest, FormatResult, Resolution};
use testtopo_store::ObjectStore;
use testtopo_types::{ChangeKind, ObjectId};
use tracing::trace;

use crate::cache::{ParseCache, RawObjectCache};
use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::error::ResolverResult;

/// Read access to the tree being advanced to.
///
/// Blob handles come from the diff first, then from the raw-object cache
/// (which still describes the previous commit, and so is only consulted for
/// paths the diff leaves untouched), then from a tree lookup.
pub(crate) struct ResolveContext<'a> {
    pub store: &'a dyn ObjectStore,
    pub root: &'a ObjectId,
    pub diff: &'a TreeDiff,
    pub raw: &'a RawObjectCache,
    pub parsed: &'a mut ParseCache,
    pub sink: &'a dyn DiagnosticSink,
}

impl ResolveContext<'_> {
    /// Handle of the file at `repo_path`, or `None` (reported) if absent.
    pub fn blob_id(&self, repo_path: &str) -> ResolverResult<Option<ObjectId>> {
        if let Some(change) = self.diff.get(repo_path) {
            return Ok(match (change.kind, change.new_id) {
                (ChangeKind::Deleted, _) | (_, None) => self.missing(repo_path),
                (_, Some(id)) => Some(id),
            });
        }
        if let Some(id) = self.raw.get(repo_path) {
            trace!(path = %repo_path, "raw cache hit");
            return Ok(Some(*id));
        }
        Ok(match self.store.lookup_path(self.root, repo_path)? {
            Some(entry) if !entry.is_tree() => Some(entry.object_id),
            _ => self.missing(repo_path),
        })
    }

    fn missing(&self, repo_path: &str) -> Option<ObjectId> {
        self.sink.report(Diagnostic::Lookup {
            path: repo_path.to_string(),
        });
        None
    }

    /// Parse a build declaration; a malformed one is reported and empty.
    pub fn declaration(
        &mut self,
        repo_path: &str,
        id: &ObjectId,
    ) -> ResolverResult<BuildDeclaration> {
        let store = self.store;
        let parsed = self.parsed.declaration(repo_path, id, || store.read_blob(id))?;
        Ok(self.recover(repo_path, parsed).unwrap_or_default())
    }

    /// Resolve one tabular manifest; missing or malformed ones resolve empty.
    pub fn tabular(&mut self, repo_path: &str) -> ResolverResult<Resolution> {
        let Some(id) = self.blob_id(repo_path)? else {
            return Ok(Resolution::default());
        };
        let store = self.store;
        let parsed = self.parsed.tabular(repo_path, &id, || store.read_blob(&id))?;
        Ok(self.recover(repo_path, parsed).unwrap_or_default())
    }

    /// Parse one directive manifest; missing or malformed ones are `None`.
    pub fn directive(&mut self, repo_path: &str) -> ResolverResult<Option<DirectiveManifest>> {
        let Some(id) = self.blob_id(repo_path)? else {
            return Ok(None);
        };
        let store = self.store;
        let parsed = self.parsed.directive(repo_path, &id, || store.read_blob(&id))?;
        Ok(self.recover(repo_path, parsed))
    }

    pub fn report(&self, diagnostic: Diagnostic) {
        self.sink.report(diagnostic);
    }

    fn recover<T>(&self, repo_path: &str, parsed: FormatResult<T>) -> Option<T> {
        match parsed {
            Ok(value) => Some(value),
            Err(error) => {
                self.sink.report(Diagnostic::Format {
                    path: repo_path.to_string(),
                    error,
                });
                None
            }
        }
    }
}

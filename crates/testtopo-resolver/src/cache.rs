//! Caches that let suite recomputes avoid tree walks and repeated parses.

use std::collections::{BTreeSet, HashMap};

use testtopo_diff::TreeDiff;
use testtopo_manifest::{
    parse_build_declaration, BuildDeclaration, DirectiveManifest, FormatResult, Resolution,
    TabularManifest,
};
use testtopo_store::StoreResult;
use testtopo_types::{path, ChangeKind, ObjectId};
use tracing::trace;

/// Latest content handle of every tracked manifest seen in a diff.
///
/// Kept in step with the topology's commit: the first full listing fills it,
/// later diffs store additions and modifications and evict deletions.
#[derive(Clone, Debug, Default)]
pub struct RawObjectCache {
    tracked: BTreeSet<String>,
    entries: HashMap<String, ObjectId>,
}

impl RawObjectCache {
    pub fn new(tracked: BTreeSet<String>) -> Self {
        Self {
            tracked,
            entries: HashMap::new(),
        }
    }

    pub fn is_tracked(&self, repo_path: &str) -> bool {
        self.tracked.contains(path::file_name(repo_path))
    }

    pub fn get(&self, repo_path: &str) -> Option<&ObjectId> {
        self.entries.get(repo_path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Store or evict every tracked path in `diff`.
    pub fn apply(&mut self, diff: &TreeDiff) {
        for (repo_path, change) in diff.iter() {
            if !self.is_tracked(repo_path) {
                continue;
            }
            match (change.kind, change.new_id) {
                (ChangeKind::Deleted, _) | (_, None) => {
                    self.entries.remove(repo_path);
                }
                (_, Some(id)) => {
                    self.entries.insert(repo_path.to_string(), id);
                }
            }
        }
    }
}

type Key = (String, ObjectId);

/// Parse results memoized by `(path, blob id)`.
///
/// The path is part of the key because resolution joins entries to the
/// file's own directory; the same bytes at two paths resolve differently.
/// Format failures are cached too, so a broken file is only parsed once.
/// The loader runs only on a miss; if it fails nothing is cached.
#[derive(Debug)]
pub struct ParseCache {
    capacity: usize,
    declarations: HashMap<Key, FormatResult<BuildDeclaration>>,
    tabular: HashMap<Key, FormatResult<Resolution>>,
    directive: HashMap<Key, FormatResult<DirectiveManifest>>,
    hits: usize,
    misses: usize,
}

impl ParseCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            declarations: HashMap::new(),
            tabular: HashMap::new(),
            directive: HashMap::new(),
            hits: 0,
            misses: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.declarations.len() + self.tabular.len() + self.directive.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn hits(&self) -> usize {
        self.hits
    }

    pub fn misses(&self) -> usize {
        self.misses
    }

    pub fn declaration(
        &mut self,
        repo_path: &str,
        id: &ObjectId,
        load: impl FnOnce() -> StoreResult<Vec<u8>>,
    ) -> StoreResult<FormatResult<BuildDeclaration>> {
        let key = (repo_path.to_string(), *id);
        if let Some(hit) = self.declarations.get(&key) {
            self.hits += 1;
            return Ok(hit.clone());
        }
        let parsed = parse_build_declaration(repo_path, &load()?);
        self.remember_miss();
        self.declarations.insert(key, parsed.clone());
        Ok(parsed)
    }

    pub fn tabular(
        &mut self,
        repo_path: &str,
        id: &ObjectId,
        load: impl FnOnce() -> StoreResult<Vec<u8>>,
    ) -> StoreResult<FormatResult<Resolution>> {
        let key = (repo_path.to_string(), *id);
        if let Some(hit) = self.tabular.get(&key) {
            self.hits += 1;
            return Ok(hit.clone());
        }
        let parsed = TabularManifest::parse_bytes(&load()?).map(|m| m.resolve(repo_path));
        self.remember_miss();
        self.tabular.insert(key, parsed.clone());
        Ok(parsed)
    }

    pub fn directive(
        &mut self,
        repo_path: &str,
        id: &ObjectId,
        load: impl FnOnce() -> StoreResult<Vec<u8>>,
    ) -> StoreResult<FormatResult<DirectiveManifest>> {
        let key = (repo_path.to_string(), *id);
        if let Some(hit) = self.directive.get(&key) {
            self.hits += 1;
            return Ok(hit.clone());
        }
        let parsed = DirectiveManifest::parse_bytes(repo_path, &load()?);
        self.remember_miss();
        self.directive.insert(key, parsed.clone());
        Ok(parsed)
    }

    fn remember_miss(&mut self) {
        self.misses += 1;
        if self.len() >= self.capacity {
            trace!(entries = self.len(), "flushing parse cache");
            self.declarations.clear();
            self.tabular.clear();
            self.directive.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use testtopo_diff::PathChange;
    use testtopo_types::SuiteKind;

    fn tracked() -> BTreeSet<String> {
        ["mochitest.ini".to_string(), "reftest.list".to_string()].into()
    }

    fn change(kind: ChangeKind, new_id: Option<ObjectId>) -> PathChange {
        PathChange { kind, new_id }
    }

    #[test]
    fn raw_cache_follows_diffs() {
        let mut cache = RawObjectCache::new(tracked());
        let a = ObjectId::from_bytes(b"a");
        let b = ObjectId::from_bytes(b"b");

        let first: TreeDiff = [
            ("x/mochitest.ini".to_string(), change(ChangeKind::Added, Some(a))),
            ("x/test_a.html".to_string(), change(ChangeKind::Added, Some(a))),
        ]
        .into_iter()
        .collect();
        cache.apply(&first);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("x/mochitest.ini"), Some(&a));
        assert!(cache.get("x/test_a.html").is_none());

        let second: TreeDiff = [
            ("x/mochitest.ini".to_string(), change(ChangeKind::Modified, Some(b))),
            ("y/reftest.list".to_string(), change(ChangeKind::Added, Some(a))),
        ]
        .into_iter()
        .collect();
        cache.apply(&second);
        assert_eq!(cache.get("x/mochitest.ini"), Some(&b));
        assert_eq!(cache.len(), 2);

        let third: TreeDiff = [("x/mochitest.ini".to_string(), change(ChangeKind::Deleted, None))]
            .into_iter()
            .collect();
        cache.apply(&third);
        assert!(cache.get("x/mochitest.ini").is_none());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn parse_cache_memoizes_by_path_and_id() {
        let mut cache = ParseCache::new(64);
        let data = b"MOCHITEST_MANIFESTS += ['mochitest.ini']".to_vec();
        let id = ObjectId::from_bytes(&data);

        let first = cache
            .declaration("a/moz.build", &id, || Ok(data.clone()))
            .unwrap()
            .unwrap();
        let again = cache
            .declaration("a/moz.build", &id, || panic!("should not re-read"))
            .unwrap()
            .unwrap();
        assert_eq!(first, again);
        assert_eq!(first[&SuiteKind::Mochitest], vec!["a/mochitest.ini".to_string()]);

        let elsewhere = cache
            .declaration("b/moz.build", &id, || Ok(data.clone()))
            .unwrap()
            .unwrap();
        assert_eq!(elsewhere[&SuiteKind::Mochitest], vec!["b/mochitest.ini".to_string()]);
        assert_eq!((cache.hits(), cache.misses()), (1, 2));
    }

    #[test]
    fn parse_failures_are_cached() {
        let mut cache = ParseCache::new(64);
        let id = ObjectId::from_bytes(b"broken");
        let first = cache.tabular("m/mochitest.ini", &id, || Ok(b"key = v\n".to_vec()));
        assert!(first.unwrap().is_err());
        let again = cache.tabular("m/mochitest.ini", &id, || panic!("should not re-read"));
        assert!(again.unwrap().is_err());
    }

    #[test]
    fn load_failures_are_not_cached() {
        let mut cache = ParseCache::new(64);
        let id = ObjectId::from_bytes(b"gone");
        let failed = cache.directive("r/reftest.list", &id, || {
            Err(testtopo_store::StoreError::NotFound(id))
        });
        assert!(failed.is_err());
        assert!(cache.is_empty());
        let loaded = cache.directive("r/reftest.list", &id, || Ok(b"load a.html\n".to_vec()));
        assert_eq!(loaded.unwrap().unwrap().resolution.test_count, 1);
    }

    #[test]
    fn parse_cache_flushes_at_capacity() {
        let mut cache = ParseCache::new(2);
        for name in ["a", "b", "c"] {
            let id = ObjectId::from_bytes(name.as_bytes());
            cache
                .directive(&format!("{name}/reftest.list"), &id, || {
                    Ok(b"load x.html\n".to_vec())
                })
                .unwrap()
                .unwrap();
        }
        assert!(cache.len() < 2);
    }
}

//! Per-suite predicates over sets of changed paths.

use std::collections::BTreeSet;

use testtopo_manifest::Resolution;
use testtopo_types::{path, ManifestFormat, SuiteKind};

const WPT_TESTS: &[&str] = &[
    "testing/web-platform/tests/",
    "testing/web-platform/mozilla/tests/",
];
const WPT_TESTS_EXCLUDED: &[&str] = &[
    "testing/web-platform/tests/tools/",
    "testing/web-platform/tests/resources/",
];
const WPT_META: &[&str] = &[
    "testing/web-platform/meta/",
    "testing/web-platform/mozilla/meta/",
];

/// Decides whether a change touched a suite.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SuiteMatcher {
    /// Hits when a changed path is one of the suite's relevant files.
    Exact(BTreeSet<String>),
    /// Hits when a changed path lies in a directory holding a relevant file.
    ///
    /// Reference tests pull in images, fonts and helper pages that the
    /// manifests never list, so the whole directory counts. The manifests
    /// themselves never hit.
    Directory {
        dirs: BTreeSet<String>,
        top_level: BTreeSet<String>,
        manifests: BTreeSet<String>,
    },
    /// Hits on a fixed test tree, independent of any manifest.
    Prefix {
        include: &'static [&'static str],
        exclude: &'static [&'static str],
    },
}

impl SuiteMatcher {
    /// The fixed matcher of a prefix-tree suite.
    pub fn fixed(kind: SuiteKind) -> Option<Self> {
        match kind {
            SuiteKind::WebPlatformTests => Some(Self::Prefix {
                include: WPT_TESTS,
                exclude: WPT_TESTS_EXCLUDED,
            }),
            SuiteKind::WebPlatformTestsMeta => Some(Self::Prefix {
                include: WPT_META,
                exclude: &[],
            }),
            _ => None,
        }
    }

    /// Build the matcher of a manifest-backed suite from its aggregate.
    ///
    /// `manifests` holds every manifest the aggregate was resolved from,
    /// included ones too.
    pub fn build(kind: SuiteKind, resolution: &Resolution, manifests: &BTreeSet<String>) -> Self {
        match kind.format() {
            ManifestFormat::Tabular => Self::Exact(resolution.relevant_paths.clone()),
            ManifestFormat::Directive => {
                let mut dirs = BTreeSet::new();
                let mut top_level = BTreeSet::new();
                for relevant in &resolution.relevant_paths {
                    if manifests.contains(relevant) {
                        continue;
                    }
                    match path::parent(relevant) {
                        "" => {
                            top_level.insert(relevant.clone());
                        }
                        dir => {
                            dirs.insert(dir.to_string());
                        }
                    }
                }
                Self::Directory {
                    dirs,
                    top_level,
                    manifests: manifests.clone(),
                }
            }
            ManifestFormat::PrefixTree => Self::fixed(kind).unwrap_or(Self::Exact(BTreeSet::new())),
        }
    }

    pub fn matches_path(&self, candidate: &str) -> bool {
        match self {
            Self::Exact(paths) => paths.contains(candidate),
            Self::Directory {
                dirs,
                top_level,
                manifests,
            } => {
                if manifests.contains(candidate) {
                    return false;
                }
                if top_level.contains(candidate) {
                    return true;
                }
                ancestors(candidate).any(|dir| dirs.contains(dir))
            }
            Self::Prefix { include, exclude } => {
                include.iter().any(|p| candidate.starts_with(p))
                    && !exclude.iter().any(|p| candidate.starts_with(p))
            }
        }
    }

    /// Returns `true` if any of `paths` hits.
    pub fn matches<'a, I>(&self, paths: I) -> bool
    where
        I: IntoIterator<Item = &'a String>,
    {
        paths.into_iter().any(|p| self.matches_path(p))
    }
}

/// Proper ancestor directories of `path`, nearest first.
fn ancestors(path: &str) -> impl Iterator<Item = &str> {
    path.match_indices('/').rev().map(move |(idx, _)| &path[..idx])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolution(paths: &[&str]) -> Resolution {
        Resolution {
            test_count: paths.len(),
            relevant_paths: paths.iter().map(|p| p.to_string()).collect(),
        }
    }

    fn set(paths: &[&str]) -> BTreeSet<String> {
        paths.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn mochitest_matches_exactly() {
        let matcher = SuiteMatcher::build(
            SuiteKind::Mochitest,
            &resolution(&["dom/tests/test_a.html", "dom/tests/head.js"]),
            &set(&["dom/tests/mochitest.ini"]),
        );
        assert!(matcher.matches_path("dom/tests/head.js"));
        assert!(!matcher.matches_path("dom/tests/test_b.html"));
        assert!(!matcher.matches_path("dom/tests/mochitest.ini"));
    }

    #[test]
    fn reftest_matches_directories_on_boundaries() {
        let matcher = SuiteMatcher::build(
            SuiteKind::Reftest,
            &resolution(&["layout/reftests/bugs/1.html", "layout/reftests/bugs/1-ref.html"]),
            &set(&["layout/reftests/bugs/reftest.list"]),
        );
        assert!(matcher.matches_path("layout/reftests/bugs/new-image.png"));
        assert!(matcher.matches_path("layout/reftests/bugs/deep/nested.css"));
        assert!(!matcher.matches_path("layout/reftests/bugs-other/1.html"));
        assert!(!matcher.matches_path("layout/reftests/other.html"));
        assert!(!matcher.matches_path("layout/reftests/bugs/reftest.list"));
    }

    #[test]
    fn top_level_relevant_paths_match_exactly() {
        let matcher = SuiteMatcher::build(
            SuiteKind::Crashtest,
            &resolution(&["crash.html"]),
            &set(&["crashtest.list"]),
        );
        assert!(matcher.matches_path("crash.html"));
        assert!(!matcher.matches_path("unrelated.txt"));
        assert!(!matcher.matches_path("crashtest.list"));
    }

    #[test]
    fn wpt_prefixes() {
        let tests = SuiteMatcher::fixed(SuiteKind::WebPlatformTests).unwrap();
        assert!(tests.matches_path("testing/web-platform/tests/dom/nodes/a.html"));
        assert!(tests.matches_path("testing/web-platform/mozilla/tests/x.html"));
        assert!(!tests.matches_path("testing/web-platform/tests/tools/wpt/run.py"));
        assert!(!tests.matches_path("testing/web-platform/tests/resources/testharness.js"));
        assert!(!tests.matches_path("testing/web-platform/meta/dom/a.html.ini"));

        let meta = SuiteMatcher::fixed(SuiteKind::WebPlatformTestsMeta).unwrap();
        assert!(meta.matches_path("testing/web-platform/meta/dom/a.html.ini"));
        assert!(meta.matches_path("testing/web-platform/mozilla/meta/b.ini"));
        assert!(!meta.matches_path("testing/web-platform/tests/dom/a.html"));

        assert!(SuiteMatcher::fixed(SuiteKind::Reftest).is_none());
    }

    #[test]
    fn matches_any_of_a_set() {
        let matcher = SuiteMatcher::Exact(set(&["a/b.html"]));
        assert!(matcher.matches(&set(&["x.txt", "a/b.html"])));
        assert!(!matcher.matches(&set(&["x.txt"])));
        assert!(!matcher.matches(&BTreeSet::new()));
    }

    #[test]
    fn ancestors_nearest_first() {
        assert_eq!(ancestors("a/b/c.txt").collect::<Vec<_>>(), vec!["a/b", "a"]);
        assert_eq!(ancestors("c.txt").count(), 0);
    }
}

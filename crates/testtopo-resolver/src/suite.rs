//! Per-declaration suite state.

use std::collections::{BTreeSet, VecDeque};

use testtopo_diff::TreeDiff;
use testtopo_manifest::{FormatError, Resolution};
use testtopo_types::ManifestFormat;
use tracing::debug;

use crate::context::ResolveContext;
use crate::diagnostics::Diagnostic;
use crate::error::ResolverResult;

/// The manifests one build declaration lists for one suite, and what they
/// resolve to.
///
/// Recomputes are wholesale: every manifest is resolved again (from the parse
/// cache where possible) and the result replaces the previous one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SuiteState {
    Tabular {
        manifests: BTreeSet<String>,
        resolution: Resolution,
    },
    Directive {
        manifests: BTreeSet<String>,
        resolution: Resolution,
        /// Manifests reached through `include`, as of the last recompute.
        included: BTreeSet<String>,
    },
}

impl SuiteState {
    /// An unresolved state, or `None` for formats without manifests.
    pub fn new(format: ManifestFormat, manifests: BTreeSet<String>) -> Option<Self> {
        match format {
            ManifestFormat::Tabular => Some(Self::Tabular {
                manifests,
                resolution: Resolution::default(),
            }),
            ManifestFormat::Directive => Some(Self::Directive {
                manifests,
                resolution: Resolution::default(),
                included: BTreeSet::new(),
            }),
            ManifestFormat::PrefixTree => None,
        }
    }

    pub fn manifests(&self) -> &BTreeSet<String> {
        match self {
            Self::Tabular { manifests, .. } | Self::Directive { manifests, .. } => manifests,
        }
    }

    pub fn resolution(&self) -> &Resolution {
        match self {
            Self::Tabular { resolution, .. } | Self::Directive { resolution, .. } => resolution,
        }
    }

    /// Manifests reached through includes; always empty for tabular suites.
    pub fn included(&self) -> Option<&BTreeSet<String>> {
        match self {
            Self::Tabular { .. } => None,
            Self::Directive { included, .. } => Some(included),
        }
    }

    /// Whether `diff` touches any file this state was resolved from.
    pub fn affected_by(&self, diff: &TreeDiff) -> bool {
        let touched = |paths: &BTreeSet<String>| paths.iter().any(|p| diff.contains(p));
        match self {
            Self::Tabular { manifests, .. } => touched(manifests),
            Self::Directive {
                manifests,
                included,
                ..
            } => touched(manifests) || touched(included),
        }
    }

    /// Resolve every manifest again.
    ///
    /// Returns `true` if the resolution or, for directive suites, the set of
    /// included manifests changed. Both feed the suite's matcher.
    pub(crate) fn recompute(&mut self, ctx: &mut ResolveContext<'_>) -> ResolverResult<bool> {
        match self {
            Self::Tabular {
                manifests,
                resolution,
            } => {
                let mut fresh = Resolution::default();
                for manifest in manifests.iter() {
                    fresh.merge(ctx.tabular(manifest)?);
                }
                Ok(replace(resolution, fresh))
            }
            Self::Directive {
                manifests,
                resolution,
                included,
            } => {
                let (fresh, reached) = resolve_directives(manifests, ctx)?;
                let includes_changed = *included != reached;
                *included = reached;
                let resolution_changed = replace(resolution, fresh);
                Ok(resolution_changed || includes_changed)
            }
        }
    }
}

fn replace(current: &mut Resolution, fresh: Resolution) -> bool {
    if *current == fresh {
        return false;
    }
    *current = fresh;
    true
}

/// Breadth-first over includes, starting from the declared manifests.
///
/// Reaching a manifest a second time is reported as an include cycle and that
/// edge is dropped, so each manifest contributes at most once.
fn resolve_directives(
    roots: &BTreeSet<String>,
    ctx: &mut ResolveContext<'_>,
) -> ResolverResult<(Resolution, BTreeSet<String>)> {
    let mut resolution = Resolution::default();
    let mut included = BTreeSet::new();
    let mut visited: BTreeSet<String> = roots.clone();
    let mut queue: VecDeque<String> = roots.iter().cloned().collect();

    while let Some(manifest) = queue.pop_front() {
        let Some(parsed) = ctx.directive(&manifest)? else {
            continue;
        };
        resolution.merge(parsed.resolution);
        for include in parsed.includes {
            if !visited.insert(include.clone()) {
                debug!(from = %manifest, to = %include, "dropping repeated include");
                ctx.report(Diagnostic::Format {
                    path: manifest.clone(),
                    error: FormatError::IncludeCycle { path: include },
                });
                continue;
            }
            included.insert(include.clone());
            queue.push_back(include);
        }
    }

    Ok((resolution, included))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{ParseCache, RawObjectCache};
    use crate::diagnostics::CollectingSink;
    use testtopo_diff::list_tree;
    use testtopo_store::{InMemoryObjectStore, TreeBuilder};
    use testtopo_types::ObjectId;

    struct Fixture {
        store: InMemoryObjectStore,
        root: ObjectId,
        diff: TreeDiff,
        raw: RawObjectCache,
        parsed: ParseCache,
        sink: CollectingSink,
    }

    impl Fixture {
        fn new(files: &[(&str, &str)]) -> Self {
            let store = InMemoryObjectStore::new();
            let mut builder = TreeBuilder::new();
            for (path, content) in files {
                builder.insert(path, *content).unwrap();
            }
            let root = builder.write(&store).unwrap();
            let diff = list_tree(&store, &root).unwrap();
            Self {
                store,
                root,
                diff,
                raw: RawObjectCache::default(),
                parsed: ParseCache::new(64),
                sink: CollectingSink::new(),
            }
        }

        fn recompute(&mut self, state: &mut SuiteState) -> bool {
            let mut ctx = ResolveContext {
                store: &self.store,
                root: &self.root,
                diff: &self.diff,
                raw: &self.raw,
                parsed: &mut self.parsed,
                sink: &self.sink,
            };
            state.recompute(&mut ctx).unwrap()
        }
    }

    fn set(paths: &[&str]) -> BTreeSet<String> {
        paths.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn tabular_unions_manifests() {
        let mut fixture = Fixture::new(&[
            ("a/mochitest.ini", "[test_a.html]\n"),
            (
                "b/mochitest.ini",
                "[DEFAULT]\nsupport-files = h.js\n[test_b.html]\n[test_c.html]\n",
            ),
        ]);
        let mut state = SuiteState::new(
            ManifestFormat::Tabular,
            set(&["a/mochitest.ini", "b/mochitest.ini"]),
        )
        .unwrap();
        assert!(fixture.recompute(&mut state));
        assert_eq!(state.resolution().test_count, 3);
        assert_eq!(
            state.resolution().relevant_paths,
            set(&["a/test_a.html", "b/h.js", "b/test_b.html", "b/test_c.html"])
        );
        assert!(!fixture.recompute(&mut state));
    }

    #[test]
    fn broken_manifest_contributes_nothing() {
        let mut fixture = Fixture::new(&[
            ("a/mochitest.ini", "[test_a.html]\n"),
            ("b/mochitest.ini", "orphan = 1\n"),
        ]);
        let mut state = SuiteState::new(
            ManifestFormat::Tabular,
            set(&["a/mochitest.ini", "b/mochitest.ini", "c/mochitest.ini"]),
        )
        .unwrap();
        fixture.recompute(&mut state);
        assert_eq!(state.resolution().test_count, 1);

        let diagnostics = fixture.sink.take_all();
        assert_eq!(diagnostics.len(), 2);
        assert!(matches!(
            &diagnostics[0],
            Diagnostic::Format { path, .. } if path == "b/mochitest.ini"
        ));
        assert_eq!(
            diagnostics[1],
            Diagnostic::Lookup {
                path: "c/mochitest.ini".into()
            }
        );
    }

    #[test]
    fn directive_follows_includes_breadth_first() {
        let mut fixture = Fixture::new(&[
            ("r/reftest.list", "include sub/reftest.list\n== a.html a-ref.html\n"),
            ("r/sub/reftest.list", "include ../more.list\nload b.html\n"),
            ("r/more.list", "load c.html\n"),
        ]);
        let mut state =
            SuiteState::new(ManifestFormat::Directive, set(&["r/reftest.list"])).unwrap();
        assert!(fixture.recompute(&mut state));
        assert_eq!(state.resolution().test_count, 3);
        assert_eq!(
            state.resolution().relevant_paths,
            set(&["r/a-ref.html", "r/a.html", "r/c.html", "r/sub/b.html"])
        );
        assert_eq!(
            state.included(),
            Some(&set(&["r/more.list", "r/sub/reftest.list"]))
        );
        assert!(fixture.sink.is_empty());
    }

    #[test]
    fn include_cycle_is_reported_and_dropped() {
        let mut fixture = Fixture::new(&[
            ("r/reftest.list", "include other.list\nload a.html\n"),
            ("r/other.list", "include reftest.list\nload b.html\n"),
        ]);
        let mut state =
            SuiteState::new(ManifestFormat::Directive, set(&["r/reftest.list"])).unwrap();
        fixture.recompute(&mut state);
        assert_eq!(state.resolution().test_count, 2);
        assert_eq!(
            fixture.sink.take_all(),
            vec![Diagnostic::Format {
                path: "r/other.list".into(),
                error: FormatError::IncludeCycle {
                    path: "r/reftest.list".into()
                },
            }]
        );
    }

    #[test]
    fn affected_by_manifests_and_includes() {
        let fixture = Fixture::new(&[
            ("r/reftest.list", "include sub/reftest.list\n"),
            ("r/sub/reftest.list", "load b.html\n"),
        ]);
        let mut state = SuiteState::Directive {
            manifests: set(&["r/reftest.list"]),
            resolution: Resolution::default(),
            included: BTreeSet::new(),
        };
        assert!(state.affected_by(&fixture.diff));

        let only_include: TreeDiff = fixture
            .diff
            .iter()
            .filter(|(p, _)| *p == "r/sub/reftest.list")
            .map(|(p, c)| (p.to_string(), *c))
            .collect();
        assert!(!state.affected_by(&only_include));
        if let SuiteState::Directive { included, .. } = &mut state {
            included.insert("r/sub/reftest.list".into());
        }
        assert!(state.affected_by(&only_include));

        let tabular =
            SuiteState::new(ManifestFormat::Tabular, set(&["r/sub/reftest.list"])).unwrap();
        assert!(tabular.affected_by(&only_include));
        assert!(tabular.included().is_none());
    }

    #[test]
    fn include_only_change_is_reported() {
        let mut fixture = Fixture::new(&[
            ("r/reftest.list", "load a.html\ninclude empty.list\n"),
            ("r/empty.list", "# nothing yet\n"),
        ]);
        let mut state = SuiteState::Directive {
            manifests: set(&["r/reftest.list"]),
            resolution: Resolution {
                test_count: 1,
                relevant_paths: set(&["r/a.html"]),
            },
            included: BTreeSet::new(),
        };
        assert!(fixture.recompute(&mut state));
        assert_eq!(state.resolution().test_count, 1);
        assert_eq!(state.included(), Some(&set(&["r/empty.list"])));
        assert!(!fixture.recompute(&mut state));
    }

    #[test]
    fn prefix_tree_has_no_state() {
        assert!(SuiteState::new(ManifestFormat::PrefixTree, BTreeSet::new()).is_none());
    }
}
